//! Inventory gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::LineItem;
use futures_util::future::join_all;
use serde_json::json;

use super::lock;
use crate::error::{CommitError, ErrorCode, Result};

/// Reserves and releases stock for individual line items.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// Holds `item.quantity` units of the item's artwork.
    async fn deduct(&self, item: &LineItem) -> Result<()>;

    /// Returns units taken by a previous deduct. Releasing an item that was
    /// never deducted is a no-op.
    async fn undeduct(&self, item: &LineItem) -> Result<()>;
}

/// Releases every item concurrently and waits for all of them.
///
/// Failures are logged and otherwise ignored so that one stuck release
/// never hides the error that triggered compensation.
pub async fn undeduct_all(inventory: &dyn InventoryGateway, items: &[LineItem]) {
    let releases = items
        .iter()
        .map(|item| async move { (item, inventory.undeduct(item).await) });

    for (item, result) in join_all(releases).await {
        if let Err(error) = result {
            tracing::error!(
                artwork_id = %item.artwork_id,
                quantity = item.quantity,
                %error,
                "failed to release inventory"
            );
        }
    }
}

#[derive(Debug, Default)]
struct InventoryState {
    /// Available units per artwork. Artworks without an entry are unlimited.
    stock: HashMap<String, u32>,
    held: HashMap<String, u32>,
    deduct_calls: Vec<String>,
    undeduct_calls: Vec<String>,
    fail_on_undeduct: bool,
}

/// In-memory inventory gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    state: Arc<Mutex<InventoryState>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the available units of an artwork.
    pub fn set_stock(&self, artwork_id: impl Into<String>, available: u32) {
        lock(&self.state).stock.insert(artwork_id.into(), available);
    }

    /// Makes every undeduct call fail with a gateway error.
    pub fn set_fail_on_undeduct(&self, fail: bool) {
        lock(&self.state).fail_on_undeduct = fail;
    }

    pub fn available(&self, artwork_id: &str) -> Option<u32> {
        lock(&self.state).stock.get(artwork_id).copied()
    }

    /// Units currently held for an artwork.
    pub fn held(&self, artwork_id: &str) -> u32 {
        lock(&self.state).held.get(artwork_id).copied().unwrap_or(0)
    }

    /// Artwork ids passed to deduct, in call order.
    pub fn deduct_calls(&self) -> Vec<String> {
        lock(&self.state).deduct_calls.clone()
    }

    /// Artwork ids passed to undeduct, in call order.
    pub fn undeduct_calls(&self) -> Vec<String> {
        lock(&self.state).undeduct_calls.clone()
    }
}

#[async_trait]
impl InventoryGateway for InMemoryInventory {
    async fn deduct(&self, item: &LineItem) -> Result<()> {
        let mut state = lock(&self.state);
        state.deduct_calls.push(item.artwork_id.clone());

        if let Some(available) = state.stock.get_mut(&item.artwork_id) {
            if *available < item.quantity {
                return Err(CommitError::processing_with(
                    ErrorCode::InsufficientInventory,
                    json!({ "artwork_id": item.artwork_id }),
                ));
            }
            *available -= item.quantity;
        }

        *state.held.entry(item.artwork_id.clone()).or_default() += item.quantity;
        Ok(())
    }

    async fn undeduct(&self, item: &LineItem) -> Result<()> {
        let mut state = lock(&self.state);
        state.undeduct_calls.push(item.artwork_id.clone());

        if state.fail_on_undeduct {
            return Err(CommitError::gateway("inventory", "undeduct unavailable"));
        }

        let held = state.held.get(&item.artwork_id).copied().unwrap_or(0);
        if held < item.quantity {
            return Ok(());
        }
        state.held.insert(item.artwork_id.clone(), held - item.quantity);
        if let Some(available) = state.stock.get_mut(&item.artwork_id) {
            *available += item.quantity;
        }
        Ok(())
    }
}
