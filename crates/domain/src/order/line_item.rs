//! Line items owned by an order.

use serde::{Deserialize, Serialize};

/// A single artwork (or edition) being purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub artwork_id: String,
    pub edition_set_id: Option<String>,

    /// Artwork version snapshot taken when the item was added. Commit refuses
    /// to charge if the artwork has changed since.
    pub artwork_version_id: String,

    pub quantity: u32,
    pub list_price_cents: i64,
    pub commission_fee_cents: i64,
}

impl LineItem {
    pub fn new(
        artwork_id: impl Into<String>,
        artwork_version_id: impl Into<String>,
        quantity: u32,
        list_price_cents: i64,
    ) -> Self {
        Self {
            artwork_id: artwork_id.into(),
            edition_set_id: None,
            artwork_version_id: artwork_version_id.into(),
            quantity,
            list_price_cents,
            commission_fee_cents: 0,
        }
    }

    pub fn with_edition_set(mut self, edition_set_id: impl Into<String>) -> Self {
        self.edition_set_id = Some(edition_set_id.into());
        self
    }

    /// List price multiplied by quantity.
    pub fn total_list_price_cents(&self) -> i64 {
        self.list_price_cents * i64::from(self.quantity)
    }
}
