use async_trait::async_trait;
use domain::Order;

use crate::{OrderId, Result, StoreError, Version};

/// Persistence for order rows.
///
/// The order row is the only shared mutable resource in the system, so the
/// store is also where per-order exclusivity lives: a caller that holds the
/// guard returned by [`OrderStore::lock`] is the only writer for that order
/// until the guard is released. Reads and writes made while holding the lock
/// go through the guard (`load_locked`, `save_locked`) and become durable
/// when the guard is handed back to [`OrderStore::unlock`]. A guard that is
/// dropped instead may discard them. Saves additionally carry an optimistic
/// version check. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Proof of exclusive access to one order. Dropping it releases the lock.
    type Guard: Send;

    /// Waits until no other caller holds the lock for `order_id`.
    async fn lock(&self, order_id: OrderId) -> Result<Self::Guard>;

    /// Loads an order using the lock holder's session.
    async fn load_locked(
        &self,
        guard: &mut Self::Guard,
        order_id: OrderId,
    ) -> Result<Option<Order>>;

    /// Overwrites the stored order using the lock holder's session, with the
    /// same version check as [`OrderStore::save`].
    async fn save_locked(&self, guard: &mut Self::Guard, order: &Order) -> Result<Version>;

    /// Releases the lock, making writes made through the guard durable.
    async fn unlock(&self, guard: Self::Guard) -> Result<()>;

    /// Stores a new order and returns its first version.
    async fn insert(&self, order: &Order) -> Result<Version>;

    /// Loads an order, returning None if it doesn't exist.
    async fn load(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Overwrites the stored order.
    ///
    /// Fails with `ConcurrencyConflict` unless the stored version equals
    /// `order.version()`. Returns the new version.
    async fn save(&self, order: &Order) -> Result<Version>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Loads an order, failing with `OrderNotFound` if it doesn't exist.
    async fn load_existing(&self, order_id: OrderId) -> Result<Order> {
        self.load(order_id)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    /// Saves `order` and bumps its in-memory version to match the store.
    async fn save_in_place(&self, order: &mut Order) -> Result<()> {
        let version = self.save(order).await?;
        order.set_version(version);
        Ok(())
    }

    /// Loads an order under the lock, failing with `OrderNotFound` if it
    /// doesn't exist.
    async fn load_existing_locked(
        &self,
        guard: &mut Self::Guard,
        order_id: OrderId,
    ) -> Result<Order> {
        self.load_locked(guard, order_id)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    /// Saves `order` under the lock and bumps its in-memory version.
    async fn save_locked_in_place(
        &self,
        guard: &mut Self::Guard,
        order: &mut Order,
    ) -> Result<()> {
        let version = self.save_locked(guard, order).await?;
        order.set_version(version);
        Ok(())
    }

    /// Inserts `order` and bumps its in-memory version to match the store.
    async fn insert_in_place(&self, order: &mut Order) -> Result<()> {
        let version = self.insert(order).await?;
        order.set_version(version);
        Ok(())
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}
