use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use domain::Order;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{OrderId, Result, StoreError, Version, store::OrderStore};

type LockTable = Arc<std::sync::Mutex<HashMap<OrderId, Arc<Mutex<()>>>>>;

/// In-memory order store implementation for testing.
///
/// Provides the same interface and locking semantics as the PostgreSQL
/// implementation: one async mutex per order for exclusivity, plus a
/// version check on every save. Writes made under the lock apply
/// immediately.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    locks: LockTable,
}

/// Exclusive access to one order in an [`InMemoryOrderStore`].
///
/// Releasing the last handle on an order's mutex also removes it from the
/// lock table.
pub struct InMemoryOrderLock {
    order_id: OrderId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockTable,
}

impl Drop for InMemoryOrderLock {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        self.guard.take();
        if locks
            .get(&self.order_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.order_id);
        }
    }
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns the number of orders that are locked or being waited on.
    pub fn lock_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    type Guard = InMemoryOrderLock;

    async fn lock(&self, order_id: OrderId) -> Result<Self::Guard> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(order_id)
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;

        Ok(InMemoryOrderLock {
            order_id,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        })
    }

    async fn load_locked(
        &self,
        _guard: &mut Self::Guard,
        order_id: OrderId,
    ) -> Result<Option<Order>> {
        self.load(order_id).await
    }

    async fn save_locked(&self, _guard: &mut Self::Guard, order: &Order) -> Result<Version> {
        self.save(order).await
    }

    async fn unlock(&self, guard: Self::Guard) -> Result<()> {
        drop(guard);
        Ok(())
    }

    async fn insert(&self, order: &Order) -> Result<Version> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::AlreadyExists(order.id));
        }

        let version = Version::initial().next();
        let mut stored = order.clone();
        stored.set_version(version);
        orders.insert(order.id, stored);
        Ok(version)
    }

    async fn load(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn save(&self, order: &Order) -> Result<Version> {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(&order.id)
            .map(Order::version)
            .ok_or(StoreError::OrderNotFound(order.id))?;

        if current != order.version() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id,
                expected: order.version(),
                actual: current,
            });
        }

        let version = current.next();
        let mut stored = order.clone();
        stored.set_version(version);
        orders.insert(order.id, stored);
        Ok(version)
    }
}
