//! Time-driven expiration of pending and submitted orders.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderState, StateReason};
use order_store::OrderStore;

use crate::error::Result;
use crate::lifecycle::OrderLifecycle;
use crate::load_order;

/// Actor recorded on events raised by the scheduler.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The order moved on or has not expired yet. Nothing was changed.
    Stale,
    /// The order was canceled.
    Expired(Order),
}

/// Re-checks an expiration the scheduler queued earlier.
///
/// The scheduler records the state an order was in when it queued the
/// check. By the time the check runs the order may have moved on, so the
/// reconciler reloads it under the order lock and only acts when the state
/// still matches and the expiry has passed. Running it twice is harmless.
pub struct ExpirationReconciler<S: OrderStore> {
    lifecycle: OrderLifecycle<S>,
}

impl<S: OrderStore> ExpirationReconciler<S> {
    pub fn new(lifecycle: OrderLifecycle<S>) -> Self {
        Self { lifecycle }
    }

    pub async fn reconcile(
        &self,
        order_id: OrderId,
        expected_state: OrderState,
    ) -> Result<ReconcileOutcome> {
        self.reconcile_at(order_id, expected_state, Utc::now())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reconcile_at(
        &self,
        order_id: OrderId,
        expected_state: OrderState,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        let store = self.lifecycle.store();
        let mut guard = store.lock(order_id).await?;
        let order = load_order(store, &mut guard, order_id).await?;

        if order.state() != expected_state || !order.is_expired_at(now) {
            tracing::debug!(state = %order.state(), expires_at = ?order.state_expires_at(), "stale expiration");
            return Ok(ReconcileOutcome::Stale);
        }

        let order = match expected_state {
            OrderState::Pending => {
                self.lifecycle
                    .abandon_locked(
                        guard,
                        order,
                        Some(StateReason::ExpiredUnconfirmed),
                        SYSTEM_ACTOR,
                    )
                    .await?
            }
            OrderState::Submitted => {
                self.lifecycle
                    .seller_lapse_locked(guard, order, SYSTEM_ACTOR)
                    .await?
            }
            _ => return Ok(ReconcileOutcome::Stale),
        };

        Ok(ReconcileOutcome::Expired(order))
    }
}
