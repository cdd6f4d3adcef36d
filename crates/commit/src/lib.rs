//! Order commit coordination.
//!
//! This crate drives an order through the actions that touch external
//! systems. The commit pipeline follows these steps:
//! 1. Validate preconditions (no side effects)
//! 2. Deduct inventory for every line item
//! 3. Transition the order and charge the buyer
//! 4. Persist the order, or release the deducted inventory and refund a
//!    captured charge on failure
//!
//! A charge transaction is recorded on the order whether or not it
//! succeeded. Lifecycle transitions and the expiration reconciler share the
//! same collaborators and the same per-order lock.

pub mod charge;
pub mod coordinator;
pub mod error;
pub mod gateways;
pub mod lifecycle;
pub mod reconciler;
pub mod settings;

pub use coordinator::{ARTWORK_VERSION_MISMATCH_METRIC, CommitCoordinator};
pub use error::{CommitError, ErrorCode, Failure, Result};
pub use gateways::Collaborators;
pub use lifecycle::OrderLifecycle;
pub use reconciler::{ExpirationReconciler, ReconcileOutcome, SYSTEM_ACTOR};
pub use settings::{CommitSettings, DEFAULT_CHARGE_DESCRIPTION_SUFFIX};

use common::OrderId;
use domain::Order;
use order_store::OrderStore;

async fn load_order<S: OrderStore + ?Sized>(
    store: &S,
    guard: &mut S::Guard,
    order_id: OrderId,
) -> Result<Order> {
    store
        .load_locked(guard, order_id)
        .await?
        .ok_or(CommitError::OrderNotFound(order_id))
}
