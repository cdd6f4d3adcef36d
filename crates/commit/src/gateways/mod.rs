//! Collaborator traits and in-memory implementations.
//!
//! Every external system the coordinator talks to sits behind one of these
//! traits. The in-memory implementations record their calls so tests can
//! assert on exactly what the coordinator did.

pub mod inventory;
pub mod metrics;
pub mod notifier;
pub mod offers;
pub mod party;
pub mod payment;
pub mod publisher;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use inventory::{InMemoryInventory, InventoryGateway, undeduct_all};
pub use metrics::{InMemoryMetrics, MetricsSink, RecorderMetrics};
pub use notifier::{ChannelNotifier, FailedChargeNotice, InMemoryNotifier, Notifier};
pub use offers::{InMemoryOffers, OfferLookup};
pub use party::{
    Artwork, CreditCard, CustomerAccount, ExternalPartyGateway, InMemoryPartyGateway,
    MerchantAccount, Partner,
};
pub use payment::{ChargeParams, InMemoryPayment, PaymentGateway};
pub use publisher::{EventPublisher, InMemoryPublisher, TracingPublisher, publish_order_event};

/// The set of collaborators shared by the coordinator, lifecycle and
/// reconciler.
#[derive(Clone)]
pub struct Collaborators {
    pub party: Arc<dyn ExternalPartyGateway>,
    pub inventory: Arc<dyn InventoryGateway>,
    pub payment: Arc<dyn PaymentGateway>,
    pub publisher: Arc<dyn EventPublisher>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<dyn MetricsSink>,
    pub offers: Arc<dyn OfferLookup>,
}

// In-memory doubles keep going after a panicked test thread.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
