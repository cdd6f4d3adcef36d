//! Shared identifier types for the order commit system.

mod types;

pub use types::{OfferId, OrderId, TransactionId, Version};
