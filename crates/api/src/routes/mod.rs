//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod offers;
pub mod orders;
pub mod sandbox;
