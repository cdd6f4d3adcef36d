//! Lookup into the negotiation subsystem that owns offers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::OfferId;
use domain::Offer;

use super::lock;
use crate::error::Result;

#[async_trait]
pub trait OfferLookup: Send + Sync {
    async fn get_offer(&self, offer_id: OfferId) -> Result<Option<Offer>>;
}

/// In-memory offer lookup for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOffers {
    offers: Arc<Mutex<HashMap<OfferId, Offer>>>,
}

impl InMemoryOffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, offer: Offer) {
        lock(&self.offers).insert(offer.id, offer);
    }
}

#[async_trait]
impl OfferLookup for InMemoryOffers {
    async fn get_offer(&self, offer_id: OfferId) -> Result<Option<Offer>> {
        Ok(lock(&self.offers).get(&offer_id).cloned())
    }
}
