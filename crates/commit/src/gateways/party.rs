//! Gateway to the external system that owns artworks, credit cards and
//! partners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lock;
use crate::error::{CommitError, Result};

const SERVICE: &str = "party";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: String,
    pub current_version_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAccount {
    pub external_id: Option<String>,
}

/// A stored card as the external system reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: String,
    pub external_id: Option<String>,
    pub customer_account: Option<CustomerAccount>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl CreditCard {
    /// Creates an active card attached to a customer account.
    pub fn active(
        id: impl Into<String>,
        external_id: impl Into<String>,
        customer_external_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            external_id: Some(external_id.into()),
            customer_account: Some(CustomerAccount {
                external_id: Some(customer_external_id.into()),
            }),
            deactivated_at: None,
        }
    }

    pub fn customer_external_id(&self) -> Option<&str> {
        self.customer_account
            .as_ref()
            .and_then(|account| account.external_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn has_external_id(&self) -> bool {
        self.external_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    pub name: Option<String>,
    pub effective_commission_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantAccount {
    pub id: String,
    pub partner_id: String,
    pub external_id: String,
}

/// Read access to artworks, credit cards, partners and merchant accounts.
#[async_trait]
pub trait ExternalPartyGateway: Send + Sync {
    async fn get_artwork(&self, artwork_id: &str) -> Result<Artwork>;

    async fn get_credit_card(&self, credit_card_id: &str) -> Result<CreditCard>;

    async fn fetch_partner(&self, partner_id: &str) -> Result<Partner>;

    async fn get_merchant_account(&self, partner_id: &str) -> Result<MerchantAccount>;
}

#[derive(Debug, Default)]
struct PartyState {
    artworks: HashMap<String, Artwork>,
    credit_cards: HashMap<String, CreditCard>,
    partners: HashMap<String, Partner>,
    merchant_accounts: HashMap<String, MerchantAccount>,
    calls: usize,
}

/// In-memory party gateway for testing.
///
/// Lookups of unregistered records fail with a gateway error, the way a 404
/// from the remote service would.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPartyGateway {
    state: Arc<Mutex<PartyState>>,
}

impl InMemoryPartyGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_artwork(&self, id: impl Into<String>, current_version_id: impl Into<String>) {
        let artwork = Artwork {
            id: id.into(),
            current_version_id: current_version_id.into(),
        };
        lock(&self.state)
            .artworks
            .insert(artwork.id.clone(), artwork);
    }

    pub fn add_credit_card(&self, card: CreditCard) {
        lock(&self.state).credit_cards.insert(card.id.clone(), card);
    }

    pub fn add_partner(&self, partner: Partner) {
        lock(&self.state)
            .partners
            .insert(partner.id.clone(), partner);
    }

    pub fn add_merchant_account(&self, account: MerchantAccount) {
        lock(&self.state)
            .merchant_accounts
            .insert(account.partner_id.clone(), account);
    }

    /// Total number of lookups served, successful or not.
    pub fn call_count(&self) -> usize {
        lock(&self.state).calls
    }

    fn find<T: Clone>(
        &self,
        what: &str,
        id: &str,
        pick: impl FnOnce(&PartyState) -> Option<&T>,
    ) -> Result<T> {
        let mut state = lock(&self.state);
        state.calls += 1;
        pick(&*state)
            .cloned()
            .ok_or_else(|| CommitError::gateway(SERVICE, format!("{what} {id} not found")))
    }
}

#[async_trait]
impl ExternalPartyGateway for InMemoryPartyGateway {
    async fn get_artwork(&self, artwork_id: &str) -> Result<Artwork> {
        self.find("artwork", artwork_id, |s| s.artworks.get(artwork_id))
    }

    async fn get_credit_card(&self, credit_card_id: &str) -> Result<CreditCard> {
        self.find("credit card", credit_card_id, |s| {
            s.credit_cards.get(credit_card_id)
        })
    }

    async fn fetch_partner(&self, partner_id: &str) -> Result<Partner> {
        self.find("partner", partner_id, |s| s.partners.get(partner_id))
    }

    async fn get_merchant_account(&self, partner_id: &str) -> Result<MerchantAccount> {
        self.find("merchant account for", partner_id, |s| {
            s.merchant_accounts.get(partner_id)
        })
    }
}
