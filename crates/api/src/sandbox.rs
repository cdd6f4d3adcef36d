//! In-memory stand-ins for the systems the commit pipeline talks to.

use std::sync::Arc;

use commit::Collaborators;
use commit::gateways::{
    Artwork, CreditCard, InMemoryInventory, InMemoryOffers, InMemoryPartyGateway,
    InMemoryPayment, MerchantAccount, Notifier, Partner, RecorderMetrics, TracingPublisher,
};
use serde::Deserialize;

/// In-memory stand-ins for the external party, inventory, payment and offer
/// systems.
///
/// The handles share state with the collaborators they back, so callers can
/// seed artworks, cards and offers after the app is built.
#[derive(Clone, Default)]
pub struct Sandbox {
    pub party: InMemoryPartyGateway,
    pub inventory: InMemoryInventory,
    pub payment: InMemoryPayment,
    pub offers: InMemoryOffers,
}

/// Available stock for one artwork. Artworks without a level never run out.
#[derive(Debug, Clone, Deserialize)]
pub struct StockLevel {
    pub artwork_id: String,
    pub available: u32,
}

/// Records loaded into a [`Sandbox`], from a JSON file at startup or from
/// `POST /sandbox/fixtures`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SandboxFixtures {
    pub artworks: Vec<Artwork>,
    pub credit_cards: Vec<CreditCard>,
    pub partners: Vec<Partner>,
    pub merchant_accounts: Vec<MerchantAccount>,
    pub stock: Vec<StockLevel>,
}

impl SandboxFixtures {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.artworks.len()
            + self.credit_cards.len()
            + self.partners.len()
            + self.merchant_accounts.len()
            + self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sandbox {
    /// Wires the sandbox systems together with the production publisher and
    /// metrics sink.
    pub fn collaborators(&self, notifier: Arc<dyn Notifier>) -> Collaborators {
        Collaborators {
            party: Arc::new(self.party.clone()),
            inventory: Arc::new(self.inventory.clone()),
            payment: Arc::new(self.payment.clone()),
            publisher: Arc::new(TracingPublisher),
            notifier,
            metrics: Arc::new(RecorderMetrics),
            offers: Arc::new(self.offers.clone()),
        }
    }

    /// Adds or replaces every record in `fixtures`.
    pub fn seed(&self, fixtures: SandboxFixtures) {
        let records = fixtures.len();

        for artwork in fixtures.artworks {
            self.party
                .add_artwork(artwork.id, artwork.current_version_id);
        }
        for card in fixtures.credit_cards {
            self.party.add_credit_card(card);
        }
        for partner in fixtures.partners {
            self.party.add_partner(partner);
        }
        for account in fixtures.merchant_accounts {
            self.party.add_merchant_account(account);
        }
        for level in fixtures.stock {
            self.inventory.set_stock(level.artwork_id, level.available);
        }

        tracing::info!(records, "sandbox seeded");
    }
}
