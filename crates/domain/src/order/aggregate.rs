//! Order aggregate root.

use chrono::{DateTime, Utc};
use common::{OfferId, OrderId, Version};
use serde::{Deserialize, Serialize};

use super::{
    FulfillmentType, LineItem, OrderAction, OrderError, OrderMode, OrderState, OrderStateMachine,
    ShippingAddress, StateExpirations, StateReason, Transaction,
};

/// Seller type used by auction houses; drives the charge metadata tag.
pub const AUCTION_SELLER_TYPE: &str = "auction";

/// An order moving through negotiation and fulfillment.
///
/// Line items and transactions are owned by the order and share its
/// lifetime. State, expiry and transaction history only change through the
/// methods below so the state machine stays the single source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Storage version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    pub code: String,
    pub mode: OrderMode,

    state: OrderState,
    state_reason: Option<StateReason>,
    state_expires_at: Option<DateTime<Utc>>,

    pub buyer_id: String,
    pub buyer_type: String,
    pub buyer_phone_number: Option<String>,
    pub seller_id: String,
    pub seller_type: String,
    pub currency_code: String,

    pub items_total_cents: i64,
    pub shipping_total_cents: i64,
    pub tax_total_cents: i64,
    pub commission_fee_cents: i64,
    pub transaction_fee_cents: i64,
    pub buyer_total_cents: i64,
    pub seller_total_cents: i64,
    pub total_list_price_cents: i64,

    pub credit_card_id: Option<String>,
    pub external_charge_id: Option<String>,
    pub fulfillment_type: Option<FulfillmentType>,
    pub shipping: ShippingAddress,

    /// Most recent offer in the negotiation subsystem. Lookup key only.
    pub last_offer_id: Option<OfferId>,

    pub line_items: Vec<LineItem>,
    transactions: Vec<Transaction>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order between a buyer and a seller.
    pub fn new(
        buyer_id: impl Into<String>,
        buyer_type: impl Into<String>,
        seller_id: impl Into<String>,
        seller_type: impl Into<String>,
        currency_code: impl Into<String>,
    ) -> Self {
        let id = OrderId::new();
        let now = Utc::now();
        Self {
            id,
            version: Version::initial(),
            code: format!("{:09}", id.as_uuid().as_u128() % 1_000_000_000),
            mode: OrderMode::Buy,
            state: OrderState::Pending,
            state_reason: None,
            state_expires_at: None,
            buyer_id: buyer_id.into(),
            buyer_type: buyer_type.into(),
            buyer_phone_number: None,
            seller_id: seller_id.into(),
            seller_type: seller_type.into(),
            currency_code: currency_code.into(),
            items_total_cents: 0,
            shipping_total_cents: 0,
            tax_total_cents: 0,
            commission_fee_cents: 0,
            transaction_fee_cents: 0,
            buyer_total_cents: 0,
            seller_total_cents: 0,
            total_list_price_cents: 0,
            credit_card_id: None,
            external_charge_id: None,
            fulfillment_type: None,
            shipping: ShippingAddress::default(),
            last_offer_id: None,
            line_items: Vec::new(),
            transactions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Places the order directly in `state`, as when importing existing
    /// records.
    pub fn in_state(mut self, state: OrderState) -> Self {
        self.state = state;
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.state_expires_at = Some(at);
        self
    }
}

// Query methods
impl Order {
    pub fn version(&self) -> Version {
        self.version
    }

    /// Called by the store after a successful save.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn state_reason(&self) -> Option<StateReason> {
        self.state_reason
    }

    pub fn state_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state_expires_at
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.transactions.last()
    }

    pub fn is_auction_seller(&self) -> bool {
        self.seller_type == AUCTION_SELLER_TYPE
    }

    /// Returns true if the buyer has given a usable destination.
    pub fn has_shipping_info(&self) -> bool {
        match self.fulfillment_type {
            Some(FulfillmentType::Pickup) => true,
            Some(FulfillmentType::Ship) => self.shipping.is_complete(),
            None => false,
        }
    }

    /// Returns true if the order carries everything needed to charge it.
    pub fn can_commit(&self) -> bool {
        !self.buyer_id.is_empty()
            && !self.seller_id.is_empty()
            && self.credit_card_id.as_deref().is_some_and(|id| !id.is_empty())
            && !self.line_items.is_empty()
            && self.has_shipping_info()
    }

    /// Returns true once the expiry timestamp has been reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state_expires_at.is_some_and(|at| now >= at)
    }
}

// Mutations
impl Order {
    /// Applies `action` through the state machine.
    ///
    /// Resets the expiry to the window configured for the new state and
    /// records `reason`. Leaves the order untouched if the transition is
    /// not allowed.
    pub fn transition(
        &mut self,
        action: OrderAction,
        reason: Option<StateReason>,
        now: DateTime<Utc>,
        expirations: &StateExpirations,
    ) -> Result<OrderState, OrderError> {
        let next = OrderStateMachine::apply(self, action)?;
        self.state = next;
        self.state_reason = reason;
        self.state_expires_at = expirations.window(next).map(|window| now + window);
        self.updated_at = now;
        Ok(next)
    }

    /// Appends a transaction to the history.
    pub fn push_transaction(&mut self, transaction: Transaction) {
        self.updated_at = Utc::now();
        self.transactions.push(transaction);
    }
}
