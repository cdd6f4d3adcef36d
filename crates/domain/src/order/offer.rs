//! Offers exchanged while negotiating an order.

use chrono::{DateTime, Utc};
use common::{OfferId, OrderId};
use serde::{Deserialize, Serialize};

use super::{Order, OrderError, Participant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferState {
    Pending,
    Submitted,
}

/// An offer owned by the negotiation subsystem.
///
/// Orders only refer to offers through `Order::last_offer_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub order_id: OrderId,
    pub from_participant: Participant,
    pub amount_cents: i64,
    pub shipping_total_cents: i64,
    pub tax_total_cents: i64,
    pub state: OfferState,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn new(order_id: OrderId, from_participant: Participant, amount_cents: i64) -> Self {
        Self {
            id: OfferId::new(),
            order_id,
            from_participant,
            amount_cents,
            shipping_total_cents: 0,
            tax_total_cents: 0,
            state: OfferState::Submitted,
            expires_at: None,
        }
    }

    /// Returns true if `responder` is the party the offer is waiting on.
    pub fn awaits_response_from(&self, responder: Participant) -> bool {
        self.from_participant != responder
    }

    pub fn ensure_awaiting_response(&self, responder: Participant) -> Result<(), OrderError> {
        if !self.awaits_response_from(responder) {
            return Err(OrderError::NotAwaitingResponse {
                offer_id: self.id,
                responder,
            });
        }
        Ok(())
    }

    /// Checks that `order` still points at this offer.
    pub fn ensure_last_offer(&self, order: &Order) -> Result<(), OrderError> {
        if order.id != self.order_id || order.last_offer_id != Some(self.id) {
            return Err(OrderError::NotLastOffer { offer_id: self.id });
        }
        Ok(())
    }
}
