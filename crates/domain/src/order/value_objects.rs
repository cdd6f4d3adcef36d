//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

/// Whether the order is a straight purchase or a negotiated offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    #[default]
    Buy,
    Offer,
}

/// How the buyer receives the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    Ship,
    Pickup,
}

/// The two sides of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Buyer,
    Seller,
}

impl Participant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Participant::Buyer => "buyer",
            Participant::Seller => "seller",
        }
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an order ended up in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateReason {
    /// A pending order expired before the buyer submitted it.
    ExpiredUnconfirmed,
    /// The seller did not respond to a submitted order in time.
    SellerLapsed,
    SellerRejectedOfferTooLow,
    SellerRejectedShippingUnavailable,
    SellerRejectedArtworkUnavailable,
    SellerRejectedOther,
    SellerRejected,
    BuyerRejected,
}

impl StateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateReason::ExpiredUnconfirmed => "expired_unconfirmed",
            StateReason::SellerLapsed => "seller_lapsed",
            StateReason::SellerRejectedOfferTooLow => "seller_rejected_offer_too_low",
            StateReason::SellerRejectedShippingUnavailable => {
                "seller_rejected_shipping_unavailable"
            }
            StateReason::SellerRejectedArtworkUnavailable => "seller_rejected_artwork_unavailable",
            StateReason::SellerRejectedOther => "seller_rejected_other",
            StateReason::SellerRejected => "seller_rejected",
            StateReason::BuyerRejected => "buyer_rejected",
        }
    }

    /// Returns true if this reason may be given when rejecting an offer.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            StateReason::ExpiredUnconfirmed | StateReason::SellerLapsed
        )
    }
}

impl std::fmt::Display for StateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shipping destination captured on the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl ShippingAddress {
    /// Returns true if every field a carrier needs is present.
    ///
    /// `address_line2` and `region` are optional in many countries.
    pub fn is_complete(&self) -> bool {
        [
            &self.name,
            &self.address_line1,
            &self.city,
            &self.country,
            &self.postal_code,
        ]
        .iter()
        .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}
