//! Domain events published after an order action succeeds.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{FulfillmentType, LineItem, Order, OrderAction, OrderMode, OrderState, StateReason};

/// Topic every order event is published on.
pub const ORDER_EVENT_TOPIC: &str = "commerce";

/// Per line item detail carried on an order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDetail {
    pub price_cents: i64,
    pub list_price_cents: i64,
    pub artwork_id: String,
    pub edition_set_id: Option<String>,
    pub quantity: u32,
    pub commission_fee_cents: i64,
}

impl From<&LineItem> for LineItemDetail {
    fn from(item: &LineItem) -> Self {
        Self {
            price_cents: item.list_price_cents,
            list_price_cents: item.list_price_cents,
            artwork_id: item.artwork_id.clone(),
            edition_set_id: item.edition_set_id.clone(),
            quantity: item.quantity,
            commission_fee_cents: item.commission_fee_cents,
        }
    }
}

/// Snapshot of the order attributes consumers rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProperties {
    pub mode: OrderMode,
    pub code: String,
    pub state: OrderState,
    pub state_reason: Option<StateReason>,
    pub state_expires_at: Option<DateTime<Utc>>,
    pub buyer_id: String,
    pub buyer_type: String,
    pub buyer_phone_number: Option<String>,
    pub seller_id: String,
    pub seller_type: String,
    pub currency_code: String,
    pub fulfillment_type: Option<FulfillmentType>,
    pub items_total_cents: i64,
    pub shipping_total_cents: i64,
    pub tax_total_cents: i64,
    pub commission_fee_cents: i64,
    pub transaction_fee_cents: i64,
    pub buyer_total_cents: i64,
    pub seller_total_cents: i64,
    pub total_list_price_cents: i64,
    pub shipping_name: Option<String>,
    pub shipping_address_line1: Option<String>,
    pub shipping_address_line2: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_region: Option<String>,
    pub shipping_country: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub line_items: Vec<LineItemDetail>,
}

impl From<&Order> for OrderProperties {
    fn from(order: &Order) -> Self {
        Self {
            mode: order.mode,
            code: order.code.clone(),
            state: order.state(),
            state_reason: order.state_reason(),
            state_expires_at: order.state_expires_at(),
            buyer_id: order.buyer_id.clone(),
            buyer_type: order.buyer_type.clone(),
            buyer_phone_number: order.buyer_phone_number.clone(),
            seller_id: order.seller_id.clone(),
            seller_type: order.seller_type.clone(),
            currency_code: order.currency_code.clone(),
            fulfillment_type: order.fulfillment_type,
            items_total_cents: order.items_total_cents,
            shipping_total_cents: order.shipping_total_cents,
            tax_total_cents: order.tax_total_cents,
            commission_fee_cents: order.commission_fee_cents,
            transaction_fee_cents: order.transaction_fee_cents,
            buyer_total_cents: order.buyer_total_cents,
            seller_total_cents: order.seller_total_cents,
            total_list_price_cents: order.total_list_price_cents,
            shipping_name: order.shipping.name.clone(),
            shipping_address_line1: order.shipping.address_line1.clone(),
            shipping_address_line2: order.shipping.address_line2.clone(),
            shipping_city: order.shipping.city.clone(),
            shipping_region: order.shipping.region.clone(),
            shipping_country: order.shipping.country.clone(),
            shipping_postal_code: order.shipping.postal_code.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
            line_items: order.line_items.iter().map(LineItemDetail::from).collect(),
        }
    }
}

/// An order action that has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub subject: OrderId,
    pub actor: String,
    pub action: String,
    pub properties: OrderProperties,
    pub published_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Builds the event for `action` from the order as it was stored.
    pub fn new(order: &Order, action: OrderAction, actor: impl Into<String>) -> Self {
        Self {
            subject: order.id,
            actor: actor.into(),
            action: action.event_verb().to_string(),
            properties: OrderProperties::from(order),
            published_at: Utc::now(),
        }
    }
}
