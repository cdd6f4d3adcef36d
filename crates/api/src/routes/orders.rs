//! Order lookup, commit and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use commit::ReconcileOutcome;
use common::OrderId;
use domain::{FulfillmentType, LineItem, Order, OrderMode, OrderState, ShippingAddress};
use order_store::{OrderStore, OrderStoreExt};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub buyer_id: String,
    pub buyer_type: String,
    pub seller_id: String,
    pub seller_type: String,
    pub currency_code: String,
    #[serde(default)]
    pub mode: OrderMode,
    pub buyer_phone_number: Option<String>,
    pub credit_card_id: Option<String>,
    pub fulfillment_type: Option<FulfillmentType>,
    #[serde(default)]
    pub shipping: ShippingAddress,
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub artwork_id: String,
    pub artwork_version_id: String,
    pub edition_set_id: Option<String>,
    pub quantity: u32,
    pub list_price_cents: i64,
}

impl CreateOrderRequest {
    fn into_order(self) -> Result<Order, ApiError> {
        if self.line_items.is_empty() {
            return Err(ApiError::BadRequest(
                "An order needs at least one line item".to_string(),
            ));
        }
        if let Some(item) = self
            .line_items
            .iter()
            .find(|item| item.quantity == 0 || item.list_price_cents < 0)
        {
            return Err(ApiError::BadRequest(format!(
                "Invalid quantity or price for artwork {}",
                item.artwork_id
            )));
        }

        let mut order = Order::new(
            self.buyer_id,
            self.buyer_type,
            self.seller_id,
            self.seller_type,
            self.currency_code,
        );
        order.mode = self.mode;
        order.buyer_phone_number = self.buyer_phone_number;
        order.credit_card_id = self.credit_card_id;
        order.fulfillment_type = self.fulfillment_type;
        order.shipping = self.shipping;
        order.line_items = self
            .line_items
            .into_iter()
            .map(|item| {
                let line_item = LineItem::new(
                    item.artwork_id,
                    item.artwork_version_id,
                    item.quantity,
                    item.list_price_cents,
                );
                match item.edition_set_id {
                    Some(edition_set_id) => line_item.with_edition_set(edition_set_id),
                    None => line_item,
                }
            })
            .collect();
        order.total_list_price_cents = order
            .line_items
            .iter()
            .map(LineItem::total_list_price_cents)
            .sum();
        Ok(order)
    }
}

#[derive(Deserialize)]
pub struct CommitRequest {
    pub action: String,
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct ExpireRequest {
    pub expected_state: OrderState,
}

#[derive(Deserialize)]
pub struct ActorRequest {
    pub actor: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ExpireResponse {
    pub outcome: &'static str,
    pub order: Option<Order>,
}

// -- Handlers --

/// POST /orders: create a pending order that expires if it is never
/// submitted.
#[tracing::instrument(skip_all)]
pub async fn create<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let mut order = req.into_order()?;
    if let Some(window) = state.settings.expirations.window(OrderState::Pending) {
        order = order.expiring_at(Utc::now() + window);
    }

    state.store.insert_in_place(&mut order).await?;
    tracing::info!(order_id = %order.id, mode = ?order.mode, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id}: load an order with its line items and transactions.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .load(order_id)
        .await
        .map_err(commit::CommitError::from)?
        .ok_or(commit::CommitError::OrderNotFound(order_id))?;
    Ok(Json(order))
}

/// POST /orders/{id}/commit: run `submit` or `approve` through the commit
/// pipeline.
#[tracing::instrument(skip(state, req))]
pub async fn commit<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CommitRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .coordinator
        .commit_named(order_id, &req.action, &req.user_id)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/expire: re-check an expiration queued by the scheduler.
#[tracing::instrument(skip(state, req))]
pub async fn expire<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ExpireRequest>,
) -> Result<Json<ExpireResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let response = match state
        .reconciler
        .reconcile(order_id, req.expected_state)
        .await?
    {
        ReconcileOutcome::Stale => ExpireResponse {
            outcome: "stale",
            order: None,
        },
        ReconcileOutcome::Expired(order) => ExpireResponse {
            outcome: "expired",
            order: Some(order),
        },
    };
    Ok(Json(response))
}

/// POST /orders/{id}/abandon
#[tracing::instrument(skip(state, req))]
pub async fn abandon<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.lifecycle.abandon(order_id, &req.actor).await?))
}

/// POST /orders/{id}/fulfill
#[tracing::instrument(skip(state, req))]
pub async fn fulfill<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.lifecycle.fulfill(order_id, &req.actor).await?))
}

/// POST /orders/{id}/refund
#[tracing::instrument(skip(state, req))]
pub async fn refund<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.lifecycle.refund(order_id, &req.actor).await?))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
