//! Seeding endpoints for the in-memory collaborators.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use commit::CommitError;
use domain::{Offer, OrderMode, Participant};
use order_store::OrderStore;
use serde::Deserialize;

use crate::SandboxState;
use crate::error::ApiError;
use crate::routes::orders::parse_order_id;
use crate::sandbox::SandboxFixtures;

#[derive(Deserialize)]
pub struct CreateOfferRequest {
    pub from_participant: Participant,
    pub amount_cents: i64,
    #[serde(default)]
    pub shipping_total_cents: i64,
    #[serde(default)]
    pub tax_total_cents: i64,
}

/// POST /sandbox/fixtures: add artworks, cards, partners, merchant accounts
/// and stock levels.
#[tracing::instrument(skip_all)]
pub async fn seed<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<SandboxState<S>>>,
    Json(fixtures): Json<SandboxFixtures>,
) -> StatusCode {
    state.sandbox.seed(fixtures);
    StatusCode::NO_CONTENT
}

/// POST /sandbox/orders/{id}/offers: place an offer on an offer-mode order
/// and make it the order's current offer.
#[tracing::instrument(skip(state, req))]
pub async fn create_offer<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<SandboxState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<Offer>), ApiError> {
    let order_id = parse_order_id(&id)?;
    let store = &state.app.store;

    let mut guard = store.lock(order_id).await?;
    let mut order = store
        .load_locked(&mut guard, order_id)
        .await?
        .ok_or(CommitError::OrderNotFound(order_id))?;
    if order.mode != OrderMode::Offer {
        return Err(ApiError::BadRequest(format!(
            "Order {order_id} does not accept offers"
        )));
    }

    let mut offer = Offer::new(order_id, req.from_participant, req.amount_cents);
    offer.shipping_total_cents = req.shipping_total_cents;
    offer.tax_total_cents = req.tax_total_cents;

    order.last_offer_id = Some(offer.id);
    store.save_locked(&mut guard, &order).await?;
    store.unlock(guard).await?;
    state.sandbox.offers.insert(offer.clone());

    tracing::info!(%order_id, offer_id = %offer.id, "offer placed");
    Ok((StatusCode::CREATED, Json(offer)))
}
