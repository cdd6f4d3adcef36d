//! Offer response endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OfferId;
use domain::{Order, Participant, StateReason};
use order_store::OrderStore;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AcceptOfferRequest {
    pub responder: Participant,
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct RejectOfferRequest {
    pub responder: Participant,
    pub reason: StateReason,
    pub user_id: String,
}

/// POST /offers/{id}/accept: approve the order at the offer's amounts.
#[tracing::instrument(skip(state, req))]
pub async fn accept<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AcceptOfferRequest>,
) -> Result<Json<Order>, ApiError> {
    let offer_id = parse_offer_id(&id)?;
    let order = state
        .coordinator
        .accept_offer(offer_id, req.responder, &req.user_id)
        .await?;
    Ok(Json(order))
}

/// POST /offers/{id}/reject: cancel the order with a rejection reason.
#[tracing::instrument(skip(state, req))]
pub async fn reject<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RejectOfferRequest>,
) -> Result<Json<Order>, ApiError> {
    let offer_id = parse_offer_id(&id)?;
    let order = state
        .lifecycle
        .reject_offer(offer_id, req.responder, req.reason, &req.user_id)
        .await?;
    Ok(Json(order))
}

fn parse_offer_id(id: &str) -> Result<OfferId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid offer id: {e}")))
}
