//! Order transitions outside the commit pipeline.

use chrono::Utc;
use common::{OfferId, OrderId};
use domain::{Order, OrderAction, Participant, StateReason};
use order_store::{OrderStore, OrderStoreExt};
use serde_json::json;

use crate::error::{CommitError, ErrorCode, Result};
use crate::gateways::{Collaborators, publish_order_event, undeduct_all};
use crate::load_order;
use crate::settings::CommitSettings;

/// Abandons, lapses, rejects, fulfills and refunds orders.
///
/// Every method takes the order lock, applies one state machine action,
/// persists the order, bumps `order.<action>` and publishes the event.
/// Cancellations after submit and refunds also give back the buyer's
/// money and the seller's inventory.
#[derive(Clone)]
pub struct OrderLifecycle<S: OrderStore> {
    store: S,
    services: Collaborators,
    settings: CommitSettings,
}

impl<S: OrderStore> OrderLifecycle<S> {
    pub fn new(store: S, services: Collaborators, settings: CommitSettings) -> Self {
        Self {
            store,
            services,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub async fn abandon(&self, order_id: OrderId, actor: &str) -> Result<Order> {
        let mut guard = self.store.lock(order_id).await?;
        let order = load_order(&self.store, &mut guard, order_id).await?;
        self.abandon_locked(guard, order, None, actor).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn seller_lapse(&self, order_id: OrderId, actor: &str) -> Result<Order> {
        let mut guard = self.store.lock(order_id).await?;
        let order = load_order(&self.store, &mut guard, order_id).await?;
        self.seller_lapse_locked(guard, order, actor).await
    }

    /// Rejects an offer on behalf of `responder` and cancels the order.
    #[tracing::instrument(skip(self))]
    pub async fn reject_offer(
        &self,
        offer_id: OfferId,
        responder: Participant,
        reason: StateReason,
        user_id: &str,
    ) -> Result<Order> {
        let offer = self
            .services
            .offers
            .get_offer(offer_id)
            .await?
            .ok_or(CommitError::OfferNotFound(offer_id))?;

        let mut guard = self.store.lock(offer.order_id).await?;
        let order = load_order(&self.store, &mut guard, offer.order_id).await?;

        offer.ensure_last_offer(&order)?;
        let cannot_reject = || {
            CommitError::validation_with(
                ErrorCode::CannotRejectOffer,
                json!({ "offer_id": offer_id, "reason": reason }),
            )
        };
        offer
            .ensure_awaiting_response(responder)
            .map_err(|_| cannot_reject())?;
        if !reason.is_rejection() {
            return Err(cannot_reject());
        }

        let mut order = order;
        order.transition(
            OrderAction::Reject,
            Some(reason),
            Utc::now(),
            &self.settings.expirations,
        )?;
        self.release(&mut order).await?;
        self.finish(guard, order, OrderAction::Reject, user_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn fulfill(&self, order_id: OrderId, actor: &str) -> Result<Order> {
        let mut guard = self.store.lock(order_id).await?;
        let mut order = load_order(&self.store, &mut guard, order_id).await?;

        order.transition(
            OrderAction::Fulfill,
            None,
            Utc::now(),
            &self.settings.expirations,
        )?;
        self.finish(guard, order, OrderAction::Fulfill, actor).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, order_id: OrderId, actor: &str) -> Result<Order> {
        let mut guard = self.store.lock(order_id).await?;
        let mut order = load_order(&self.store, &mut guard, order_id).await?;

        order.transition(
            OrderAction::Refund,
            None,
            Utc::now(),
            &self.settings.expirations,
        )?;
        self.release(&mut order).await?;
        self.finish(guard, order, OrderAction::Refund, actor).await
    }

    /// Cancels a pending order loaded under `guard`.
    pub(crate) async fn abandon_locked(
        &self,
        guard: S::Guard,
        mut order: Order,
        reason: Option<StateReason>,
        actor: &str,
    ) -> Result<Order> {
        order.transition(
            OrderAction::Abandon,
            reason,
            Utc::now(),
            &self.settings.expirations,
        )?;
        self.finish(guard, order, OrderAction::Abandon, actor).await
    }

    /// Cancels a submitted order the seller never answered, loaded under
    /// `guard`.
    pub(crate) async fn seller_lapse_locked(
        &self,
        guard: S::Guard,
        mut order: Order,
        actor: &str,
    ) -> Result<Order> {
        order.transition(
            OrderAction::SellerLapse,
            Some(StateReason::SellerLapsed),
            Utc::now(),
            &self.settings.expirations,
        )?;
        self.release(&mut order).await?;
        self.finish(guard, order, OrderAction::SellerLapse, actor).await
    }

    /// Refunds the captured charge, if any, then returns every line item to
    /// inventory. A refund transport error aborts before anything is
    /// released.
    async fn release(&self, order: &mut Order) -> Result<()> {
        if let Some(charge_id) = order.external_charge_id.clone() {
            let refund = self
                .services
                .payment
                .refund(order.id, &charge_id, order.buyer_total_cents)
                .await?;
            if refund.is_failed() {
                tracing::error!(
                    order_id = %order.id,
                    %charge_id,
                    failure_code = ?refund.failure_code,
                    "refund failed"
                );
            }
            order.push_transaction(refund);
        }

        undeduct_all(&*self.services.inventory, &order.line_items).await;
        Ok(())
    }

    async fn finish(
        &self,
        mut guard: S::Guard,
        mut order: Order,
        action: OrderAction,
        actor: &str,
    ) -> Result<Order> {
        self.store
            .save_locked_in_place(&mut guard, &mut order)
            .await?;
        self.store.unlock(guard).await?;
        self.services.metrics.increment(&format!("order.{action}"));
        publish_order_event(&*self.services.publisher, &order, action, actor).await;
        tracing::info!(
            order_id = %order.id,
            %action,
            state = %order.state(),
            reason = ?order.state_reason(),
            "order transitioned"
        );
        Ok(order)
    }
}
