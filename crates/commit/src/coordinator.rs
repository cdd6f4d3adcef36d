//! Commit coordinator for the `submit` and `approve` actions.

use chrono::Utc;
use common::{OfferId, OrderId};
use domain::{
    CommitAction, LineItem, Offer, Order, OrderMode, OrderStateMachine, Participant, Transaction,
    recompute_totals,
};
use order_store::{OrderStore, OrderStoreExt};
use serde_json::json;

use crate::charge::{ChargeMetadata, charge_description};
use crate::error::{CommitError, ErrorCode, Result};
use crate::gateways::{
    ChargeParams, Collaborators, CreditCard, Partner, publish_order_event, undeduct_all,
};
use crate::load_order;
use crate::settings::CommitSettings;

/// Counter incremented when a line item points at an outdated artwork.
pub const ARTWORK_VERSION_MISMATCH_METRIC: &str = "submit.artwork_version_mismatch";

fn effective_commission_rate(partner: &Partner) -> Result<f64> {
    partner.effective_commission_rate.ok_or_else(|| {
        CommitError::validation_with(
            ErrorCode::MissingCommissionRate,
            json!({ "partner_id": partner.id }),
        )
    })
}

/// Mutable state of one commit attempt.
///
/// `order` is a working copy; the stored order is only overwritten once the
/// whole pipeline has succeeded.
struct CommitRun {
    order: Order,
    deducted: Vec<LineItem>,
    transaction: Option<Transaction>,
}

/// Runs the commit pipeline for an order.
///
/// The pipeline validates preconditions, reserves inventory for every line
/// item, charges the buyer and advances the order. Any failure once
/// reservation has begun releases what was reserved before the error is
/// returned, and a charge captured by an attempt that then failed is
/// refunded. A charge transaction, successful or not, always ends up in the
/// order's history.
pub struct CommitCoordinator<S: OrderStore> {
    store: S,
    services: Collaborators,
    settings: CommitSettings,
}

impl<S: OrderStore> CommitCoordinator<S> {
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

    /// Commits `action` on the order, holding the order lock throughout.
    #[tracing::instrument(skip(self))]
    pub async fn commit(
        &self,
        order_id: OrderId,
        action: CommitAction,
        user_id: &str,
    ) -> Result<Order> {
        let mut guard = self.store.lock(order_id).await?;
        let order = load_order(&self.store, &mut guard, order_id).await?;
        self.commit_locked(guard, order, action, user_id).await
    }

    /// Parses `action` and commits it. Names outside the committable set
    /// fail with `uncommittable_action` before the order is touched.
    pub async fn commit_named(
        &self,
        order_id: OrderId,
        action: &str,
        user_id: &str,
    ) -> Result<Order> {
        let action: CommitAction = action.parse()?;
        self.commit(order_id, action, user_id).await
    }

    /// Accepts an offer on behalf of `responder` and approves the order.
    #[tracing::instrument(skip(self))]
    pub async fn accept_offer(
        &self,
        offer_id: OfferId,
        responder: Participant,
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
        offer.ensure_awaiting_response(responder)?;

        self.commit_locked(guard, order, CommitAction::Approve, user_id)
            .await
    }

    async fn commit_locked(
        &self,
        mut guard: S::Guard,
        order: Order,
        action: CommitAction,
        user_id: &str,
    ) -> Result<Order> {
        let mut run = CommitRun {
            order,
            deducted: Vec::new(),
            transaction: None,
        };

        let outcome = self.execute(&mut guard, &mut run, action).await;
        let result = match outcome {
            Ok(()) => self.store.unlock(guard).await.map_err(CommitError::from),
            Err(error) => {
                drop(guard);
                Err(error)
            }
        };

        match result {
            Ok(()) => {
                let order = run.order;
                self.services.metrics.increment(&format!("order.{action}"));
                publish_order_event(&*self.services.publisher, &order, action.into(), user_id)
                    .await;
                tracing::info!(order_id = %order.id, %action, state = %order.state(), "order committed");
                Ok(order)
            }
            Err(error) => {
                self.compensate(run, user_id).await;
                tracing::warn!(
                    %action,
                    error_type = error.error_type(),
                    code = ?error.code(),
                    %error,
                    "order commit failed"
                );
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        guard: &mut S::Guard,
        run: &mut CommitRun,
        action: CommitAction,
    ) -> Result<()> {
        let order = &mut run.order;

        if !order.can_commit() {
            return Err(CommitError::validation(ErrorCode::MissingRequiredInfo));
        }
        self.validate_artwork_versions(order).await?;
        OrderStateMachine::apply(order, action.into())?;
        let credit_card = self.validate_credit_card(order).await?;
        let partner = self.services.party.fetch_partner(&order.seller_id).await?;
        let commission_rate = effective_commission_rate(&partner)?;
        let offer = self.current_offer(order).await?;
        recompute_totals(order, commission_rate, offer.as_ref(), &self.settings.fees);

        for item in &order.line_items {
            self.services.inventory.deduct(item).await?;
            run.deducted.push(item.clone());
        }

        order.transition(action.into(), None, Utc::now(), &self.settings.expirations)?;
        let transaction = self.charge(order, &partner, credit_card).await?;
        run.transaction = Some(transaction.clone());

        if transaction.is_failed() {
            return Err(CommitError::processing_with(
                ErrorCode::ChargeAuthorizationFailed,
                json!({
                    "transaction_id": transaction.id,
                    "failure_code": transaction.failure_code,
                    "failure_message": transaction.failure_message,
                }),
            ));
        }

        order.external_charge_id = transaction.external_id.clone();
        order.push_transaction(transaction);
        self.store.save_locked_in_place(guard, order).await?;
        Ok(())
    }

    async fn validate_artwork_versions(&self, order: &Order) -> Result<()> {
        for item in &order.line_items {
            let artwork = self.services.party.get_artwork(&item.artwork_id).await?;
            if artwork.current_version_id != item.artwork_version_id {
                self.services
                    .metrics
                    .increment(ARTWORK_VERSION_MISMATCH_METRIC);
                return Err(CommitError::processing_with(
                    ErrorCode::ArtworkVersionMismatch,
                    json!({ "artwork_id": item.artwork_id }),
                ));
            }
        }
        Ok(())
    }

    /// Fetches the order's card and rejects unusable ones. A deactivated
    /// card wins over a missing customer, which wins over a missing
    /// external id.
    async fn validate_credit_card(&self, order: &Order) -> Result<CreditCard> {
        let credit_card_id = order.credit_card_id.as_deref().unwrap_or_default();
        let card = self.services.party.get_credit_card(credit_card_id).await?;

        let code = if card.deactivated_at.is_some() {
            Some(ErrorCode::CreditCardDeactivated)
        } else if card.customer_external_id().is_none() {
            Some(ErrorCode::CreditCardMissingCustomer)
        } else if !card.has_external_id() {
            Some(ErrorCode::CreditCardMissingExternalId)
        } else {
            None
        };

        match code {
            Some(code) => Err(CommitError::validation_with(
                code,
                json!({ "credit_card_id": card.id }),
            )),
            None => Ok(card),
        }
    }

    /// Resolves the offer an offer-mode order is priced from.
    async fn current_offer(&self, order: &Order) -> Result<Option<Offer>> {
        if order.mode != OrderMode::Offer {
            return Ok(None);
        }

        let offer_id = order
            .last_offer_id
            .ok_or_else(|| CommitError::validation(ErrorCode::MissingRequiredInfo))?;
        let offer = self
            .services
            .offers
            .get_offer(offer_id)
            .await?
            .filter(|offer| offer.order_id == order.id)
            .ok_or_else(|| CommitError::validation(ErrorCode::MissingRequiredInfo))?;
        Ok(Some(offer))
    }

    async fn charge(
        &self,
        order: &Order,
        partner: &Partner,
        credit_card: CreditCard,
    ) -> Result<Transaction> {
        let merchant_account = self
            .services
            .party
            .get_merchant_account(&order.seller_id)
            .await?;

        let params = ChargeParams {
            credit_card,
            buyer_amount_cents: order.buyer_total_cents,
            merchant_account,
            seller_amount_cents: order.seller_total_cents,
            currency_code: order.currency_code.clone(),
            description: charge_description(
                partner.name.as_deref(),
                &self.settings.charge_description_suffix,
            ),
            metadata: ChargeMetadata::for_order(order),
        };

        self.services.payment.charge(params).await
    }

    /// Undoes the side effects of a failed attempt: reserved inventory goes
    /// back, a captured charge is refunded and the charge history is
    /// recorded on the stored order.
    async fn compensate(&self, run: CommitRun, user_id: &str) {
        undeduct_all(&*self.services.inventory, &run.deducted).await;

        let Some(charge) = run.transaction else {
            return;
        };
        let order_id = run.order.id;
        let refund = self.refund_captured(order_id, &charge).await;
        let refunded = refund.as_ref().is_some_and(|refund| !refund.is_failed());
        let unrefunded_charge_id = (!charge.is_failed() && !refunded)
            .then(|| charge.external_id.clone())
            .flatten();

        let failed = charge.is_failed();
        let transaction_id = charge.id;
        let transactions: Vec<Transaction> = std::iter::once(charge).chain(refund).collect();

        if let Err(error) = self
            .record_attempt(order_id, transactions, unrefunded_charge_id)
            .await
        {
            tracing::error!(%order_id, %error, "failed to record charge transaction");
        }

        if failed
            && let Err(error) = self
                .services
                .notifier
                .notify_failed_charge(transaction_id, user_id)
        {
            tracing::warn!(%transaction_id, %error, "failed to enqueue failed charge notification");
        }
    }

    /// Refunds a charge that succeeded even though the commit did not.
    async fn refund_captured(
        &self,
        order_id: OrderId,
        charge: &Transaction,
    ) -> Option<Transaction> {
        if charge.is_failed() {
            return None;
        }
        let charge_id = charge.external_id.as_deref()?;

        match self
            .services
            .payment
            .refund(order_id, charge_id, charge.amount_cents)
            .await
        {
            Ok(refund) => {
                if refund.is_failed() {
                    tracing::error!(
                        %order_id,
                        %charge_id,
                        failure_code = ?refund.failure_code,
                        "refund of uncommitted charge failed"
                    );
                }
                Some(refund)
            }
            Err(error) => {
                tracing::error!(%order_id, %charge_id, %error, "refund of uncommitted charge failed");
                None
            }
        }
    }

    /// Appends `transactions` to the stored order under a fresh lock. A
    /// charge that could not be refunded stays referenced by the order.
    async fn record_attempt(
        &self,
        order_id: OrderId,
        transactions: Vec<Transaction>,
        unrefunded_charge_id: Option<String>,
    ) -> Result<()> {
        let mut guard = self.store.lock(order_id).await?;
        let mut order = load_order(&self.store, &mut guard, order_id).await?;

        for transaction in transactions {
            order.push_transaction(transaction);
        }
        if unrefunded_charge_id.is_some() {
            order.external_charge_id = unrefunded_charge_id;
        }

        self.store.save_locked(&mut guard, &order).await?;
        self.store.unlock(guard).await?;
        Ok(())
    }
}
