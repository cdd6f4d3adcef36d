//! Payment gateway trait and in-memory implementation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::OrderId;
use domain::{Transaction, TransactionType};

use super::lock;
use super::party::{CreditCard, MerchantAccount};
use crate::charge::ChargeMetadata;
use crate::error::{CommitError, Result};

/// Everything the payment processor needs to authorize and capture a charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeParams {
    pub credit_card: CreditCard,
    pub buyer_amount_cents: i64,
    pub merchant_account: MerchantAccount,
    pub seller_amount_cents: i64,
    pub currency_code: String,
    pub description: String,
    pub metadata: ChargeMetadata,
}

/// Charges and refunds against the payment processor.
///
/// A declined card is not an error: the gateway returns a transaction with
/// `failed` status and the caller decides what to do with it. Errors are
/// reserved for transport problems.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, params: ChargeParams) -> Result<Transaction>;

    async fn refund(
        &self,
        order_id: OrderId,
        charge_id: &str,
        amount_cents: i64,
    ) -> Result<Transaction>;
}

#[derive(Debug, Default)]
struct PaymentState {
    charges: Vec<ChargeParams>,
    refunds: Vec<(String, i64)>,
    next_id: u32,
    decline: Option<(String, String)>,
    fail_with_error: bool,
    fail_refunds: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPayment {
    state: Arc<Mutex<PaymentState>>,
}

impl InMemoryPayment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines every following charge with the given processor code.
    pub fn decline_with(&self, code: impl Into<String>, message: impl Into<String>) {
        lock(&self.state).decline = Some((code.into(), message.into()));
    }

    /// Makes every following call fail with a gateway error.
    pub fn set_fail_with_error(&self, fail: bool) {
        lock(&self.state).fail_with_error = fail;
    }

    /// Makes every following refund fail with a gateway error.
    pub fn set_fail_refunds(&self, fail: bool) {
        lock(&self.state).fail_refunds = fail;
    }

    /// Charge requests received, including declined ones.
    pub fn charges(&self) -> Vec<ChargeParams> {
        lock(&self.state).charges.clone()
    }

    pub fn charge_count(&self) -> usize {
        lock(&self.state).charges.len()
    }

    /// Refunded charge ids with their amounts.
    pub fn refunds(&self) -> Vec<(String, i64)> {
        lock(&self.state).refunds.clone()
    }

    fn next_external_id(state: &mut PaymentState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}_{:04}", state.next_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPayment {
    async fn charge(&self, params: ChargeParams) -> Result<Transaction> {
        let mut state = lock(&self.state);
        if state.fail_with_error {
            return Err(CommitError::gateway("payment", "processor unreachable"));
        }

        let order_id = params.metadata.exchange_order_id;
        let amount = params.buyer_amount_cents;
        state.charges.push(params);

        let transaction = match state.decline.clone() {
            Some((code, message)) => {
                Transaction::failed(order_id, TransactionType::Charge, code, message, amount)
            }
            None => {
                let external_id = Self::next_external_id(&mut state, "ch");
                Transaction::succeeded(order_id, TransactionType::Charge, external_id, amount)
            }
        };
        Ok(transaction)
    }

    async fn refund(
        &self,
        order_id: OrderId,
        charge_id: &str,
        amount_cents: i64,
    ) -> Result<Transaction> {
        let mut state = lock(&self.state);
        if state.fail_with_error || state.fail_refunds {
            return Err(CommitError::gateway("payment", "processor unreachable"));
        }

        state.refunds.push((charge_id.to_string(), amount_cents));
        let external_id = Self::next_external_id(&mut state, "re");
        Ok(Transaction::succeeded(
            order_id,
            TransactionType::Refund,
            external_id,
            amount_cents,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Order, TransactionStatus};

    fn params() -> ChargeParams {
        let order = Order::new("user-1", "user", "partner-1", "gallery", "USD");
        ChargeParams {
            credit_card: CreditCard::active("cc-1", "card_1", "cus_1"),
            buyer_amount_cents: 5000,
            merchant_account: MerchantAccount {
                id: "ma-1".to_string(),
                partner_id: "partner-1".to_string(),
                external_id: "acct_1".to_string(),
            },
            seller_amount_cents: 4000,
            currency_code: "USD".to_string(),
            description: "GALLERY via Artsy".to_string(),
            metadata: ChargeMetadata::for_order(&order),
        }
    }

    #[tokio::test]
    async fn test_charge_succeeds() {
        let payment = InMemoryPayment::new();
        let transaction = payment.charge(params()).await.unwrap();

        assert_eq!(transaction.status, TransactionStatus::Succeeded);
        assert_eq!(transaction.external_id.as_deref(), Some("ch_0001"));
        assert_eq!(transaction.amount_cents, 5000);
        assert_eq!(payment.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_declined_charge_returns_failed_transaction() {
        let payment = InMemoryPayment::new();
        payment.decline_with("card_declined", "Your card was declined.");

        let transaction = payment.charge(params()).await.unwrap();

        assert!(transaction.is_failed());
        assert_eq!(transaction.failure_code.as_deref(), Some("card_declined"));
        assert!(transaction.external_id.is_none());
    }

    #[tokio::test]
    async fn test_refund_records_charge_id() {
        let payment = InMemoryPayment::new();
        let transaction = payment
            .refund(OrderId::new(), "ch_0001", 5000)
            .await
            .unwrap();

        assert_eq!(transaction.transaction_type, TransactionType::Refund);
        assert_eq!(payment.refunds(), vec![("ch_0001".to_string(), 5000)]);
    }

    #[tokio::test]
    async fn test_transport_error() {
        let payment = InMemoryPayment::new();
        payment.set_fail_with_error(true);
        assert!(matches!(
            payment.charge(params()).await,
            Err(CommitError::Gateway { service: "payment", .. })
        ));
        assert_eq!(payment.charge_count(), 0);
    }
}
