//! Payment transactions recorded against an order.

use chrono::{DateTime, Utc};
use common::{OrderId, TransactionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Charge,
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Succeeded,
    Failed,
}

/// Outcome of a call to the payment gateway.
///
/// Transactions are append-only evidence: once attached to an order they are
/// never modified, and a failed one is kept rather than rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub external_id: Option<String>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Records a successful gateway call.
    pub fn succeeded(
        order_id: OrderId,
        transaction_type: TransactionType,
        external_id: impl Into<String>,
        amount_cents: i64,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            order_id,
            external_id: Some(external_id.into()),
            transaction_type,
            status: TransactionStatus::Succeeded,
            failure_code: None,
            failure_message: None,
            amount_cents,
            created_at: Utc::now(),
        }
    }

    /// Records a declined or otherwise failed gateway call.
    pub fn failed(
        order_id: OrderId,
        transaction_type: TransactionType,
        failure_code: impl Into<String>,
        failure_message: impl Into<String>,
        amount_cents: i64,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            order_id,
            external_id: None,
            transaction_type,
            status: TransactionStatus::Failed,
            failure_code: Some(failure_code.into()),
            failure_message: Some(failure_message.into()),
            amount_cents,
            created_at: Utc::now(),
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }
}
