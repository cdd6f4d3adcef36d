//! Commit error types.

use common::{OfferId, OrderId};
use domain::OrderError;
use order_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Machine-readable reason attached to validation and processing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UncommittableAction,
    MissingRequiredInfo,
    InvalidState,
    CreditCardMissingExternalId,
    CreditCardMissingCustomer,
    CreditCardDeactivated,
    MissingCommissionRate,
    NotLastOffer,
    CannotAcceptOffer,
    CannotRejectOffer,
    ArtworkVersionMismatch,
    ChargeAuthorizationFailed,
    InsufficientInventory,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UncommittableAction => "uncommittable_action",
            ErrorCode::MissingRequiredInfo => "missing_required_info",
            ErrorCode::InvalidState => "invalid_state",
            ErrorCode::CreditCardMissingExternalId => "credit_card_missing_external_id",
            ErrorCode::CreditCardMissingCustomer => "credit_card_missing_customer",
            ErrorCode::CreditCardDeactivated => "credit_card_deactivated",
            ErrorCode::MissingCommissionRate => "missing_commission_rate",
            ErrorCode::NotLastOffer => "not_last_offer",
            ErrorCode::CannotAcceptOffer => "cannot_accept_offer",
            ErrorCode::CannotRejectOffer => "cannot_reject_offer",
            ErrorCode::ArtworkVersionMismatch => "artwork_version_mismatch",
            ErrorCode::ChargeAuthorizationFailed => "charge_authorization_failed",
            ErrorCode::InsufficientInventory => "insufficient_inventory",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A coded failure with optional structured data for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Failure {
    pub fn new(code: ErrorCode) -> Self {
        Self { code, data: None }
    }

    pub fn with_data(code: ErrorCode, data: Value) -> Self {
        Self {
            code,
            data: Some(data),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{} {}", self.code, data),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Errors surfaced by the commit coordinator, lifecycle and reconciler.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Caller, input or state problem. Never retried.
    #[error("Validation failed: {0}")]
    Validation(Failure),

    /// An external system refused the operation.
    #[error("Processing failed: {0}")]
    Processing(Failure),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// Unexpected transport failure talking to a collaborator.
    #[error("{service} error: {message}")]
    Gateway {
        service: &'static str,
        message: String,
    },

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

impl CommitError {
    pub fn validation(code: ErrorCode) -> Self {
        CommitError::Validation(Failure::new(code))
    }

    pub fn validation_with(code: ErrorCode, data: Value) -> Self {
        CommitError::Validation(Failure::with_data(code, data))
    }

    pub fn processing(code: ErrorCode) -> Self {
        CommitError::Processing(Failure::new(code))
    }

    pub fn processing_with(code: ErrorCode, data: Value) -> Self {
        CommitError::Processing(Failure::with_data(code, data))
    }

    pub fn gateway(service: &'static str, message: impl Into<String>) -> Self {
        CommitError::Gateway {
            service,
            message: message.into(),
        }
    }

    /// Returns the failure code for validation and processing errors.
    pub fn code(&self) -> Option<ErrorCode> {
        self.failure().map(|failure| failure.code)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CommitError::Validation(failure) | CommitError::Processing(failure) => Some(failure),
            _ => None,
        }
    }

    /// Short category name used in logs and error responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            CommitError::Validation(_) => "validation",
            CommitError::Processing(_) => "processing",
            CommitError::OrderNotFound(_) | CommitError::OfferNotFound(_) => "not_found",
            CommitError::Gateway { .. } => "gateway",
            CommitError::Store(_) => "internal",
        }
    }
}

impl From<OrderError> for CommitError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStateTransition {
                current_state,
                action,
            } => CommitError::validation_with(
                ErrorCode::InvalidState,
                json!({ "state": current_state, "action": action }),
            ),
            OrderError::UncommittableAction(action) => CommitError::validation_with(
                ErrorCode::UncommittableAction,
                json!({ "action": action }),
            ),
            OrderError::UnknownState(state) => {
                CommitError::validation_with(ErrorCode::InvalidState, json!({ "state": state }))
            }
            OrderError::NotLastOffer { offer_id } => CommitError::validation_with(
                ErrorCode::NotLastOffer,
                json!({ "offer_id": offer_id }),
            ),
            OrderError::NotAwaitingResponse { offer_id, .. } => CommitError::validation_with(
                ErrorCode::CannotAcceptOffer,
                json!({ "offer_id": offer_id }),
            ),
        }
    }
}

/// Convenience type alias for commit results.
pub type Result<T> = std::result::Result<T, CommitError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderAction, OrderState};

    #[test]
    fn test_code_serializes_snake_case() {
        let json = serde_json::to_value(ErrorCode::CreditCardMissingExternalId).unwrap();
        assert_eq!(json, "credit_card_missing_external_id");
        assert_eq!(
            ErrorCode::ChargeAuthorizationFailed.to_string(),
            "charge_authorization_failed"
        );
    }

    #[test]
    fn test_invalid_transition_is_validation_error() {
        let err = CommitError::from(OrderError::InvalidStateTransition {
            current_state: OrderState::Approved,
            action: OrderAction::Submit,
        });

        assert_eq!(err.code(), Some(ErrorCode::InvalidState));
        assert_eq!(err.error_type(), "validation");
        assert_eq!(err.failure().unwrap().data.as_ref().unwrap()["state"], "approved");
    }

    #[test]
    fn test_gateway_error_has_no_code() {
        let err = CommitError::gateway("inventory", "connection reset");
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "inventory error: connection reset");
    }

    #[test]
    fn test_failure_display_includes_data() {
        let err = CommitError::validation_with(
            ErrorCode::MissingCommissionRate,
            json!({ "partner_id": "partner-1" }),
        );
        assert!(err.to_string().contains("missing_commission_rate"));
        assert!(err.to_string().contains("partner-1"));
    }
}
