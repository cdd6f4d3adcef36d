//! Order state machine.

use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{Order, OrderError};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──submit──► Submitted ──approve──► Approved ──fulfill──► Fulfilled
///    │                   │                      │                      │
///    └─abandon─► Canceled ◄─reject/seller_lapse─┘                      │
///                                           Approved/Fulfilled ──refund──► Refunded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Order is being set up by the buyer.
    #[default]
    Pending,

    /// Buyer submitted the order; awaiting the seller.
    Submitted,

    /// Seller approved the order; payment captured.
    Approved,

    /// Order was canceled (terminal state).
    Canceled,

    /// Order was shipped or picked up (terminal state).
    Fulfilled,

    /// Charge was refunded (terminal state).
    Refunded,
}

impl OrderState {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Canceled | OrderState::Fulfilled | OrderState::Refunded
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Submitted => "submitted",
            OrderState::Approved => "approved",
            OrderState::Canceled => "canceled",
            OrderState::Fulfilled => "fulfilled",
            OrderState::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderState::Pending),
            "submitted" => Ok(OrderState::Submitted),
            "approved" => Ok(OrderState::Approved),
            "canceled" => Ok(OrderState::Canceled),
            "fulfilled" => Ok(OrderState::Fulfilled),
            "refunded" => Ok(OrderState::Refunded),
            other => Err(OrderError::UnknownState(other.to_string())),
        }
    }
}

/// Every transition the state machine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Submit,
    Approve,
    Reject,
    Abandon,
    SellerLapse,
    Fulfill,
    Refund,
}

impl OrderAction {
    /// Returns the action name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Submit => "submit",
            OrderAction::Approve => "approve",
            OrderAction::Reject => "reject",
            OrderAction::Abandon => "abandon",
            OrderAction::SellerLapse => "seller_lapse",
            OrderAction::Fulfill => "fulfill",
            OrderAction::Refund => "refund",
        }
    }

    /// Verb recorded on the domain event once the action has happened.
    pub fn event_verb(&self) -> &'static str {
        match self {
            OrderAction::Submit => "submitted",
            OrderAction::Approve => "approved",
            OrderAction::Reject => "rejected",
            OrderAction::Abandon => "abandoned",
            OrderAction::SellerLapse => "seller_lapsed",
            OrderAction::Fulfill => "fulfilled",
            OrderAction::Refund => "refunded",
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The subset of actions that go through the commit pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitAction {
    Submit,
    Approve,
}

impl CommitAction {
    pub const ALL: [CommitAction; 2] = [CommitAction::Submit, CommitAction::Approve];

    pub fn as_str(&self) -> &'static str {
        OrderAction::from(*self).as_str()
    }
}

impl From<CommitAction> for OrderAction {
    fn from(action: CommitAction) -> Self {
        match action {
            CommitAction::Submit => OrderAction::Submit,
            CommitAction::Approve => OrderAction::Approve,
        }
    }
}

impl TryFrom<OrderAction> for CommitAction {
    type Error = OrderError;

    fn try_from(action: OrderAction) -> Result<Self, Self::Error> {
        match action {
            OrderAction::Submit => Ok(CommitAction::Submit),
            OrderAction::Approve => Ok(CommitAction::Approve),
            other => Err(OrderError::UncommittableAction(other.as_str().to_string())),
        }
    }
}

impl FromStr for CommitAction {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| OrderError::UncommittableAction(s.to_string()))
    }
}

impl std::fmt::Display for CommitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pure transition rules over [`OrderState`].
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Returns the state reached by applying `action` in `state`, if allowed.
    pub fn target(state: OrderState, action: OrderAction) -> Option<OrderState> {
        use OrderAction as A;
        use OrderState as S;

        match (state, action) {
            (S::Pending, A::Submit) => Some(S::Submitted),
            (S::Pending, A::Abandon) => Some(S::Canceled),
            (S::Submitted, A::Approve) => Some(S::Approved),
            (S::Submitted, A::Reject | A::SellerLapse) => Some(S::Canceled),
            (S::Approved, A::Fulfill) => Some(S::Fulfilled),
            (S::Approved | S::Fulfilled, A::Refund) => Some(S::Refunded),
            _ => None,
        }
    }

    /// Returns true if `action` is allowed from `state`.
    pub fn can_transition(state: OrderState, action: OrderAction) -> bool {
        Self::target(state, action).is_some()
    }

    /// Computes the new state for `order` without mutating it.
    pub fn apply(order: &Order, action: OrderAction) -> Result<OrderState, OrderError> {
        Self::target(order.state(), action).ok_or(OrderError::InvalidStateTransition {
            current_state: order.state(),
            action,
        })
    }
}

/// How long an order may sit in each non-terminal state before the
/// scheduler asks for it to be expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateExpirations {
    pub pending: Duration,
    pub submitted: Duration,
    pub approved: Duration,
}

impl StateExpirations {
    /// Returns the expiry window for `state`, or None for terminal states.
    pub fn window(&self, state: OrderState) -> Option<Duration> {
        match state {
            OrderState::Pending => Some(self.pending),
            OrderState::Submitted => Some(self.submitted),
            OrderState::Approved => Some(self.approved),
            OrderState::Canceled | OrderState::Fulfilled | OrderState::Refunded => None,
        }
    }
}

impl Default for StateExpirations {
    fn default() -> Self {
        Self {
            pending: Duration::days(2),
            submitted: Duration::days(2),
            approved: Duration::days(7),
        }
    }
}
