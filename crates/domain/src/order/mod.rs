//! Order aggregate and related types.

mod aggregate;
mod events;
mod line_item;
mod offer;
mod state;
mod totals;
mod transaction;
mod value_objects;

pub use aggregate::{AUCTION_SELLER_TYPE, Order};
pub use events::{LineItemDetail, ORDER_EVENT_TOPIC, OrderEvent, OrderProperties};
pub use line_item::LineItem;
pub use offer::{Offer, OfferState};
pub use state::{CommitAction, OrderAction, OrderState, OrderStateMachine, StateExpirations};
pub use totals::{FeeSchedule, recompute_totals};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use value_objects::{FulfillmentType, OrderMode, Participant, ShippingAddress, StateReason};

use common::OfferId;
use thiserror::Error;

/// Errors raised by pure order rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The state machine does not allow the action from the current state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderState,
        action: OrderAction,
    },

    /// The action is not one the commit pipeline handles.
    #[error("Action '{0}' cannot be committed")]
    UncommittableAction(String),

    #[error("Unknown order state: {0}")]
    UnknownState(String),

    /// The offer is not the order's most recent one.
    #[error("Offer {offer_id} is not the last offer on the order")]
    NotLastOffer { offer_id: OfferId },

    /// A participant tried to respond to their own offer.
    #[error("Offer {offer_id} is not awaiting a response from the {responder}")]
    NotAwaitingResponse {
        offer_id: OfferId,
        responder: Participant,
    },
}
