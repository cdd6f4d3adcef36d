//! Domain layer for order commit coordination.
//!
//! This crate holds the pure parts of the system:
//! - the Order aggregate with its line items and transaction history
//! - the order state machine and the committable action subset
//! - totals recomputation from a commission rate
//! - offers and the domain event payload published after each action

pub mod order;

pub use order::{
    AUCTION_SELLER_TYPE, CommitAction, FeeSchedule, FulfillmentType, LineItem, LineItemDetail,
    ORDER_EVENT_TOPIC, Offer, OfferState, Order, OrderAction, OrderError, OrderEvent, OrderMode,
    OrderProperties, OrderState, OrderStateMachine, Participant, ShippingAddress,
    StateExpirations, StateReason, Transaction, TransactionStatus, TransactionType,
    recompute_totals,
};
