//! Failed-charge notifications.

use std::sync::{Arc, Mutex};

use common::TransactionId;
use tokio::sync::mpsc;

use super::lock;
use crate::error::{CommitError, Result};

/// Request to tell a user that a charge against their card failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChargeNotice {
    pub transaction_id: TransactionId,
    pub user_id: String,
}

/// Enqueues notifications for later delivery.
///
/// Enqueueing is synchronous and never waits on delivery.
pub trait Notifier: Send + Sync {
    fn notify_failed_charge(&self, transaction_id: TransactionId, user_id: &str) -> Result<()>;
}

/// Hands notices to a background worker over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<FailedChargeNotice>,
}

impl ChannelNotifier {
    /// Creates the notifier together with the receiving end for the worker.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FailedChargeNotice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify_failed_charge(&self, transaction_id: TransactionId, user_id: &str) -> Result<()> {
        self.sender
            .send(FailedChargeNotice {
                transaction_id,
                user_id: user_id.to_string(),
            })
            .map_err(|_| CommitError::gateway("notifier", "notification worker stopped"))
    }
}

#[derive(Debug, Default)]
struct NotifierState {
    notices: Vec<FailedChargeNotice>,
    fail: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    pub fn notices(&self) -> Vec<FailedChargeNotice> {
        lock(&self.state).notices.clone()
    }
}

impl Notifier for InMemoryNotifier {
    fn notify_failed_charge(&self, transaction_id: TransactionId, user_id: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(CommitError::gateway("notifier", "queue unavailable"));
        }
        state.notices.push(FailedChargeNotice {
            transaction_id,
            user_id: user_id.to_string(),
        });
        Ok(())
    }
}
