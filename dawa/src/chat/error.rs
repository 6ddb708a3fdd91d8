//! Reasons a chat send can fail.

use thiserror::Error;

use crate::error::Error;
use crate::models::UserId;

/// Why [`ChatSession::send_message`](super::ChatSession::send_message) did not deliver.
///
/// Everything except [`SendError::Delivery`] is a guard failure: nothing was
/// buffered and no request was made.
#[derive(Debug, Error)]
pub enum SendError {
    /// No user is signed in.
    #[error("Cannot send messages without a signed-in user")]
    Unauthenticated,

    /// The message body is blank.
    #[error("Message content cannot be empty")]
    EmptyMessage,

    /// Receiver had to come from the selected conversation, but none is selected.
    #[error("No receiver given and no conversation selected")]
    NoConversationSelected,

    /// The selected conversation has no other participant.
    #[error("Could not resolve a receiver from the selected conversation")]
    ReceiverUnresolved,

    /// Sender and receiver are the same user.
    #[error("Cannot send a message to yourself (user {0})")]
    SelfMessage(UserId),

    /// The backend request failed; the optimistic entry is now `error`.
    #[error("Failed to deliver message: {0}")]
    Delivery(#[source] Error),
}

impl SendError {
    /// Whether the send was rejected before anything was buffered.
    pub fn is_guard_failure(&self) -> bool {
        !matches!(self, SendError::Delivery(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_classification() {
        assert!(SendError::Unauthenticated.is_guard_failure());
        assert!(SendError::SelfMessage(UserId::new("1")).is_guard_failure());
        assert!(!SendError::Delivery(Error::api("500", "boom")).is_guard_failure());
    }

    #[test]
    fn test_display() {
        let e = SendError::SelfMessage(UserId::new("9"));
        assert_eq!(e.to_string(), "Cannot send a message to yourself (user 9)");
    }
}
