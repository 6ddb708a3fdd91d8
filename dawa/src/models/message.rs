//! Conversation and message models.
//!
//! `Raw*` types mirror the backend JSON. [`MessageGroup`] and [`Message`] are
//! the normalized shapes the chat session works with.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GroupId, ItemId, MessageId, Participant, UserId};

/// The listing a conversation is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Item ID.
    pub item_id: ItemId,
    /// Item name.
    #[serde(default)]
    pub item_name: String,
}

impl Subject {
    /// Create a subject.
    pub fn new(item_id: impl Into<ItemId>, item_name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            item_name: item_name.into(),
        }
    }
}

/// Lifecycle of a locally sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Request in flight.
    Sending,
    /// Backend accepted the message.
    Sent,
    /// Request failed.
    Error,
}

impl MessageStatus {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Error => "error",
        }
    }
}

/// A message group as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessageGroup {
    /// Server-assigned group id.
    pub id: GroupId,
    /// Item under discussion.
    #[serde(default)]
    pub subject: Subject,
    /// Both sides of the conversation.
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Messages, possibly absent.
    #[serde(default)]
    pub messages: Option<Vec<RawMessage>>,
}

/// A message as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    /// Server-assigned message id.
    #[serde(default)]
    pub id: MessageId,
    /// Sender user ID.
    #[serde(rename = "senderId", alias = "sender_id")]
    pub sender_id: UserId,
    /// Receiver user ID.
    #[serde(rename = "receiverId", alias = "receiver_id")]
    pub receiver_id: UserId,
    /// Body text.
    #[serde(default)]
    pub message: String,
    /// Creation time as sent by the backend.
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    /// Whether the receiver has read it.
    #[serde(default)]
    pub read: Option<bool>,
}

/// A message inside a normalized conversation.
///
/// `status` is `None` for messages confirmed by the backend and `Some` for
/// optimistic ones, whose `id` is then the local id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID.
    pub id: MessageId,
    /// Item the conversation is about.
    pub item_id: ItemId,
    /// Sender user ID.
    pub sender_id: UserId,
    /// Receiver user ID.
    pub receiver_id: UserId,
    /// Body text.
    pub message: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the receiver has read it.
    pub read: bool,
    /// Local delivery status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl Message {
    /// Build a locally created message in the `Sending` state.
    pub fn optimistic(
        local_id: impl Into<MessageId>,
        item_id: impl Into<ItemId>,
        sender_id: impl Into<UserId>,
        receiver_id: impl Into<UserId>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: local_id.into(),
            item_id: item_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            message: message.into(),
            created_at,
            read: false,
            status: Some(MessageStatus::Sending),
        }
    }

    /// Whether this is a local echo rather than a server message.
    pub fn is_optimistic(&self) -> bool {
        self.status.is_some()
    }

    /// Body text with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> &str {
        self.message.trim()
    }

    /// Whether this message is waiting to be read by `user`.
    pub fn is_unread_by(&self, user: &UserId) -> bool {
        !self.read && &self.receiver_id == user
    }
}

/// A normalized conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    /// Server-assigned group id.
    pub id: GroupId,
    /// Item under discussion.
    pub subject: Subject,
    /// Both sides of the conversation.
    pub participants: Vec<Participant>,
    /// Messages, oldest first once reconciled.
    pub messages: Vec<Message>,
}

impl MessageGroup {
    /// The participant that is not `me`.
    pub fn other_participant(&self, me: &UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id != me)
    }

    /// Most recent message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Time of the most recent message, or the Unix epoch for an empty group.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message()
            .map(|m| m.created_at)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Number of messages addressed to `user` that are still unread.
    pub fn unread_for(&self, user: &UserId) -> usize {
        self.messages.iter().filter(|m| m.is_unread_by(user)).count()
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and naive `YYYY-MM-DD HH:MM:SS[.f]` (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
