//! Seam between the chat session and the backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{GroupId, ItemId, RawMessageGroup, UserId};

/// Body of a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    /// Who receives the message.
    pub receiver_id: UserId,
    /// Item the conversation is about.
    pub item_id: ItemId,
    /// Body text.
    pub message: String,
}

/// Backend access used by [`ChatSession`](super::ChatSession).
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Message groups of the authenticated user. May be served from cache.
    async fn message_groups(&self) -> Result<Vec<RawMessageGroup>>;

    /// Drop any cached copy and fetch message groups again.
    async fn revalidate(&self) -> Result<Vec<RawMessageGroup>>;

    /// Send one message.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<()>;

    /// Mark every message of a group addressed to the current user as read.
    async fn mark_read(&self, group_id: &GroupId) -> Result<()>;
}
