//! In-memory backend for handler tests.

use std::sync::Arc;

use async_trait::async_trait;
use dawa::chat::{MessageStore, SendMessageRequest};
use dawa::models::{RawMessage, RawMessageGroup};
use dawa::{ChatConfig, ChatSession, Error, GroupId, Participant, Result, Subject, User};

/// One conversation about item 3 with user 42; every send is rejected.
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn message_groups(&self) -> Result<Vec<RawMessageGroup>> {
        Ok(vec![RawMessageGroup {
            id: GroupId::new("10"),
            subject: Subject::new(3, "Desk"),
            participants: vec![Participant::new(1, "Me"), Participant::new(42, "Amina")],
            messages: Some(vec![RawMessage {
                id: 1.into(),
                sender_id: 42.into(),
                receiver_id: 1.into(),
                message: "Still available".to_string(),
                created_at: Some("2024-05-01T09:00:00Z".to_string()),
                read: Some(false),
            }]),
        }])
    }

    async fn revalidate(&self) -> Result<Vec<RawMessageGroup>> {
        self.message_groups().await
    }

    async fn send_message(&self, _request: &SendMessageRequest) -> Result<()> {
        Err(Error::api("503", "Service Unavailable"))
    }

    async fn mark_read(&self, _group_id: &GroupId) -> Result<()> {
        Ok(())
    }
}

/// Signed-in session over [`FailingStore`], already refreshed.
pub async fn failing_session() -> ChatSession {
    let store: Arc<dyn MessageStore> = Arc::new(FailingStore);
    let session = ChatSession::new(Some(User::new(1, "Me")), store, ChatConfig::default());
    session.refresh().await.unwrap();
    session
}
