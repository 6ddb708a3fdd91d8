//! Message API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    chat::{MessageStore, SendMessageRequest},
    client::{unwrap_envelope, DawaClientInner},
    error::{Error, Result},
    models::{GroupId, ItemId, RawMessageGroup, UserId},
};

const GROUPS_API: &str = "api/messages/";
const SEND_API: &str = "api/messages/send/";

/// API for marketplace conversations.
pub struct MessageApi {
    client: Arc<DawaClientInner>,
}

impl MessageApi {
    pub(crate) fn new(client: Arc<DawaClientInner>) -> Self {
        Self { client }
    }

    fn cache_key(&self) -> Result<String> {
        let auth = self.client.require_auth()?;
        Ok(format!("messages/groups/{}", auth.uid))
    }

    /// Get the current user's message groups.
    ///
    /// Repeated calls within the client's dedupe interval are answered from
    /// the response cache, if one is configured.
    pub async fn groups(&self) -> Result<Vec<RawMessageGroup>> {
        let key = self.cache_key()?;

        if let Some(cache) = &self.client.cache {
            if let Some(bytes) = cache.get(&key).await {
                log::debug!("message groups served from cache");
                return parse_groups(&String::from_utf8_lossy(&bytes));
            }
        }

        let text = self.client.get_authed(GROUPS_API).await?;
        let groups = parse_groups(&text)?;

        if let Some(cache) = &self.client.cache {
            cache
                .set(&key, text.as_bytes(), Some(self.client.config.dedupe_interval))
                .await;
        }

        Ok(groups)
    }

    /// Drop the cached message groups so the next read hits the backend.
    pub async fn invalidate(&self) -> Result<()> {
        let key = self.cache_key()?;
        if let Some(cache) = &self.client.cache {
            cache.remove(&key).await;
        }
        Ok(())
    }

    /// Send a new message.
    pub fn send(&self) -> SendMessageBuilder {
        SendMessageBuilder {
            client: self.client.clone(),
            receiver_id: UserId::default(),
            item_id: ItemId::default(),
            content: String::new(),
        }
    }

    /// Mark a conversation as read.
    pub async fn mark_read(&self, group_id: &GroupId) -> Result<()> {
        let api = format!("api/messages/{}/read/", group_id);
        let text = self.client.post_authed(&api, &serde_json::json!({})).await?;
        check_success(&text)?;
        self.invalidate().await
    }
}

#[async_trait]
impl MessageStore for MessageApi {
    async fn message_groups(&self) -> Result<Vec<RawMessageGroup>> {
        self.groups().await
    }

    async fn revalidate(&self) -> Result<Vec<RawMessageGroup>> {
        self.invalidate().await?;
        self.groups().await
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<()> {
        self.send()
            .to(&request.receiver_id)
            .item(&request.item_id)
            .content(&request.message)
            .send()
            .await
    }

    async fn mark_read(&self, group_id: &GroupId) -> Result<()> {
        MessageApi::mark_read(self, group_id).await
    }
}

/// Builder for sending messages.
pub struct SendMessageBuilder {
    client: Arc<DawaClientInner>,
    receiver_id: UserId,
    item_id: ItemId,
    content: String,
}

#[derive(Serialize)]
struct SendBody<'a> {
    receiver_id: i64,
    item_id: i64,
    message: &'a str,
}

impl SendMessageBuilder {
    /// Set the recipient.
    pub fn to(mut self, receiver_id: impl Into<UserId>) -> Self {
        self.receiver_id = receiver_id.into();
        self
    }

    /// Set the item the message is about.
    pub fn item(mut self, item_id: impl Into<ItemId>) -> Self {
        self.item_id = item_id.into();
        self
    }

    /// Set the message content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Execute the request.
    pub async fn send(self) -> Result<()> {
        let body = self.body()?;

        let text = self.client.post_authed(SEND_API, &body).await?;
        check_success(&text)?;

        if let Some(cache) = &self.client.cache {
            if let Some(auth) = &self.client.auth {
                cache.remove(&format!("messages/groups/{}", auth.uid)).await;
            }
        }

        Ok(())
    }

    fn body(&self) -> Result<SendBody<'_>> {
        if self.content.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "Message content cannot be empty".into(),
            ));
        }

        let receiver_id = self.receiver_id.as_number().filter(|_| !self.receiver_id.is_empty());
        let receiver_id = receiver_id.ok_or_else(|| {
            Error::InvalidArgument(format!("Invalid receiver id '{}'", self.receiver_id))
        })?;

        let item_id = self.item_id.as_number().ok_or_else(|| {
            Error::InvalidArgument(format!("Invalid item id '{}'", self.item_id))
        })?;

        Ok(SendBody {
            receiver_id,
            item_id,
            message: &self.content,
        })
    }
}

fn parse_groups(text: &str) -> Result<Vec<RawMessageGroup>> {
    let value = unwrap_envelope(text)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(Error::Json)
}

/// Reject bodies that report `"success": false` despite a 2xx status.
fn check_success(text: &str) -> Result<()> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return Ok(());
    };

    if value.get("success").and_then(|v| v.as_bool()) == Some(false) {
        let message = value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(|v| v.as_str())
            .unwrap_or("Request was not accepted");
        return Err(Error::api("rejected", message));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpConfig;

    fn builder() -> SendMessageBuilder {
        SendMessageBuilder {
            client: Arc::new(DawaClientInner {
                http: reqwest::Client::new(),
                config: HttpConfig::default(),
                auth: None,
                cache: None,
            }),
            receiver_id: UserId::default(),
            item_id: ItemId::default(),
            content: String::new(),
        }
    }

    #[test]
    fn test_send_body_uses_numbers() {
        let b = builder().to("42").item(3).content("test");
        let json = serde_json::to_value(b.body().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"receiver_id": 42, "item_id": 3, "message": "test"})
        );
    }

    #[test]
    fn test_send_body_validation() {
        assert!(matches!(
            builder().to(42).item(3).content("  ").body(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            builder().item(3).content("hi").body(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            builder().to("abc").item(3).content("hi").body(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_groups() {
        let groups = parse_groups(
            r#"{"data": [{"id": 1, "subject": {"item_id": 2, "item_name": "TV"}, "participants": []}]}"#,
        )
        .unwrap();
        assert_eq!(groups.len(), 1);
        assert!(parse_groups("").unwrap().is_empty());
        assert!(parse_groups("[]").unwrap().is_empty());
    }

    #[test]
    fn test_check_success() {
        assert!(check_success(r#"{"success": true}"#).is_ok());
        assert!(check_success("").is_ok());
        let err = check_success(r#"{"success": false, "message": "blocked"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Dawa API error [rejected]: blocked");
    }

    #[tokio::test]
    async fn test_groups_served_from_cache_then_invalidated() {
        use crate::cache::{CacheStorage, MemoryCache};
        use crate::client::AuthInfo;

        let cache = Arc::new(MemoryCache::new());
        cache
            .set(
                "messages/groups/5",
                br#"[{"id": 4, "subject": {"item_id": 2, "item_name": "Lamp"}, "participants": []}]"#,
                None,
            )
            .await;
        let api = MessageApi::new(Arc::new(DawaClientInner {
            http: reqwest::Client::new(),
            config: HttpConfig::default(),
            auth: Some(AuthInfo::new("token", "5")),
            cache: Some(cache.clone()),
        }));

        let groups = api.groups().await.unwrap();
        assert_eq!(groups[0].subject.item_name, "Lamp");

        api.invalidate().await.unwrap();
        assert!(cache.get("messages/groups/5").await.is_none());
    }

    #[tokio::test]
    async fn test_groups_requires_auth() {
        let api = MessageApi::new(builder().client);
        assert!(matches!(api.groups().await, Err(Error::AuthRequired)));
    }
}
