//! Chat handlers.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use dawa::{ChatSession, GroupId, ItemId, Message, MessageGroup, SendMessage, UserId};
use rust_i18n::t;
use serde::Serialize;

use crate::output::{format_relative_time, PlainPrint, TableRow};

/// Conversation summary.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationInfo {
    pub id: String,
    pub item_id: String,
    pub item_name: String,
    pub with: String,
    pub with_id: String,
    pub last_message: String,
    pub last_time: DateTime<Utc>,
    pub unread: usize,
}

impl ConversationInfo {
    fn from_group(group: &MessageGroup, me: &UserId) -> Self {
        let other = group.other_participant(me);
        Self {
            id: group.id.to_string(),
            item_id: group.subject.item_id.to_string(),
            item_name: group.subject.item_name.clone(),
            with: other.map(|p| p.full_name.clone()).unwrap_or_default(),
            with_id: other.map(|p| p.id.to_string()).unwrap_or_default(),
            last_message: group
                .last_message()
                .map(|m| m.trimmed_text().to_string())
                .unwrap_or_default(),
            last_time: group.last_activity(),
            unread: group.unread_for(me),
        }
    }
}

impl TableRow for ConversationInfo {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Item", "With", "Last Message", "Last", "Unread"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.item_name.clone(),
            self.with.clone(),
            self.last_message.clone(),
            format_relative_time(self.last_time),
            if self.unread > 0 {
                self.unread.to_string()
            } else {
                String::new()
            },
        ]
    }
}

impl PlainPrint for ConversationInfo {
    fn plain_print(&self) {
        let unread_marker = if self.unread > 0 {
            format!("● {} ", self.unread).red().to_string()
        } else {
            String::new()
        };
        println!(
            "{}[{}] {} {} {}",
            unread_marker,
            self.id.cyan(),
            self.item_name.bold(),
            self.with.green(),
            format_relative_time(self.last_time).dimmed()
        );
        if !self.last_message.is_empty() {
            println!("   {}", self.last_message);
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct MessageInfo {
    pub id: String,
    pub from: String,
    pub from_id: String,
    pub is_mine: bool,
    pub content: String,
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl MessageInfo {
    fn from_message(message: &Message, group: &MessageGroup, me: &UserId) -> Self {
        let from = group
            .participants
            .iter()
            .find(|p| p.id == message.sender_id)
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| message.sender_id.to_string());

        Self {
            id: message.id.to_string(),
            from,
            from_id: message.sender_id.to_string(),
            is_mine: &message.sender_id == me,
            content: message.message.clone(),
            time: message.created_at,
            status: message.status.map(|s| s.as_str().to_string()),
        }
    }
}

impl TableRow for MessageInfo {
    fn headers() -> Vec<&'static str> {
        vec!["From", "Content", "Time", "Status"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.from.clone(),
            self.content.clone(),
            format_relative_time(self.time),
            self.status.clone().unwrap_or_default(),
        ]
    }
}

impl PlainPrint for MessageInfo {
    fn plain_print(&self) {
        let from_display = if self.is_mine {
            t!("you_label").to_string().green().to_string()
        } else {
            self.from.clone()
        };
        let status = match self.status.as_deref() {
            Some("error") => format!(" ({})", t!("status_error")).red().to_string(),
            Some("sending") => format!(" ({})", t!("status_sending")).dimmed().to_string(),
            _ => String::new(),
        };
        println!(
            "{} {}{}",
            from_display,
            format_relative_time(self.time).dimmed(),
            status
        );
        for line in self.content.lines() {
            if !line.trim().is_empty() {
                println!("   {}", line);
            }
        }
        println!();
    }
}

/// Conversation result.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationResult {
    pub id: String,
    pub item_id: String,
    pub item_name: String,
    pub with: String,
    pub messages: Vec<MessageInfo>,
}

/// Send message result.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResult {
    pub local_id: String,
    pub item_id: String,
    pub to: String,
    pub status: String,
}

/// Unread count result.
#[derive(Debug, Clone, Serialize)]
pub struct UnreadResult {
    pub unread: usize,
}

/// What to send and where.
#[derive(Debug, Clone, Default)]
pub struct SendParams {
    pub item: Option<String>,
    pub to: Option<String>,
    pub group: Option<String>,
    pub content: String,
}

fn current_user_id(session: &ChatSession) -> Result<UserId> {
    session
        .current_user()
        .map(|u| u.id.clone())
        .context(t!("not_logged_in").to_string())
}

/// List conversations, most recently active first.
pub fn list_conversations(session: &ChatSession) -> Result<Vec<ConversationInfo>> {
    let me = current_user_id(session)?;
    Ok(session
        .message_groups()
        .iter()
        .map(|g| ConversationInfo::from_group(g, &me))
        .collect())
}

/// Select a conversation and return its messages.
pub fn read_conversation(session: &ChatSession, group_id: &str) -> Result<ConversationResult> {
    let me = current_user_id(session)?;
    session.select_group(group_id);

    let group = session
        .selected_group()
        .with_context(|| t!("conversation_not_found", id = group_id).to_string())?;

    Ok(ConversationResult {
        id: group.id.to_string(),
        item_id: group.subject.item_id.to_string(),
        item_name: group.subject.item_name.clone(),
        with: group
            .other_participant(&me)
            .map(|p| p.full_name.clone())
            .unwrap_or_default(),
        messages: group
            .messages
            .iter()
            .map(|m| MessageInfo::from_message(m, &group, &me))
            .collect(),
    })
}

/// Send a message. The item defaults to the selected conversation's item.
pub async fn send_message(session: &ChatSession, params: SendParams) -> Result<SendMessageResult> {
    if let Some(group) = &params.group {
        session.select_group(group.as_str());
    }

    let item_id = match params.item {
        Some(item) => ItemId::new(item),
        None => session
            .selected_group()
            .map(|g| g.subject.item_id)
            .context(t!("item_required").to_string())?,
    };

    let mut payload = SendMessage::new(item_id.clone(), params.content);
    if let Some(to) = params.to {
        payload = payload.to(to);
    }

    let local_id = session.send_message(payload).await?;

    let local = session
        .authenticated()
        .and_then(|chat| chat.optimistic_messages().into_iter().find(|m| m.id == local_id));

    Ok(SendMessageResult {
        local_id: local_id.to_string(),
        item_id: item_id.to_string(),
        to: local
            .as_ref()
            .map(|m| m.receiver_id.to_string())
            .unwrap_or_default(),
        status: local
            .and_then(|m| m.status)
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
    })
}

/// Unread messages addressed to the user.
pub fn unread_count(session: &ChatSession) -> UnreadResult {
    UnreadResult {
        unread: session.new_messages_count(),
    }
}

/// Mark a conversation as read.
pub async fn mark_read(session: &ChatSession, group_id: &str) -> Result<()> {
    session.mark_group_read(GroupId::new(group_id)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dawa::{MessageStatus, Participant, Subject};

    fn group() -> MessageGroup {
        let t = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap();
        let mut theirs = Message::optimistic("1", 3, 42, 1, "Still available?", t(9));
        theirs.status = None;
        let mut mine = Message::optimistic("l-1", 3, 1, 42, " Yes ", t(10));
        mine.status = Some(MessageStatus::Error);

        MessageGroup {
            id: GroupId::new("10"),
            subject: Subject::new(3, "Desk"),
            participants: vec![Participant::new(1, "Me"), Participant::new(42, "Amina")],
            messages: vec![theirs, mine],
        }
    }

    #[tokio::test]
    async fn test_failed_send_stays_in_conversation() {
        let session = crate::handlers::fake::failing_session().await;

        let params = SendParams {
            group: Some("10".to_string()),
            content: "Is 3000 okay?".to_string(),
            ..Default::default()
        };
        assert!(send_message(&session, params).await.is_err());

        let conversation = read_conversation(&session, "10").unwrap();
        assert_eq!(conversation.messages.len(), 2);
        let last = &conversation.messages[1];
        assert!(last.is_mine);
        assert_eq!(last.content, "Is 3000 okay?");
        assert_eq!(last.status.as_deref(), Some("error"));

        let listed = list_conversations(&session).unwrap();
        assert_eq!(listed[0].last_message, "Is 3000 okay?");
    }

    #[test]
    fn test_conversation_info() {
        let info = ConversationInfo::from_group(&group(), &UserId::new("1"));
        assert_eq!(info.with, "Amina");
        assert_eq!(info.with_id, "42");
        assert_eq!(info.last_message, "Yes");
        assert_eq!(info.unread, 1);
    }

    #[test]
    fn test_message_info() {
        let g = group();
        let me = UserId::new("1");
        let theirs = MessageInfo::from_message(&g.messages[0], &g, &me);
        assert_eq!(theirs.from, "Amina");
        assert!(!theirs.is_mine);
        assert_eq!(theirs.status, None);

        let mine = MessageInfo::from_message(&g.messages[1], &g, &me);
        assert!(mine.is_mine);
        assert_eq!(mine.status.as_deref(), Some("error"));
    }
}
