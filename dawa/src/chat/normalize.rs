//! Conversion from backend message groups to the normalized shape.

use chrono::{DateTime, Utc};

use crate::models::{parse_timestamp, Message, MessageGroup, RawMessage, RawMessageGroup, Subject};

/// Normalize a batch of backend groups.
///
/// Builds fresh values every call and never fails: a missing `messages`
/// array is an empty conversation and an unreadable timestamp becomes the
/// Unix epoch.
pub fn normalize_groups(raw: &[RawMessageGroup]) -> Vec<MessageGroup> {
    raw.iter().map(normalize_group).collect()
}

/// Normalize one backend group.
pub fn normalize_group(raw: &RawMessageGroup) -> MessageGroup {
    let messages = raw
        .messages
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|m| normalize_message(m, &raw.subject))
        .collect();

    MessageGroup {
        id: raw.id.clone(),
        subject: raw.subject.clone(),
        participants: raw.participants.clone(),
        messages,
    }
}

fn normalize_message(raw: &RawMessage, subject: &Subject) -> Message {
    let created_at = raw
        .created_at
        .as_deref()
        .and_then(|ts| {
            let parsed = parse_timestamp(ts);
            if parsed.is_none() {
                log::debug!("unreadable timestamp '{}' on message {}", ts, raw.id);
            }
            parsed
        })
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Message {
        id: raw.id.clone(),
        item_id: subject.item_id.clone(),
        sender_id: raw.sender_id.clone(),
        receiver_id: raw.receiver_id.clone(),
        message: raw.message.clone(),
        created_at,
        read: raw.read.unwrap_or(false),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupId, ItemId, UserId};
    use chrono::TimeZone;

    fn raw_group() -> RawMessageGroup {
        serde_json::from_str(
            r#"{
                "id": 4,
                "subject": {"item_id": 31, "item_name": "Laptop"},
                "participants": [{"id": 1, "full_name": "A"}, {"id": 2, "full_name": "B"}],
                "messages": [
                    {"id": 1, "senderId": 2, "receiverId": 1, "message": "Hello",
                     "created_at": "2024-05-02 08:30:00", "read": true},
                    {"id": 2, "senderId": 1, "receiverId": 2, "message": "Hi",
                     "created_at": "not a date"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_copies_item_id_and_coerces_ids() {
        let groups = normalize_groups(&[raw_group()]);
        let group = &groups[0];

        assert_eq!(group.id, GroupId::new("4"));
        assert!(group.messages.iter().all(|m| m.item_id == ItemId::new("31")));
        assert_eq!(group.messages[0].sender_id, UserId::new("2"));
        assert!(group.messages.iter().all(|m| !m.is_optimistic()));
    }

    #[test]
    fn test_timestamps() {
        let group = normalize_group(&raw_group());
        assert_eq!(
            group.messages[0].created_at,
            Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap()
        );
        assert_eq!(group.messages[1].created_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!group.messages[1].read);
    }

    #[test]
    fn test_missing_messages_is_empty() {
        let mut raw = raw_group();
        raw.messages = None;

        let group = normalize_group(&raw);
        assert!(group.messages.is_empty());
    }

    #[test]
    fn test_input_untouched() {
        let raw = vec![raw_group()];
        let first = normalize_groups(&raw);
        let second = normalize_groups(&raw);
        assert_eq!(first, second);
        assert_eq!(raw[0].messages.as_ref().map(Vec::len), Some(2));
    }
}
