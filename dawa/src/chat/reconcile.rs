//! Merging confirmed conversations with optimistic messages.

use std::cmp::Reverse;

use crate::models::{Message, MessageGroup, MessageStatus};

use super::buffer::OptimisticBuffer;

/// Whether `confirmed` is the server copy of the `Sent` optimistic message `local`.
///
/// Same sender, same item and identical text after trimming surrounding
/// whitespace. Case and inner whitespace must match exactly.
pub fn is_duplicate_of(confirmed: &Message, local: &Message) -> bool {
    local.status == Some(MessageStatus::Sent)
        && confirmed.sender_id == local.sender_id
        && confirmed.item_id == local.item_id
        && confirmed.trimmed_text() == local.trimmed_text()
}

/// Build the merged conversation view.
///
/// Each group gets its optimistic messages appended (whatever their status),
/// minus confirmed messages shadowed by a `Sent` local copy, sorted oldest
/// first. Groups are then ordered by most recent activity. Both sorts are
/// stable, so ties keep fetch order and local messages stay after confirmed
/// ones sharing a timestamp.
pub fn reconcile(remote: &[MessageGroup], buffer: &OptimisticBuffer) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = remote.iter().map(|g| merge_group(g, buffer)).collect();
    groups.sort_by_key(|g| Reverse(g.last_activity()));
    groups
}

fn merge_group(group: &MessageGroup, buffer: &OptimisticBuffer) -> MessageGroup {
    let local: Vec<&Message> = buffer.for_item(&group.subject.item_id).collect();

    let mut messages: Vec<Message> = group
        .messages
        .iter()
        .filter(|confirmed| !local.iter().any(|l| is_duplicate_of(confirmed, l)))
        .cloned()
        .chain(local.iter().map(|l| (*l).clone()))
        .collect();
    messages.sort_by_key(|m| m.created_at);

    MessageGroup {
        id: group.id.clone(),
        subject: group.subject.clone(),
        participants: group.participants.clone(),
        messages,
    }
}
