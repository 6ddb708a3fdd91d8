//! Locally created messages awaiting reconciliation with the backend.

use std::collections::HashMap;

use crate::models::{ItemId, Message, MessageGroup, MessageId, MessageStatus};

use super::reconcile::is_duplicate_of;

/// Ordered collection of optimistic messages.
///
/// Entries keep insertion order and are never dropped on their own; see
/// [`OptimisticBuffer::prune_reconciled`] and [`OptimisticBuffer::cap_failed`]
/// for the opt-in cleanup policies.
#[derive(Debug, Clone, Default)]
pub struct OptimisticBuffer {
    entries: Vec<Message>,
}

impl OptimisticBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new entry in the `Sending` state.
    pub fn append(&mut self, mut message: Message) {
        message.status = Some(MessageStatus::Sending);
        self.entries.push(message);
    }

    /// Move one entry from `sending` to `status`.
    ///
    /// The entry is replaced with an updated copy. `sent` and `error` are
    /// final: returns `false` and leaves the buffer alone when the entry has
    /// already settled or `local_id` is unknown.
    pub fn mark_status(&mut self, local_id: &MessageId, status: MessageStatus) -> bool {
        let Some(pos) = self.entries.iter().position(|m| &m.id == local_id) else {
            return false;
        };
        if self.entries[pos].status != Some(MessageStatus::Sending) {
            return false;
        }

        let updated = Message {
            status: Some(status),
            ..self.entries[pos].clone()
        };
        self.entries[pos] = updated;
        true
    }

    /// Look up an entry by local id.
    pub fn get(&self, local_id: &MessageId) -> Option<&Message> {
        self.entries.iter().find(|m| &m.id == local_id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    /// Entries for one item, in insertion order.
    pub fn for_item<'a>(&'a self, item_id: &'a ItemId) -> impl Iterator<Item = &'a Message> {
        self.entries.iter().filter(move |m| &m.item_id == item_id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop `Sent` entries whose confirmed copy is already in `remote`.
    ///
    /// Returns how many entries were removed.
    pub fn prune_reconciled(&mut self, remote: &[MessageGroup]) -> usize {
        let before = self.entries.len();

        self.entries.retain(|local| {
            if local.status != Some(MessageStatus::Sent) {
                return true;
            }
            !remote
                .iter()
                .filter(|g| g.subject.item_id == local.item_id)
                .flat_map(|g| g.messages.iter())
                .any(|confirmed| is_duplicate_of(confirmed, local))
        });

        before - self.entries.len()
    }

    /// Keep at most `max` `Error` entries per item, dropping the oldest.
    ///
    /// Returns how many entries were removed.
    pub fn cap_failed(&mut self, max: usize) -> usize {
        let mut failed_per_item: HashMap<ItemId, usize> = HashMap::new();
        for m in &self.entries {
            if m.status == Some(MessageStatus::Error) {
                *failed_per_item.entry(m.item_id.clone()).or_default() += 1;
            }
        }

        let before = self.entries.len();
        self.entries.retain(|m| {
            if m.status != Some(MessageStatus::Error) {
                return true;
            }
            match failed_per_item.get_mut(&m.item_id) {
                Some(count) if *count > max => {
                    *count -= 1;
                    false
                }
                _ => true,
            }
        });

        before - self.entries.len()
    }
}
