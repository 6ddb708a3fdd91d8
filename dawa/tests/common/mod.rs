#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dawa::chat::{MessageStore, SendMessageRequest};
use dawa::models::{GroupId, Participant, RawMessage, RawMessageGroup, Subject};
use dawa::{Error, Result};
use tokio::sync::Notify;

pub const ME: i64 = 1;

/// In-memory backend that records requests and can be paused mid-call.
#[derive(Default)]
pub struct ScriptedStore {
    groups: Mutex<Vec<RawMessageGroup>>,
    sent: Mutex<Vec<SendMessageRequest>>,
    next_id: AtomicUsize,
    pub fetches: AtomicUsize,
    pub fail_sends: AtomicBool,
    pub echo_sends: AtomicBool,
    pub hold_sends: AtomicBool,
    pub hold_fetches: AtomicBool,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing: Mutex<HashSet<String>>,
    pub entered: Notify,
    pub release: Notify,
}

impl ScriptedStore {
    pub fn new(groups: Vec<RawMessageGroup>) -> Self {
        let store = Self {
            groups: Mutex::new(groups),
            next_id: AtomicUsize::new(1000),
            ..Default::default()
        };
        store.echo_sends.store(true, Ordering::SeqCst);
        store
    }

    pub fn sent(&self) -> Vec<SendMessageRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Hold sends of exactly `text` until the returned gate is notified.
    pub fn gate(&self, text: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(text.to_owned(), gate.clone());
        gate
    }

    /// Reject sends of exactly `text`.
    pub fn fail_text(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_owned());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn pause_if(&self, flag: &AtomicBool) {
        if flag.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl MessageStore for ScriptedStore {
    async fn message_groups(&self) -> Result<Vec<RawMessageGroup>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pause_if(&self.hold_fetches).await;
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn revalidate(&self) -> Result<Vec<RawMessageGroup>> {
        self.message_groups().await
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<()> {
        self.sent.lock().unwrap().push(request.clone());
        self.pause_if(&self.hold_sends).await;

        let gate = self.gates.lock().unwrap().get(&request.message).cloned();
        if let Some(gate) = gate {
            self.entered.notify_one();
            gate.notified().await;
        }

        let rejected = self.failing.lock().unwrap().contains(&request.message);
        if rejected || self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::api("500", "Internal Server Error"));
        }

        if self.echo_sends.load(Ordering::SeqCst) {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut groups = self.groups.lock().unwrap();
            if let Some(group) = groups
                .iter_mut()
                .find(|g| g.subject.item_id == request.item_id)
            {
                group.messages.get_or_insert_with(Vec::new).push(RawMessage {
                    id: (id as i64).into(),
                    sender_id: ME.into(),
                    receiver_id: request.receiver_id.clone(),
                    // Backend stores the trimmed body.
                    message: request.message.trim().to_owned(),
                    created_at: Some(Utc::now().to_rfc3339()),
                    read: Some(false),
                });
            }
        }

        Ok(())
    }

    async fn mark_read(&self, group_id: &GroupId) -> Result<()> {
        let mut groups = self.groups.lock().unwrap();
        for group in groups.iter_mut().filter(|g| &g.id == group_id) {
            for message in group.messages.iter_mut().flatten() {
                message.read = Some(true);
            }
        }
        Ok(())
    }
}

pub fn at(day: u32, hour: u32) -> String {
    Utc.with_ymd_and_hms(2024, 2, day, hour, 0, 0)
        .unwrap()
        .to_rfc3339()
}

pub fn raw_message(
    id: i64,
    sender: i64,
    receiver: i64,
    text: &str,
    created: String,
    read: bool,
) -> RawMessage {
    RawMessage {
        id: id.into(),
        sender_id: sender.into(),
        receiver_id: receiver.into(),
        message: text.to_owned(),
        created_at: Some(created),
        read: Some(read),
    }
}

pub fn raw_group(id: i64, item: i64, other: i64, messages: Vec<RawMessage>) -> RawMessageGroup {
    RawMessageGroup {
        id: id.into(),
        subject: Subject::new(item, format!("Item {}", item)),
        participants: vec![Participant::new(ME, "Me"), Participant::new(other, "Seller")],
        messages: Some(messages),
    }
}

/// Two conversations: item 3 with user 42 (older) and item 9 with user 7 (newer).
pub fn marketplace() -> Vec<RawMessageGroup> {
    vec![
        raw_group(
            10,
            3,
            42,
            vec![
                raw_message(1, ME, 42, "Is the bike available?", at(1, 9), true),
                raw_message(2, 42, ME, "Yes it is", at(1, 10), false),
            ],
        ),
        raw_group(
            11,
            9,
            7,
            vec![raw_message(3, 7, ME, "Would you take 5000?", at(2, 8), false)],
        ),
    ]
}
