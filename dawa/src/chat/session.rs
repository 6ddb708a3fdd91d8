//! Chat session facade.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::client::DawaClient;
use crate::error::Result;
use crate::models::{
    GroupId, ItemId, Message, MessageGroup, MessageId, MessageStatus, User, UserId,
};

use super::buffer::OptimisticBuffer;
use super::error::SendError;
use super::normalize::normalize_groups;
use super::reconcile::reconcile;
use super::store::{MessageStore, SendMessageRequest};

/// Cleanup policy for the optimistic buffer.
///
/// The default keeps every local message for the whole session.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Drop `sent` local messages once their server copy has been fetched.
    pub prune_reconciled: bool,
    /// Keep at most this many `error` local messages per item.
    pub max_failed_per_item: Option<usize>,
}

/// A message to send through [`ChatSession::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessage {
    /// Receiver. When absent or equal to the sender, the other participant
    /// of the selected conversation is used.
    pub receiver_id: Option<UserId>,
    /// Item the conversation is about.
    pub item_id: ItemId,
    /// Body text.
    pub message: String,
}

impl SendMessage {
    /// Message about `item_id` to the selected conversation's counterpart.
    pub fn new(item_id: impl Into<ItemId>, message: impl Into<String>) -> Self {
        Self {
            receiver_id: None,
            item_id: item_id.into(),
            message: message.into(),
        }
    }

    /// Set an explicit receiver.
    pub fn to(mut self, receiver_id: impl Into<UserId>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }
}

#[derive(Debug, Default)]
struct ChatState {
    remote: Vec<MessageGroup>,
    buffer: OptimisticBuffer,
    view: Vec<MessageGroup>,
    selected: Option<GroupId>,
    fetches_in_flight: usize,
}

impl ChatState {
    fn recompute(&mut self) {
        self.view = reconcile(&self.remote, &self.buffer);
    }

    fn apply_policy(&mut self, config: &ChatConfig) {
        if config.prune_reconciled {
            let pruned = self.buffer.prune_reconciled(&self.remote);
            if pruned > 0 {
                log::debug!("pruned {} reconciled local messages", pruned);
            }
        }
        if let Some(max) = config.max_failed_per_item {
            self.buffer.cap_failed(max);
        }
    }
}

struct Shared {
    user: User,
    store: Arc<dyn MessageStore>,
    config: ChatConfig,
    state: Mutex<ChatState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a fetch as in flight until dropped.
struct Loading<'a>(&'a Shared);

impl<'a> Loading<'a> {
    fn start(shared: &'a Shared) -> Self {
        shared.lock().fetches_in_flight += 1;
        Loading(shared)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.lock().fetches_in_flight -= 1;
    }
}

/// Chat for a signed-in user.
///
/// Cloning is cheap and clones share state, so a clone can be moved into a
/// spawned task.
#[derive(Clone)]
pub struct AuthenticatedChat {
    inner: Arc<Shared>,
}

impl AuthenticatedChat {
    fn new(user: User, store: Arc<dyn MessageStore>, config: ChatConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                user,
                store,
                config,
                state: Mutex::new(ChatState::default()),
            }),
        }
    }

    /// The signed-in user.
    pub fn user(&self) -> &User {
        &self.inner.user
    }

    /// Merged conversations, most recently active first.
    pub fn message_groups(&self) -> Vec<MessageGroup> {
        self.inner.lock().view.clone()
    }

    /// Id of the active conversation.
    pub fn selected_group_id(&self) -> Option<GroupId> {
        self.inner.lock().selected.clone()
    }

    /// The active conversation, if it is known.
    pub fn selected_group(&self) -> Option<MessageGroup> {
        let state = self.inner.lock();
        let selected = state.selected.as_ref()?;
        let group = state.view.iter().find(|g| &g.id == selected).cloned();
        group
    }

    /// Set the active conversation. The id is not checked.
    pub fn select_group(&self, group_id: impl Into<GroupId>) {
        self.inner.lock().selected = Some(group_id.into());
    }

    /// Whether a fetch is running.
    pub fn is_loading(&self) -> bool {
        self.inner.lock().fetches_in_flight > 0
    }

    /// Unread messages addressed to the user across all conversations.
    pub fn new_messages_count(&self) -> usize {
        let me = &self.inner.user.id;
        self.inner.lock().view.iter().map(|g| g.unread_for(me)).sum()
    }

    /// Local messages, in the order they were sent.
    pub fn optimistic_messages(&self) -> Vec<Message> {
        self.inner.lock().buffer.iter().cloned().collect()
    }

    /// Fetch conversations, served from the store's cache when fresh.
    pub async fn refresh(&self) -> Result<()> {
        self.fetch(false).await
    }

    /// Fetch conversations, bypassing any cache.
    pub async fn revalidate(&self) -> Result<()> {
        self.fetch(true).await
    }

    async fn fetch(&self, force: bool) -> Result<()> {
        let raw = {
            let _loading = Loading::start(&self.inner);
            if force {
                self.inner.store.revalidate().await
            } else {
                self.inner.store.message_groups().await
            }
        }?;

        let remote = normalize_groups(&raw);
        log::debug!("fetched {} message groups", remote.len());

        let mut state = self.inner.lock();
        state.remote = remote;
        state.apply_policy(&self.inner.config);
        state.recompute();
        Ok(())
    }

    /// Apply the configured cleanup policy to the local messages now.
    pub fn prune(&self) {
        let mut state = self.inner.lock();
        state.apply_policy(&self.inner.config);
        state.recompute();
    }

    /// Send a message with an optimistic local echo.
    ///
    /// On success the local copy becomes `sent`, a background refetch is
    /// started and the local id is returned. On a failed request it becomes
    /// `error` and stays visible.
    pub async fn send_message(
        &self,
        payload: SendMessage,
    ) -> std::result::Result<MessageId, SendError> {
        let me = self.inner.user.id.clone();

        if payload.message.trim().is_empty() {
            log::error!("rejected empty message for item {}", payload.item_id);
            return Err(SendError::EmptyMessage);
        }

        let receiver = match payload.receiver_id.filter(|r| r != &me && !r.is_empty()) {
            Some(receiver) => receiver,
            None => self.receiver_from_selection()?,
        };

        if receiver == me {
            log::error!("rejected message to self from user {}", me);
            return Err(SendError::SelfMessage(me));
        }

        let local_id = MessageId::new(Uuid::new_v4().to_string());
        let optimistic = Message::optimistic(
            local_id.clone(),
            payload.item_id.clone(),
            me,
            receiver.clone(),
            payload.message.clone(),
            Utc::now(),
        );
        {
            let mut state = self.inner.lock();
            state.buffer.append(optimistic);
            state.recompute();
        }

        let request = SendMessageRequest {
            receiver_id: receiver,
            item_id: payload.item_id,
            message: payload.message,
        };

        match self.inner.store.send_message(&request).await {
            Ok(()) => {
                self.set_status(&local_id, MessageStatus::Sent);
                self.spawn_revalidation();
                Ok(local_id)
            }
            Err(e) => {
                log::error!("failed to send message {}: {}", local_id, e);
                self.set_status(&local_id, MessageStatus::Error);
                Err(SendError::Delivery(e))
            }
        }
    }

    /// Mark a conversation as read, then refetch.
    pub async fn mark_group_read(&self, group_id: impl Into<GroupId>) -> Result<()> {
        let group_id = group_id.into();
        self.inner.store.mark_read(&group_id).await?;
        self.revalidate().await
    }

    fn receiver_from_selection(&self) -> std::result::Result<UserId, SendError> {
        let state = self.inner.lock();
        let selected = state.selected.as_ref().ok_or_else(|| {
            log::error!("no receiver given and no conversation selected");
            SendError::NoConversationSelected
        })?;

        let receiver = state
            .view
            .iter()
            .find(|g| &g.id == selected)
            .and_then(|g| g.other_participant(&self.inner.user.id))
            .map(|p| p.id.clone());

        receiver.ok_or_else(|| {
            log::error!("no counterpart found in conversation {}", selected);
            SendError::ReceiverUnresolved
        })
    }

    fn set_status(&self, local_id: &MessageId, status: MessageStatus) {
        let mut state = self.inner.lock();
        if state.buffer.mark_status(local_id, status) {
            state.recompute();
        }
    }

    fn spawn_revalidation(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::warn!("no async runtime available, skipping revalidation");
            return;
        };

        let this = self.clone();
        handle.spawn(async move {
            if let Err(e) = this.revalidate().await {
                log::warn!("revalidation after send failed: {}", e);
            }
        });
    }
}

impl std::fmt::Debug for AuthenticatedChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AuthenticatedChat")
            .field("user", &self.inner.user.id)
            .field("groups", &state.view.len())
            .field("pending", &state.buffer.len())
            .field("selected", &state.selected)
            .finish()
    }
}

/// Chat before a user is known, or with no user at all.
#[derive(Clone)]
pub struct UnauthenticatedChat {
    resolving: bool,
    store: Arc<dyn MessageStore>,
    config: ChatConfig,
}

impl std::fmt::Debug for UnauthenticatedChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthenticatedChat")
            .field("resolving", &self.resolving)
            .finish()
    }
}

/// Entry point for chat consumers.
///
/// Without a user every operation is a cheap no-op and nothing touches the
/// network. A session only ever moves from `Unauthenticated` to
/// `Authenticated`.
#[derive(Debug, Clone)]
pub enum ChatSession {
    /// No user yet, or definitively none.
    Unauthenticated(UnauthenticatedChat),
    /// A signed-in user with live conversations.
    Authenticated(AuthenticatedChat),
}

impl ChatSession {
    /// Start a session for `user`, or an unauthenticated one when `None`.
    pub fn new(user: Option<User>, store: Arc<dyn MessageStore>, config: ChatConfig) -> Self {
        match user {
            Some(user) => ChatSession::Authenticated(AuthenticatedChat::new(user, store, config)),
            None => ChatSession::Unauthenticated(UnauthenticatedChat {
                resolving: false,
                store,
                config,
            }),
        }
    }

    /// Start a session whose user is still being looked up.
    pub fn resolving(store: Arc<dyn MessageStore>, config: ChatConfig) -> Self {
        ChatSession::Unauthenticated(UnauthenticatedChat {
            resolving: true,
            store,
            config,
        })
    }

    /// Finish user lookup. `None` leaves the session unauthenticated and no
    /// longer loading.
    pub fn resolve(self, user: Option<User>) -> Self {
        match (self, user) {
            (ChatSession::Unauthenticated(chat), user) => {
                ChatSession::new(user, chat.store, chat.config)
            }
            (session, _) => session,
        }
    }

    /// Move to `Authenticated` for `user`. An authenticated session is returned unchanged.
    pub fn authenticate(self, user: User) -> Self {
        self.resolve(Some(user))
    }

    /// Build a session from a client: look up the token's user and fetch
    /// their conversations. A client without credentials, or whose token is
    /// rejected, yields an unauthenticated session without further requests.
    pub async fn connect(client: &DawaClient, config: ChatConfig) -> Result<Self> {
        let store: Arc<dyn MessageStore> = Arc::new(client.messages());

        if !client.is_authenticated() {
            return Ok(ChatSession::new(None, store, config));
        }

        let user = match client.users().me().await {
            Ok(user) => user,
            Err(e) if e.is_auth_error() => {
                log::warn!("token rejected, continuing signed out: {}", e);
                return Ok(ChatSession::new(None, store, config));
            }
            Err(e) => return Err(e),
        };

        let session = ChatSession::new(Some(user), store, config);
        session.refresh().await?;
        Ok(session)
    }

    /// The authenticated chat, if any.
    pub fn authenticated(&self) -> Option<&AuthenticatedChat> {
        match self {
            ChatSession::Authenticated(chat) => Some(chat),
            ChatSession::Unauthenticated(_) => None,
        }
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated().is_some()
    }

    /// The signed-in user.
    pub fn current_user(&self) -> Option<&User> {
        self.authenticated().map(AuthenticatedChat::user)
    }

    /// Merged conversations, most recently active first. Empty when signed out.
    pub fn message_groups(&self) -> Vec<MessageGroup> {
        self.authenticated()
            .map(AuthenticatedChat::message_groups)
            .unwrap_or_default()
    }

    /// Id of the active conversation.
    pub fn selected_group_id(&self) -> Option<GroupId> {
        self.authenticated().and_then(AuthenticatedChat::selected_group_id)
    }

    /// The active conversation, if it is known.
    pub fn selected_group(&self) -> Option<MessageGroup> {
        self.authenticated().and_then(AuthenticatedChat::selected_group)
    }

    /// Set the active conversation.
    pub fn select_group(&self, group_id: impl Into<GroupId>) {
        if let Some(chat) = self.authenticated() {
            chat.select_group(group_id);
        }
    }

    /// True while the user is being resolved or a fetch is running.
    pub fn is_loading(&self) -> bool {
        match self {
            ChatSession::Unauthenticated(chat) => chat.resolving,
            ChatSession::Authenticated(chat) => chat.is_loading(),
        }
    }

    /// Unread messages addressed to the user.
    pub fn new_messages_count(&self) -> usize {
        self.authenticated()
            .map(AuthenticatedChat::new_messages_count)
            .unwrap_or(0)
    }

    /// Fetch conversations. Does nothing when signed out.
    pub async fn refresh(&self) -> Result<()> {
        match self {
            ChatSession::Authenticated(chat) => chat.refresh().await,
            ChatSession::Unauthenticated(_) => Ok(()),
        }
    }

    /// Fetch conversations bypassing any cache. Does nothing when signed out.
    pub async fn revalidate(&self) -> Result<()> {
        match self {
            ChatSession::Authenticated(chat) => chat.revalidate().await,
            ChatSession::Unauthenticated(_) => Ok(()),
        }
    }

    /// Send a message, reporting why it was not delivered.
    pub async fn send_message(
        &self,
        payload: SendMessage,
    ) -> std::result::Result<MessageId, SendError> {
        match self {
            ChatSession::Authenticated(chat) => chat.send_message(payload).await,
            ChatSession::Unauthenticated(_) => Err(SendError::Unauthenticated),
        }
    }

    /// Send a message without reporting the outcome.
    ///
    /// Failures are already logged by the authenticated send; a signed-out
    /// session ignores the call.
    pub async fn post_message(&self, payload: SendMessage) {
        match self.send_message(payload).await {
            Ok(_) | Err(SendError::Unauthenticated) => {}
            Err(e) => log::debug!("message not posted: {}", e),
        }
    }

    /// Mark a conversation as read. Does nothing when signed out.
    pub async fn mark_group_read(&self, group_id: impl Into<GroupId>) -> Result<()> {
        match self {
            ChatSession::Authenticated(chat) => chat.mark_group_read(group_id).await,
            ChatSession::Unauthenticated(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Participant, RawMessageGroup, Subject};
    use async_trait::async_trait;

    #[derive(Default)]
    struct EmptyStore;

    #[async_trait]
    impl MessageStore for EmptyStore {
        async fn message_groups(&self) -> Result<Vec<RawMessageGroup>> {
            Ok(vec![RawMessageGroup {
                id: GroupId::new("5"),
                subject: Subject::new(8, "Desk"),
                participants: vec![Participant::new(1, "me"), Participant::new(2, "seller")],
                messages: None,
            }])
        }

        async fn revalidate(&self) -> Result<Vec<RawMessageGroup>> {
            self.message_groups().await
        }

        async fn send_message(&self, _request: &SendMessageRequest) -> Result<()> {
            Ok(())
        }

        async fn mark_read(&self, _group_id: &GroupId) -> Result<()> {
            Ok(())
        }
    }

    fn store() -> Arc<dyn MessageStore> {
        Arc::new(EmptyStore)
    }

    #[test]
    fn test_resolving_is_loading() {
        let session = ChatSession::resolving(store(), ChatConfig::default());
        assert!(session.is_loading());
        assert!(!session.is_authenticated());

        let session = session.resolve(None);
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_authenticate_is_one_way() {
        let session = ChatSession::resolving(store(), ChatConfig::default())
            .authenticate(User::new(1, "Wanjiru"));
        assert!(session.is_authenticated());

        let session = session.resolve(None);
        assert_eq!(session.current_user().map(|u| u.id.as_str()), Some("1"));
    }

    #[test]
    fn test_select_group_coerces_id() {
        let session = ChatSession::new(Some(User::new(1, "me")), store(), ChatConfig::default());
        session.select_group(5);
        assert_eq!(session.selected_group_id(), Some(GroupId::new("5")));
    }

    #[tokio::test]
    async fn test_receiver_resolved_from_empty_group() {
        let session = ChatSession::new(Some(User::new(1, "me")), store(), ChatConfig::default());
        session.refresh().await.unwrap();
        session.select_group("5");

        session.send_message(SendMessage::new(8, "hello")).await.unwrap();

        let chat = session.authenticated().unwrap();
        let local = &chat.optimistic_messages()[0];
        assert_eq!(local.receiver_id, UserId::new("2"));
        assert_eq!(local.status, Some(MessageStatus::Sent));
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let session = ChatSession::new(Some(User::new(1, "me")), store(), ChatConfig::default());
        let err = session
            .send_message(SendMessage::new(8, "   ").to(2))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::EmptyMessage));
        assert!(session.authenticated().unwrap().optimistic_messages().is_empty());
    }
}
