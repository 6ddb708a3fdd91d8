//! Conversations with optimistic sending.
//!
//! Backend groups are normalized, merged with locally sent messages that are
//! still waiting for (or have just received) confirmation, and exposed through
//! [`ChatSession`].

mod buffer;
mod error;
mod normalize;
mod reconcile;
mod session;
mod store;

pub use buffer::OptimisticBuffer;
pub use error::SendError;
pub use normalize::{normalize_group, normalize_groups};
pub use reconcile::{is_duplicate_of, reconcile};
pub use session::{AuthenticatedChat, ChatConfig, ChatSession, SendMessage, UnauthenticatedChat};
pub use store::{MessageStore, SendMessageRequest};
