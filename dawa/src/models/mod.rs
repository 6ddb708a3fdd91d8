//! Data models for Dawa entities.

mod ids;
mod message;
mod user;

pub use ids::{GroupId, ItemId, MessageId, UserId};
pub use message::{
    parse_timestamp, Message, MessageGroup, MessageStatus, RawMessage, RawMessageGroup, Subject,
};
pub use user::{Participant, User};
