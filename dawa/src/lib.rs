//! Rust client library for Dawa marketplace chat.

pub mod api;
pub mod cache;
pub mod chat;
pub mod client;
pub mod error;
pub mod models;

// Re-export main types
pub use client::{AuthInfo, DawaClient, DawaClientBuilder, HttpConfig};
pub use error::{Error, Result};

// Re-export commonly used models
pub use models::{
    GroupId, ItemId, Message, MessageGroup, MessageId, MessageStatus, Participant, Subject, User,
    UserId,
};

// Re-export chat types
pub use chat::{
    ChatConfig, ChatSession, MessageStore, OptimisticBuffer, SendError, SendMessage,
    SendMessageRequest,
};
