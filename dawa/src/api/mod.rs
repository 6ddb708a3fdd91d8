//! API modules.

mod message;
mod user;

pub use message::{MessageApi, SendMessageBuilder};
pub use user::UserApi;
