//! User models.

use serde::{Deserialize, Serialize};

use super::UserId;

/// An account on the marketplace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Display name.
    #[serde(alias = "full_name")]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Avatar URL.
    #[serde(default, alias = "profile_picture")]
    pub avatar_url: Option<String>,
}

impl User {
    /// Create a user with just an id and display name.
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Name to show in listings, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// One side of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// User ID.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
    /// Avatar URL.
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl Participant {
    /// Create a participant.
    pub fn new(id: impl Into<UserId>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            profile_picture: None,
        }
    }
}

impl From<&User> for Participant {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.name.clone(),
            profile_picture: user.avatar_url.clone(),
        }
    }
}
