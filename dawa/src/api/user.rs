//! User API.

use std::sync::Arc;

use crate::{
    client::{unwrap_envelope, DawaClientInner},
    error::{Error, Result},
    models::User,
};

/// API for user operations.
pub struct UserApi {
    client: Arc<DawaClientInner>,
}

impl UserApi {
    pub(crate) fn new(client: Arc<DawaClientInner>) -> Self {
        Self { client }
    }

    /// Get the user the access token belongs to.
    pub async fn me(&self) -> Result<User> {
        let text = self.client.get_authed("api/users/me/").await?;
        parse_user(&text)
    }
}

fn parse_user(text: &str) -> Result<User> {
    let value = unwrap_envelope(text)?;
    if value.is_null() {
        return Err(Error::missing("user data"));
    }

    let user: User = serde_json::from_value(value).map_err(Error::Json)?;
    if user.id.is_empty() {
        return Err(Error::missing("id"));
    }
    Ok(user)
}
