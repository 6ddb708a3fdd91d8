//! HTTP client and configuration.

mod auth;
mod http;

pub use auth::AuthInfo;
pub use http::{unwrap_envelope, HttpConfig, DEFAULT_BASE_URL};

use crate::api::{MessageApi, UserApi};
use crate::cache::CacheStorage;
use crate::error::{Error, Result};
use http::{build_client, HttpExecutor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating DawaClient.
pub struct DawaClientBuilder {
    auth: Option<AuthInfo>,
    http_config: HttpConfig,
    cache: Option<Arc<dyn CacheStorage>>,
}

impl std::fmt::Debug for DawaClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DawaClientBuilder")
            .field("auth", &self.auth.as_ref().map(|a| &a.uid))
            .field("http_config", &self.http_config)
            .field("cache", &self.cache.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for DawaClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DawaClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            auth: None,
            http_config: HttpConfig::default(),
            cache: None,
        }
    }

    /// Set authentication.
    pub fn auth(mut self, token: impl Into<String>, uid: impl Into<String>) -> Self {
        self.auth = Some(AuthInfo::new(token, uid));
        self
    }

    /// Set authentication from AuthInfo.
    pub fn with_auth(mut self, auth: AuthInfo) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http_config.base_url = url.into();
        self
    }

    /// Set custom user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.http_config.user_agent = ua.into();
        self
    }

    /// Set connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.connect_timeout = timeout;
        self
    }

    /// Set read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.read_timeout = timeout;
        self
    }

    /// Set the request deduplication window for cached reads.
    pub fn dedupe_interval(mut self, interval: Duration) -> Self {
        self.http_config.dedupe_interval = interval;
        self
    }

    /// Set cache storage.
    pub fn cache(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache = Some(storage);
        self
    }

    /// Build DawaClient.
    pub fn build(self) -> Result<DawaClient> {
        if let Some(auth) = &self.auth {
            if !auth.is_valid() {
                return Err(Error::InvalidArgument(format!(
                    "invalid credentials for uid '{}'",
                    auth.uid
                )));
            }
        }

        let http_client = build_client(&self.http_config)?;

        Ok(DawaClient {
            inner: Arc::new(DawaClientInner {
                http: http_client,
                config: self.http_config,
                auth: self.auth,
                cache: self.cache,
            }),
        })
    }
}

/// Internal client state.
pub(crate) struct DawaClientInner {
    pub http: reqwest::Client,
    pub config: HttpConfig,
    pub auth: Option<AuthInfo>,
    /// Cache storage for API responses
    pub cache: Option<Arc<dyn CacheStorage>>,
}

impl DawaClientInner {
    /// Get auth info or error.
    pub fn require_auth(&self) -> Result<&AuthInfo> {
        self.auth.as_ref().ok_or(Error::AuthRequired)
    }

    /// Create HTTP executor.
    pub fn executor(&self) -> HttpExecutor<'_> {
        HttpExecutor::new(&self.http, &self.config)
    }

    /// Execute authenticated GET request.
    pub async fn get_authed(&self, api: &str) -> Result<String> {
        let auth = self.require_auth()?;
        self.executor().get(api, Some(auth)).await
    }

    /// Execute authenticated POST request with a JSON body.
    pub async fn post_authed<B: Serialize + ?Sized>(&self, api: &str, body: &B) -> Result<String> {
        let auth = self.require_auth()?;
        self.executor().post_json(api, body, Some(auth)).await
    }
}

/// Dawa client for interacting with the marketplace API.
#[derive(Clone)]
pub struct DawaClient {
    pub(crate) inner: Arc<DawaClientInner>,
}

impl DawaClient {
    /// Create a new client builder.
    pub fn builder() -> DawaClientBuilder {
        DawaClientBuilder::new()
    }

    /// Get the message API.
    pub fn messages(&self) -> MessageApi {
        MessageApi::new(self.inner.clone())
    }

    /// Get the user API.
    pub fn users(&self) -> UserApi {
        UserApi::new(self.inner.clone())
    }

    /// Check if the client is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_some()
    }

    /// Get the current authentication info.
    pub fn auth_info(&self) -> Option<&AuthInfo> {
        self.inner.auth.as_ref()
    }

    /// Get the current user ID if authenticated.
    pub fn current_uid(&self) -> Option<&str> {
        self.inner.auth.as_ref().map(|a| a.uid.as_str())
    }

    /// Get the HTTP configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for DawaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DawaClient")
            .field("authenticated", &self.is_authenticated())
            .field("base_url", &self.inner.config.base_url)
            .finish()
    }
}
