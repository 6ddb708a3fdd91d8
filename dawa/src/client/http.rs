//! HTTP client configuration and request execution.

use crate::client::AuthInfo;
use crate::error::{Error, Result};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Default Dawa API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.dawa.co.ke/";

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("dawa-rs/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL for API requests.
    pub base_url: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout.
    pub read_timeout: Duration,
    /// User agent.
    pub user_agent: String,
    /// Window in which repeated reads of the same resource are served from cache.
    pub dedupe_interval: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            dedupe_interval: Duration::from_secs(2),
        }
    }
}

impl HttpConfig {
    /// Resolve a relative API path to a full URL.
    pub fn resolve_url(&self, api: &str) -> Result<Url> {
        if api.starts_with("http://") || api.starts_with("https://") {
            return Url::parse(api).map_err(Error::Url);
        }

        Url::parse(&self.base_url)
            .and_then(|b| b.join(api))
            .map_err(Error::Url)
    }
}

/// Build a reqwest client with the given configuration.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .user_agent(config.user_agent.clone())
        .gzip(true)
        .build()
        .map_err(Error::Network)
}

/// HTTP request executor.
pub struct HttpExecutor<'a> {
    client: &'a Client,
    config: &'a HttpConfig,
}

impl<'a> HttpExecutor<'a> {
    /// Create a new executor.
    pub fn new(client: &'a Client, config: &'a HttpConfig) -> Self {
        Self { client, config }
    }

    /// Build a request with common headers.
    fn build_request(&self, method: Method, url: Url, auth: Option<&AuthInfo>) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");

        match auth {
            Some(auth) => request.header(header::AUTHORIZATION, auth.bearer()),
            None => request,
        }
    }

    /// Execute a GET request and return the response text.
    pub async fn get(&self, api: &str, auth: Option<&AuthInfo>) -> Result<String> {
        let url = self.config.resolve_url(api)?;
        log::debug!("GET {}", url);

        let response = self
            .build_request(Method::GET, url, auth)
            .send()
            .await
            .map_err(Error::Network)?;
        self.handle_response(response).await
    }

    /// Execute a POST request with a JSON body and return the response text.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        api: &str,
        body: &B,
        auth: Option<&AuthInfo>,
    ) -> Result<String> {
        let url = self.config.resolve_url(api)?;
        log::debug!("POST {}", url);

        let response = self
            .build_request(Method::POST, url, auth)
            .json(body)
            .send()
            .await
            .map_err(Error::Network)?;
        self.handle_response(response).await
    }

    /// Handle response, turning error statuses into API errors.
    async fn handle_response(&self, response: Response) -> Result<String> {
        let status = response.status();
        let text = response.text().await.map_err(Error::Network)?;

        if !status.is_success() {
            let message = error_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_owned());
            return Err(Error::api(status.as_u16().to_string(), message));
        }

        Ok(text)
    }
}

/// Pull a human readable message out of an error body.
fn error_message(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_owned)
}

/// Parse a JSON response body, unwrapping a `{ "data": ... }` envelope if present.
pub fn unwrap_envelope(text: &str) -> Result<serde_json::Value> {
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }

    let mut value: serde_json::Value = serde_json::from_str(text).map_err(Error::Json)?;

    if let Some(data) = value.get_mut("data") {
        Ok(data.take())
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let config = HttpConfig::default();

        let url = config.resolve_url("api/messages/").unwrap();
        assert!(url.as_str().contains("api.dawa.co.ke"));
        assert!(url.as_str().ends_with("api/messages/"));
    }

    #[test]
    fn test_resolve_absolute_url() {
        let config = HttpConfig::default();
        let url = config.resolve_url("http://localhost:8000/api/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn test_unwrap_envelope() {
        let wrapped = unwrap_envelope(r#"{"data": [1, 2]}"#).unwrap();
        assert_eq!(wrapped, serde_json::json!([1, 2]));

        let bare = unwrap_envelope(r#"[3]"#).unwrap();
        assert_eq!(bare, serde_json::json!([3]));

        assert!(unwrap_envelope("").unwrap().is_null());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"detail": "Invalid token."}"#),
            Some("Invalid token.".to_owned())
        );
        assert_eq!(error_message("<html>"), None);
    }
}
