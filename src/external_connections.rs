//! The seam between the API client and the network. [HttpTransport] is implemented over reqwest
//! for real use and by in-memory fakes in tests.

use reqwest::Method;
use serde::Serialize;
use url::Url;

/// A request to the backend, kept as plain data so it can be replayed after a session refresh
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Non-2xx statuses that are valid answers for this request and go back to the caller as is
    pub accepted: Vec<u16>,
    /// Whether an auth failure should renew the session and replay the request
    pub refresh_on_auth_failure: bool,
    /// Set once the request has been replayed after a refresh. It is never replayed again.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        ApiRequest {
            method,
            url,
            query: Vec::new(),
            body: None,
            accepted: Vec::new(),
            refresh_on_auth_failure: true,
            retried: false,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_query<K: Into<String>>(mut self, params: impl IntoIterator<Item = (K, String)>) -> Self {
        self.query
            .extend(params.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    pub fn with_json(mut self, body: &impl Serialize) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn accepting(mut self, status: u16) -> Self {
        self.accepted.push(status);
        self
    }

    /// Auth failures on this request are reported straight away instead of renewing the session
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_auth_failure = false;
        self
    }

    /// Value of a query parameter, if it was set
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        ApiResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The session cookie is missing, expired, or no longer accepted
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Sends one HTTP request and hands back whatever the server answered. Only failures to get an
/// answer at all are errors; error statuses are the caller's business.
pub trait HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, anyhow::Error>;
}
