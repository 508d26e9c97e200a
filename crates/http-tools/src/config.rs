use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// One credential attached to every outbound request of a tool source.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthConfig {
    /// `Authorization: Bearer <token>`
    Bearer { token: String },
    /// Arbitrary header, e.g. `Client-Id: <id>`.
    Header { name: String, value: String },
}

impl AuthConfig {
    #[must_use]
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthConfig::Bearer { token } => request.bearer_auth(token),
            AuthConfig::Header { name, value } => request.header(name, value),
        }
    }
}

/// Defaults applied to every endpoint of a tool source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDefaults {
    /// Per-request timeout in seconds. `Some(0)` disables the timeout.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Static headers sent with every request (before auth is applied).
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl EndpointDefaults {
    /// Resolve the timeout to use for one request.
    #[must_use]
    pub fn effective_timeout(&self, fallback: Duration) -> Option<Duration> {
        match self.timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(fallback),
        }
    }

    #[must_use]
    pub fn apply_headers(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        request
    }
}
