//! Outbound HTTP policy.
//!
//! The server talks to one well-known upstream, so the policy is small: restrict schemes, an
//! optional host allowlist, an optional response size cap and redaction of credentials in
//! anything that ends up in logs or error messages.

use crate::error::{HttpToolsError, Result};
use std::collections::HashSet;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct OutboundPolicy {
    /// If set, only these hosts are allowed (stored lowercase).
    allowed_hosts: Option<HashSet<String>>,
    /// Maximum response body size in bytes. `None` = unlimited.
    pub max_response_bytes: Option<usize>,
}

impl OutboundPolicy {
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: HashSet<String> = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self.allowed_hosts = (!set.is_empty()).then_some(set);
        self
    }

    #[must_use]
    pub fn with_max_response_bytes(mut self, max: Option<usize>) -> Self {
        self.max_response_bytes = max;
        self
    }

    /// Build the shared `reqwest` client for this policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn build_client(&self, user_agent: &str) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HttpToolsError::Config(format!("failed to build HTTP client: {e}")))
    }

    /// Validate a URL before making an outbound request.
    ///
    /// # Errors
    ///
    /// Returns an error for non-`http(s)` schemes, URLs without a host, and hosts outside the
    /// allowlist.
    pub fn check_url(&self, url: &Url) -> Result<()> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(HttpToolsError::Blocked(format!(
                "unsupported URL scheme '{scheme}'"
            )));
        }

        let Some(host) = url.host_str() else {
            return Err(HttpToolsError::Blocked("missing URL host".to_string()));
        };

        if let Some(allowed) = &self.allowed_hosts
            && !allowed.contains(&host.to_ascii_lowercase())
        {
            return Err(HttpToolsError::Blocked(format!(
                "host '{host}' not in allowlist"
            )));
        }

        Ok(())
    }

    /// Read a response body, enforcing `max_response_bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body exceeds the limit or the transport fails mid-body.
    pub async fn read_body(&self, mut response: reqwest::Response) -> Result<Vec<u8>> {
        let Some(max) = self.max_response_bytes else {
            let bytes = response.bytes().await?;
            return Ok(bytes.to_vec());
        };

        if let Some(len) = response.content_length()
            && len > max as u64
        {
            return Err(HttpToolsError::Http(format!(
                "Response too large: {len} bytes (limit {max})"
            )));
        }

        let mut out: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if out.len().saturating_add(chunk.len()) > max {
                return Err(HttpToolsError::Http(format!(
                    "Response too large: exceeded {max} bytes"
                )));
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

/// Drop credentials, query and fragment from a URL.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
