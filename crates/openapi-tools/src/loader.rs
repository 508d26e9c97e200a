//! Spec loading: fetch, verify, parse, normalize.

use crate::config::HashPolicy;
use crate::error::{OpenApiToolsError, Result};
use crate::fixups::normalize_document;
use crate::resolver::DocId;
use helix_http_tools::safety::{OutboundPolicy, sanitize_reqwest_error};
use openapiv3::OpenAPI;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A parsed description plus the normalized document it was typed from.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub doc_id: DocId,
    /// Normalized untyped document (the resolver serves local `$ref`s from it).
    pub document: Value,
    pub spec: OpenAPI,
    /// Number of values changed by fixups.
    pub fixes: usize,
}

/// Read a document from a file path, `file://` URL or `http(s)` URL.
pub async fn read_document_text(doc: &DocId, client: &Client, policy: &OutboundPolicy) -> Result<String> {
    match doc {
        DocId::File(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
            OpenApiToolsError::OpenApiSpecReadFile {
                path: path.display().to_string(),
                source,
            }
        }),
        DocId::Url(url) => {
            policy.check_url(url)?;
            let fetch_err = |message: String| OpenApiToolsError::OpenApiSpecFetch {
                url: url.to_string(),
                message,
            };
            let resp = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| fetch_err(sanitize_reqwest_error(&e)))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(fetch_err(format!("HTTP {status}")));
            }
            let bytes = policy
                .read_body(resp)
                .await
                .map_err(|e| fetch_err(e.to_string()))?;
            String::from_utf8(bytes).map_err(|_| fetch_err("body is not valid UTF-8".to_string()))
        }
    }
}

/// Compare the raw content against an expected `sha256:<hex>` digest.
///
/// # Errors
///
/// Returns an error on mismatch when the policy is [`HashPolicy::Fail`].
pub fn verify_hash(content: &str, expected: &str, policy: HashPolicy, location: &str) -> Result<()> {
    if policy == HashPolicy::Ignore {
        return Ok(());
    }
    let actual = format!("sha256:{}", hex::encode(Sha256::digest(content.as_bytes())));
    if actual.eq_ignore_ascii_case(expected.trim()) {
        return Ok(());
    }
    match policy {
        HashPolicy::Fail => Err(OpenApiToolsError::OpenApi(format!(
            "Spec hash mismatch for '{location}'. Expected: {expected}, Got: {actual}"
        ))),
        HashPolicy::Warn => {
            tracing::warn!(location, expected, actual = %actual, "spec hash mismatch");
            Ok(())
        }
        HashPolicy::Ignore => Ok(()),
    }
}

/// Parse JSON or YAML into an untyped document and apply fixups.
///
/// Returns the document and the number of fixes applied.
pub fn parse_document(content: &str, location: &str) -> Result<(Value, usize)> {
    let mut doc: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str(content).map_err(|e| OpenApiToolsError::OpenApiSpecParse {
            location: location.to_string(),
            message: e.to_string(),
        })?,
    };
    let fixes = normalize_document(&mut doc);
    Ok((doc, fixes))
}

/// Load the root description.
///
/// # Errors
///
/// Returns an error if the document cannot be read, fails the hash check, or is not a valid
/// `OpenAPI` 3 description after normalization.
pub async fn load_spec(
    location: &str,
    expected_hash: Option<&str>,
    hash_policy: HashPolicy,
    client: &Client,
    policy: &OutboundPolicy,
) -> Result<LoadedSpec> {
    let doc_id = DocId::parse(location)?;
    tracing::info!(spec = %doc_id, "loading OpenAPI description");

    let content = read_document_text(&doc_id, client, policy).await?;
    if let Some(expected) = expected_hash {
        verify_hash(&content, expected, hash_policy, location)?;
    }

    let (document, fixes) = parse_document(&content, location)?;
    if fixes > 0 {
        tracing::info!(fixes, "normalized invalid schema types (Bool -> boolean)");
    }

    let spec: OpenAPI = serde_json::from_value(document.clone()).map_err(|e| {
        OpenApiToolsError::OpenApiSpecParse {
            location: location.to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(LoadedSpec {
        doc_id,
        document,
        spec,
        fixes,
    })
}
