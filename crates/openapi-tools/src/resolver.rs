//! `$ref` resolution.
//!
//! `openapiv3` keeps references as `ReferenceOr<T>` and leaves resolution to the caller. Local
//! (`#/...`), relative and absolute file, `file://` and `http(s)` references are supported.
//! A reference is resolved relative to the document that contains it, so callers pass the
//! current [`DocId`] along with every lookup.
//!
//! External documents go through the same parse + fixup path as the root document and are
//! cached for the lifetime of the resolver.

use crate::error::{OpenApiToolsError, Result};
use crate::loader::{parse_document, read_document_text};
use helix_http_tools::safety::OutboundPolicy;
use openapiv3::ReferenceOr;
use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocId {
    Url(Url),
    File(PathBuf),
}

fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn without_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

fn canonical(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

fn file_url_to_path(location: &str) -> Result<PathBuf> {
    let url = Url::parse(location)
        .map_err(|e| OpenApiToolsError::OpenApi(format!("Invalid file URL '{location}': {e}")))?;
    url.to_file_path()
        .map(canonical)
        .map_err(|()| OpenApiToolsError::OpenApi(format!("File URL is not a path: {location}")))
}

impl DocId {
    /// Parse a root spec location.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed URLs.
    pub fn parse(location: &str) -> Result<Self> {
        if is_http(location) {
            let url = Url::parse(location).map_err(|e| {
                OpenApiToolsError::OpenApi(format!("Invalid spec URL '{location}': {e}"))
            })?;
            Ok(DocId::Url(without_fragment(url)))
        } else if location.starts_with("file://") {
            Ok(DocId::File(file_url_to_path(location)?))
        } else {
            Ok(DocId::File(canonical(PathBuf::from(location))))
        }
    }

    /// Resolve the document part of a `$ref` against this document.
    fn join(&self, doc_part: &str) -> Result<DocId> {
        if doc_part.is_empty() {
            return Ok(self.clone());
        }
        if is_http(doc_part) || doc_part.starts_with("file://") {
            return DocId::parse(doc_part);
        }
        match self {
            DocId::Url(base) => base
                .join(doc_part)
                .map(|u| DocId::Url(without_fragment(u)))
                .map_err(|e| {
                    OpenApiToolsError::OpenApi(format!(
                        "Cannot resolve $ref '{doc_part}' against {base}: {e}"
                    ))
                }),
            DocId::File(base) => {
                let target = if Path::new(doc_part).is_absolute() {
                    PathBuf::from(doc_part)
                } else {
                    base.parent().unwrap_or_else(|| Path::new(".")).join(doc_part)
                };
                Ok(DocId::File(canonical(target)))
            }
        }
    }

    /// The base used to resolve relative server URLs, if this is a URL document.
    #[must_use]
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            DocId::Url(u) => Some(u),
            DocId::File(_) => None,
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Url(u) => write!(f, "{u}"),
            DocId::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Split a `$ref` into its target document and optional JSON pointer.
fn split_ref(current: &DocId, reference: &str) -> Result<(DocId, Option<String>)> {
    let (doc_part, fragment) = reference.split_once('#').unwrap_or((reference, ""));
    let pointer = match fragment {
        "" => None,
        f if f.starts_with('/') => Some(f.to_string()),
        _ => {
            return Err(OpenApiToolsError::OpenApi(format!(
                "Unsupported $ref fragment (expected a JSON pointer): {reference}"
            )));
        }
    };
    Ok((current.join(doc_part)?, pointer))
}

#[derive(Debug)]
pub struct SpecResolver<'a> {
    client: &'a Client,
    policy: &'a OutboundPolicy,
    docs: RwLock<HashMap<DocId, Arc<Value>>>,
}

impl<'a> SpecResolver<'a> {
    /// `root` is the already normalized root document.
    #[must_use]
    pub fn new(root_id: DocId, root: Value, client: &'a Client, policy: &'a OutboundPolicy) -> Self {
        let mut docs = HashMap::new();
        docs.insert(root_id, Arc::new(root));
        Self {
            client,
            policy,
            docs: RwLock::new(docs),
        }
    }

    /// Follow `$ref`s until an item is reached.
    ///
    /// Returns the item and the document it was found in, which is the base for any nested
    /// references inside it.
    ///
    /// # Errors
    ///
    /// Returns an error for cycles, missing pointers, unreadable documents, or values of the
    /// wrong shape.
    pub async fn resolve<T>(&self, current: &DocId, r: &ReferenceOr<T>) -> Result<(DocId, T)>
    where
        T: Clone + DeserializeOwned,
    {
        let mut seen: HashSet<(DocId, Option<String>)> = HashSet::new();
        let mut doc = current.clone();
        let mut cur = r.clone();

        loop {
            let reference = match cur {
                ReferenceOr::Item(item) => return Ok((doc, item)),
                ReferenceOr::Reference { reference } => reference,
            };

            let (target, pointer) = split_ref(&doc, &reference)?;
            if !seen.insert((target.clone(), pointer.clone())) {
                return Err(OpenApiToolsError::OpenApi(format!(
                    "Cyclic $ref detected while resolving: {reference}"
                )));
            }

            let document = self.document(&target).await?;
            let value = match &pointer {
                Some(p) => document.pointer(p).cloned().ok_or_else(|| {
                    OpenApiToolsError::OpenApi(format!(
                        "Unresolved $ref '{reference}' (no '{p}' in {target})"
                    ))
                })?,
                None => (*document).clone(),
            };

            cur = serde_json::from_value(value).map_err(|e| {
                OpenApiToolsError::OpenApi(format!(
                    "$ref '{reference}' in {target} has an unexpected shape: {e}"
                ))
            })?;
            doc = target;
        }
    }

    async fn document(&self, id: &DocId) -> Result<Arc<Value>> {
        if let Some(v) = self.docs.read().get(id).cloned() {
            return Ok(v);
        }

        let content = read_document_text(id, self.client, self.policy).await?;
        let (value, fixes) = parse_document(&content, &id.to_string())?;
        if fixes > 0 {
            tracing::debug!(document = %id, fixes, "normalized referenced document");
        }

        let value = Arc::new(value);
        self.docs.write().insert(id.clone(), Arc::clone(&value));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openapiv3::{Parameter, Schema, SchemaKind, Type};
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn root_id() -> DocId {
        DocId::File(PathBuf::from("/nonexistent/root.yaml"))
    }

    #[tokio::test]
    async fn resolves_local_refs_through_chains() {
        let root = json!({
            "components": {
                "schemas": {
                    "Alias": { "$ref": "#/components/schemas/User" },
                    "User": { "type": "object", "properties": { "id": { "type": "string" } } }
                }
            }
        });
        let client = Client::new();
        let policy = OutboundPolicy::permissive();
        let resolver = SpecResolver::new(root_id(), root, &client, &policy);

        let r: ReferenceOr<Schema> = ReferenceOr::ref_("#/components/schemas/Alias");
        let (doc, schema) = resolver.resolve(&root_id(), &r).await.unwrap();
        assert_eq!(doc, root_id());
        assert!(matches!(schema.schema_kind, SchemaKind::Type(Type::Object(_))));
    }

    #[tokio::test]
    async fn detects_cycles() {
        let root = json!({
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/B" },
                    "B": { "$ref": "#/components/schemas/A" }
                }
            }
        });
        let client = Client::new();
        let policy = OutboundPolicy::permissive();
        let resolver = SpecResolver::new(root_id(), root, &client, &policy);

        let r: ReferenceOr<Schema> = ReferenceOr::ref_("#/components/schemas/A");
        let err = resolver.resolve(&root_id(), &r).await.unwrap_err();
        assert!(err.to_string().contains("Cyclic"));
    }

    #[tokio::test]
    async fn external_documents_are_normalized() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("params.yaml"),
            r"
Mature:
  name: is_mature
  in: query
  schema:
    type: Bool
",
        )
        .unwrap();
        let root_path = dir.path().join("root.yaml");
        let root_doc = DocId::parse(&root_path.display().to_string()).unwrap();

        let client = Client::new();
        let policy = OutboundPolicy::permissive();
        let resolver = SpecResolver::new(root_doc.clone(), json!({}), &client, &policy);

        let r: ReferenceOr<Parameter> = ReferenceOr::ref_("./params.yaml#/Mature");
        let (doc, param) = resolver.resolve(&root_doc, &r).await.unwrap();
        assert!(doc.to_string().ends_with("params.yaml"));
        let Parameter::Query { parameter_data, .. } = param else {
            panic!("expected a query parameter");
        };
        assert_eq!(parameter_data.name, "is_mature");
    }

    #[test]
    fn url_documents_join_relative_refs() {
        let base = DocId::parse("https://example.com/specs/root.json#frag").unwrap();
        let (doc, ptr) = split_ref(&base, "common.json#/components/schemas/X").unwrap();
        assert_eq!(doc.to_string(), "https://example.com/specs/common.json");
        assert_eq!(ptr.as_deref(), Some("/components/schemas/X"));
        assert!(split_ref(&base, "#bad").is_err());
    }
}
