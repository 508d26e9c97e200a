//! The tool surface clients see: generated + built-in tools, tag-filtered and transformed.
//!
//! Filtering and transform lookups always use the original (generated) tool name; clients may
//! call either the exposed or the original name.

use crate::builtins::Builtin;
use crate::error::Result;
use crate::twitch::TokenValidator;
use helix_openapi_tools::error::OpenApiToolsError;
use helix_openapi_tools::filter::{FilterDecision, TagFilter};
use helix_openapi_tools::OpenApiToolSource;
use helix_tool_transforms::{CallContext, TransformPipeline};
use rmcp::ErrorData;
use rmcp::model::{AnnotateAble as _, CallToolResult, Content, JsonObject, Meta, RawResource, Resource, Tool};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Generated,
    Builtin(Builtin),
}

#[derive(Debug, Clone)]
pub struct SurfaceEntry {
    tool: Tool,
    original: String,
    tags: Vec<String>,
    origin: Origin,
}

impl SurfaceEntry {
    #[must_use]
    pub fn exposed_name(&self) -> &str {
        &self.tool.name
    }

    #[must_use]
    pub fn tool(&self) -> &Tool {
        &self.tool
    }
}

#[derive(Debug)]
pub struct ToolSurface {
    source: Arc<OpenApiToolSource>,
    filter: TagFilter,
    transforms: TransformPipeline,
    tokens: TokenValidator,
    /// Sorted by exposed name.
    entries: Vec<SurfaceEntry>,
    /// Resource-kind operations that pass the filter, by original name.
    resources: Vec<String>,
}

impl ToolSurface {
    /// # Errors
    ///
    /// Returns an error if the transform table is ambiguous (two tools or two arguments renamed
    /// to the same name).
    pub fn new(
        source: Arc<OpenApiToolSource>,
        filter: TagFilter,
        transforms: Option<TransformPipeline>,
        tokens: TokenValidator,
    ) -> Result<Self> {
        let transforms = transforms.unwrap_or_default();
        transforms.validate()?;

        for original in transforms.tool_overrides.keys() {
            if source.find(original).is_none() && Builtin::from_name(original).is_none() {
                tracing::warn!(tool = %original, "transform source tool not found; skipping");
            }
        }

        let mut candidates: Vec<(Tool, Vec<String>, Origin)> = source
            .tools()
            .iter()
            .filter(|t| t.kind() == helix_openapi_tools::routes::RouteKind::Tool)
            .map(|t| (t.to_mcp_tool(), t.tags().to_vec(), Origin::Generated))
            .collect();
        candidates.extend(Builtin::ALL.into_iter().map(|b| {
            let tags = b.tags().iter().map(|t| (*t).to_string()).collect();
            (b.to_mcp_tool(), tags, Origin::Builtin(b))
        }));

        let mut entries: Vec<SurfaceEntry> = Vec::with_capacity(candidates.len());
        let mut taken: HashSet<String> = HashSet::new();
        for (mut tool, tags, origin) in candidates {
            let original = tool.name.to_string();
            match filter.decide(&tags) {
                FilterDecision::Allowed => {}
                FilterDecision::Excluded(tag) => {
                    tracing::debug!(tool = %original, tag = %tag, "tool excluded by tag");
                    continue;
                }
                FilterDecision::NotIncluded => {
                    tracing::debug!(tool = %original, "tool not in included tags");
                    continue;
                }
            }
            if !transforms.is_enabled(&original) {
                tracing::debug!(tool = %original, "tool disabled by transform");
                continue;
            }

            apply_transforms(&transforms, &original, &mut tool)?;
            if !taken.insert(tool.name.to_string()) {
                tracing::warn!(tool = %original, exposed = %tool.name, "exposed name already taken; skipping");
                continue;
            }
            if tool.name != original {
                tracing::debug!(tool = %original, exposed = %tool.name, "transformed tool");
            }
            entries.push(SurfaceEntry {
                tool,
                original,
                tags,
                origin,
            });
        }
        entries.sort_by(|a, b| a.tool.name.cmp(&b.tool.name));

        let resources = source
            .resources()
            .filter(|t| filter.allows(t.tags()))
            .map(|t| t.name().to_string())
            .collect();

        Ok(Self {
            source,
            filter,
            transforms,
            tokens,
            entries,
            resources,
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[SurfaceEntry] {
        &self.entries
    }

    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.tool.clone()).collect()
    }

    #[must_use]
    pub fn source(&self) -> &OpenApiToolSource {
        &self.source
    }

    #[must_use]
    pub fn transforms_enabled(&self) -> bool {
        !self.transforms.is_empty()
    }

    /// Exposed name first, then original name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&SurfaceEntry> {
        self.entries
            .iter()
            .find(|e| e.tool.name == name)
            .or_else(|| self.entries.iter().find(|e| e.original == name))
    }

    /// Upstream and argument failures become error results; only unknown tools are
    /// protocol errors.
    ///
    /// # Errors
    ///
    /// Returns `invalid_params` for names that are not on the surface.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let entry = self
            .resolve(name)
            .ok_or_else(|| ErrorData::invalid_params(format!("Unknown tool: {name}"), None))?;

        let mut args = arguments.unwrap_or_default();
        let context = if self.transforms.required_context(&entry.original).is_empty() {
            CallContext::new()
        } else {
            self.tokens.call_context().await
        };
        if let Err(e) = self
            .transforms
            .apply_call_transforms(&entry.original, &mut args, &context)
        {
            return Ok(CallToolResult::error(vec![Content::text(e.to_string())]));
        }

        match entry.origin {
            Origin::Builtin(b) => Ok(b.call(&args, &self.source, &self.tokens).await),
            Origin::Generated => match self.source.call_tool(&entry.original, &args).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    tracing::warn!(tool = %entry.original, error = %e, "tool call failed");
                    Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
                }
            },
        }
    }

    #[must_use]
    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty()
    }

    #[must_use]
    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .filter_map(|name| self.source.find(name))
            .map(|t| {
                let mut raw = RawResource::new(self.source.resource_uri(t), t.name().to_string());
                raw.description = Some(t.description().to_string());
                raw.mime_type = Some("application/json".to_string());
                raw.no_annotation()
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `resource_not_found` for URIs outside the surface and `internal_error` when the
    /// upstream call fails.
    pub async fn read_resource(&self, uri: &str) -> std::result::Result<String, ErrorData> {
        let not_found = || ErrorData::resource_not_found(format!("Unknown resource: {uri}"), None);
        let (tool, _) = self.source.resolve_resource_uri(uri).map_err(|_| not_found())?;
        if !self.resources.iter().any(|r| r == tool.name()) {
            return Err(not_found());
        }

        self.source.read_resource(uri).await.map_err(|e| match e {
            OpenApiToolsError::UnknownTool(_) => not_found(),
            other => ErrorData::internal_error(other.to_string(), None),
        })
    }

    /// One line per tool (`name (METHOD /path) [tags] description`), then resources.
    #[must_use]
    pub fn render_listing(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Tools ({}):", self.entries.len());
        for e in &self.entries {
            let desc = e.tool.description.as_deref().unwrap_or_default();
            let route = match e.origin {
                Origin::Generated => self
                    .source
                    .find(&e.original)
                    .map(|t| format!("{} {}", t.method(), t.path()))
                    .unwrap_or_default(),
                Origin::Builtin(_) => "built-in".to_string(),
            };
            let _ = writeln!(
                out,
                "  {} ({route}) [{}] {}",
                e.tool.name,
                e.tags.join(", "),
                desc
            );
        }
        if self.has_resources() {
            let _ = writeln!(out, "Resources ({}):", self.resources.len());
            for r in self.list_resources() {
                let _ = writeln!(out, "  {}", r.uri);
            }
        }
        out
    }

    pub fn log_summary(&self) {
        let include: Vec<&str> = self.filter.include().collect();
        let exclude: Vec<&str> = self.filter.exclude().collect();
        tracing::info!(
            api = %self.source.spec_title(),
            base_url = %self.source.base_url(),
            tools = self.entries.len(),
            resources = self.resources.len(),
            include = ?include,
            exclude = ?exclude,
            transformations = self.transforms_enabled(),
            "tool surface ready"
        );
        for e in &self.entries {
            tracing::info!(tool = %e.tool.name, tags = ?e.tags, "tool");
        }
    }
}

/// Rename, relabel and reshape one tool according to `transforms`.
fn apply_transforms(transforms: &TransformPipeline, original: &str, tool: &mut Tool) -> Result<()> {
    let mut schema = Value::Object(tool.input_schema.as_ref().clone());
    transforms.validate_schema(original, &schema)?;

    tool.name = transforms.exposed_tool_name(original).to_string().into();
    if let Some(desc) = transforms.description_for(original) {
        tool.description = Some(desc.to_string().into());
    }

    transforms.apply_schema_transforms(original, &mut schema);
    if let Value::Object(obj) = schema {
        tool.input_schema = Arc::new(obj);
    }

    if let Some(extra) = transforms.meta_for(original) {
        let meta = tool.meta.get_or_insert_with(|| Meta(JsonObject::new()));
        for (k, v) in extra {
            meta.0.insert(k.clone(), v.clone());
        }
    }
    Ok(())
}
