//! `OpenAPI` tool source runtime.
//!
//! Converts operations into MCP tools at startup and executes outbound HTTP requests for
//! `tools/call` and resource reads. A source is immutable once built.

use crate::config::ApiSourceConfig;
use crate::error::{OpenApiToolsError, Result};
use crate::loader::{LoadedSpec, load_spec};
use crate::naming::reserve_unique;
use crate::query::{QueryPair, QuerySerialization, encode_component, encode_pairs, serialize_param};
use crate::resolver::{DocId, SpecResolver};
use crate::routes::{RouteKind, RouteTable};
use crate::schema::{
    ArgSchema, build_input_schema, json_type, schema_to_json, value_to_string,
    wrap_body_output_schema,
};
use base64::Engine as _;
use helix_http_tools::safety::{OutboundPolicy, redact_url, sanitize_reqwest_error};
use helix_http_tools::semantics::MethodSemantics;
use mime::Mime;
use openapiv3::{
    MediaType, Operation, Parameter, ParameterSchemaOrContent, PathItem, ReferenceOr,
    RequestBody, Schema, SchemaKind, StatusCode, Type,
};
use reqwest::{Client, Method};
use rmcp::model::{CallToolResult, Content, JsonObject, Meta, Tool};
use serde_json::{Map, Value, json};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Per-request timeout when the endpoint defaults do not set one.
    pub default_timeout: Duration,
    /// Bound on spec loading plus tool discovery.
    pub startup_timeout: Duration,
    pub policy: OutboundPolicy,
    pub user_agent: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            startup_timeout: Duration::from_secs(60),
            policy: OutboundPolicy::permissive(),
            user_agent: concat!("helix-openapi-tools/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ParamLocation {
    Path,
    Query(QuerySerialization),
    Header,
    /// One field of a flattened JSON object body.
    BodyField,
    /// The whole (non-object) JSON body.
    Body,
}

impl ParamLocation {
    fn key(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query(_) => "query",
            ParamLocation::Header => "header",
            ParamLocation::BodyField | ParamLocation::Body => "body",
        }
    }
}

#[derive(Debug, Clone)]
struct ToolParameter {
    /// Argument name in the tool schema.
    arg: String,
    /// Name on the wire: path placeholder, query key, header or body field.
    wire: String,
    location: ParamLocation,
    required: bool,
    schema: Value,
}

/// A tool generated from one `OpenAPI` operation.
#[derive(Debug, Clone)]
pub struct GeneratedTool {
    name: String,
    title: Option<String>,
    description: String,
    method: Method,
    path: String,
    parameters: Vec<ToolParameter>,
    input_schema: Value,
    output_schema: Option<Arc<JsonObject>>,
    tags: Vec<String>,
    kind: RouteKind,
}

impl GeneratedTool {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Operation tags followed by the configured global tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    #[must_use]
    pub fn output_schema(&self) -> Option<&Arc<JsonObject>> {
        self.output_schema.as_ref()
    }

    #[must_use]
    pub fn argument_schema(&self, arg: &str) -> Option<&Value> {
        self.input_schema.get("properties")?.get(arg)
    }

    /// The MCP tool definition, with `_meta.tags` and method-derived annotations.
    #[must_use]
    pub fn to_mcp_tool(&self) -> Tool {
        let schema = self.input_schema.as_object().cloned().unwrap_or_default();
        let mut tool = Tool::new(self.name.clone(), self.description.clone(), Arc::new(schema));
        tool.output_schema.clone_from(&self.output_schema);
        tool.annotations = Some(MethodSemantics::of(&self.method).annotations(self.title.clone()));

        let mut meta = JsonObject::new();
        meta.insert("tags".to_string(), json!(self.tags));
        tool.meta = Some(Meta(meta));
        tool
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    /// Parsed JSON, or the raw text when the body is not JSON.
    Json(Value),
    Image { bytes: Vec<u8>, mime_type: String },
}

struct RequestParts {
    path: String,
    query: Vec<QueryPair>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

/// `OpenAPI` source exposing HTTP API operations as MCP tools.
#[derive(Debug)]
pub struct OpenApiToolSource {
    config: ApiSourceConfig,
    client: Client,
    policy: OutboundPolicy,
    base_url: String,
    default_timeout: Duration,
    title: String,
    tools: Vec<GeneratedTool>,
}

impl OpenApiToolSource {
    /// Load the spec and discover tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be loaded or parsed, no base URL can be determined,
    /// a route map is invalid, or startup exceeds `options.startup_timeout`.
    pub async fn build(config: ApiSourceConfig, options: SourceOptions) -> Result<Self> {
        let client = options.policy.build_client(&options.user_agent)?;
        let routes = RouteTable::compile(&config.route_maps)?;

        let startup = async {
            let loaded = load_spec(
                &config.spec,
                config.spec_hash.as_deref(),
                config.spec_hash_policy,
                &client,
                &options.policy,
            )
            .await?;
            let base_url = resolve_base_url(config.base_url.as_deref(), &loaded)?;

            let discovery = Discovery {
                config: &config,
                routes: &routes,
                resolver: SpecResolver::new(
                    loaded.doc_id.clone(),
                    loaded.document.clone(),
                    &client,
                    &options.policy,
                ),
                names: HashSet::new(),
            };
            let tools = discovery.run(&loaded).await;
            Ok::<_, OpenApiToolsError>((loaded.spec.info.title.clone(), base_url, tools))
        };

        let (title, base_url, tools) = tokio::time::timeout(options.startup_timeout, startup)
            .await
            .map_err(|_| {
                OpenApiToolsError::Startup(format!(
                    "startup timeout after {:?} loading '{}'",
                    options.startup_timeout, config.spec
                ))
            })??;

        tracing::info!(
            title = %title,
            base_url = %base_url,
            tools = tools.len(),
            "discovered tools from OpenAPI description"
        );

        Ok(Self {
            config,
            client,
            policy: options.policy,
            base_url,
            default_timeout: options.default_timeout,
            title,
            tools,
        })
    }

    #[must_use]
    pub fn spec_title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Every generated operation, tools and resources alike, in spec order.
    #[must_use]
    pub fn tools(&self) -> &[GeneratedTool] {
        &self.tools
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&GeneratedTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn resources(&self) -> impl Iterator<Item = &GeneratedTool> {
        self.tools.iter().filter(|t| t.kind == RouteKind::Resource)
    }

    #[must_use]
    pub fn resource_uri(&self, tool: &GeneratedTool) -> String {
        format!("{}://operation/{}", self.config.resource_scheme, tool.name)
    }

    /// Execute a tool call.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown, a required argument is missing, the request is
    /// blocked by the outbound policy, or the upstream fails or answers with a non-2xx status.
    pub async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<CallToolResult> {
        let tool = self
            .find(name)
            .ok_or_else(|| OpenApiToolsError::UnknownTool(name.to_string()))?;

        match self.invoke(tool, arguments).await? {
            ToolResponse::Image { bytes, mime_type } => {
                let data = base64::engine::general_purpose::STANDARD.encode(bytes);
                Ok(CallToolResult::success(vec![Content::image(data, mime_type)]))
            }
            ToolResponse::Json(body) if tool.output_schema.is_some() => {
                let structured = json!({ "body": body });
                let mut result = CallToolResult::success(vec![Content::text(structured.to_string())]);
                result.structured_content = Some(structured);
                Ok(result)
            }
            ToolResponse::Json(body) => Ok(CallToolResult::success(vec![Content::text(
                render_text(&body),
            )])),
        }
    }

    /// Send the request for `tool` and decode the response.
    ///
    /// # Errors
    ///
    /// See [`Self::call_tool`].
    pub async fn invoke(&self, tool: &GeneratedTool, arguments: &Map<String, Value>) -> Result<ToolResponse> {
        let parts = build_request_parts(tool, arguments)?;
        let url = self.url_for(&parts.path, &parts.query)?;
        tracing::debug!(
            tool = %tool.name,
            method = %tool.method,
            url = %redact_url(&url),
            "calling upstream"
        );

        let mut request = self.client.request(tool.method.clone(), url);
        request = self.decorate(request, parts.headers);
        if let Some(body) = &parts.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OpenApiToolsError::Request(sanitize_reqwest_error(&e)))?;
        self.read_response(response).await
    }

    /// `GET` an arbitrary path under the base URL with the source's credentials.
    ///
    /// # Errors
    ///
    /// Same failure modes as a tool call.
    pub async fn fetch_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let pairs = query
            .iter()
            .map(|(k, v)| QueryPair {
                key: (*k).to_string(),
                value: (*v).to_string(),
                allow_reserved: false,
            })
            .collect::<Vec<_>>();
        let url = self.url_for(path, &pairs)?;
        let request = self.decorate(self.client.get(url), Vec::new());
        let response = request
            .send()
            .await
            .map_err(|e| OpenApiToolsError::Request(sanitize_reqwest_error(&e)))?;

        match self.read_response(response).await? {
            ToolResponse::Json(v) => Ok(v),
            ToolResponse::Image { mime_type, .. } => Err(OpenApiToolsError::Http(format!(
                "expected JSON from {path}, got {mime_type}"
            ))),
        }
    }

    /// Map a resource URI (`<scheme>://operation/<name>?arg=value`) to its operation and
    /// arguments. Query values are coerced using the argument schemas; repeated keys build
    /// arrays.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed URIs and URIs that name no resource.
    pub fn resolve_resource_uri(&self, uri: &str) -> Result<(&GeneratedTool, Map<String, Value>)> {
        let url = Url::parse(uri)
            .map_err(|e| OpenApiToolsError::Runtime(format!("Invalid resource URI '{uri}': {e}")))?;
        if url.scheme() != self.config.resource_scheme || url.host_str() != Some("operation") {
            return Err(OpenApiToolsError::UnknownTool(uri.to_string()));
        }

        let name = url.path().trim_start_matches('/');
        let tool = self
            .resources()
            .find(|t| t.name == name)
            .ok_or_else(|| OpenApiToolsError::UnknownTool(uri.to_string()))?;

        let mut args = Map::new();
        for (key, raw) in url.query_pairs() {
            let schema = tool.argument_schema(&key);
            if schema.and_then(json_type) == Some("array") {
                let item_type = schema.and_then(|s| s.get("items")).and_then(json_type);
                let entry = args
                    .entry(key.into_owned())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(items) = entry {
                    items.push(coerce_query_value(&raw, item_type));
                }
            } else {
                let value = coerce_query_value(&raw, schema.and_then(json_type));
                args.insert(key.into_owned(), value);
            }
        }
        Ok((tool, args))
    }

    /// Execute a resource-kind operation and return its body as text.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve_resource_uri`] and [`Self::call_tool`].
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        let (tool, args) = self.resolve_resource_uri(uri)?;
        match self.invoke(tool, &args).await? {
            ToolResponse::Json(body) => Ok(render_text(&body)),
            ToolResponse::Image { bytes, mime_type } => Ok(json!({
                "encoding": "base64",
                "mimeType": mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(bytes),
            })
            .to_string()),
        }
    }

    fn url_for(&self, path: &str, query: &[QueryPair]) -> Result<Url> {
        let joined = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&joined)
            .map_err(|e| OpenApiToolsError::Runtime(format!("Invalid URL: {e}")))?;
        if !query.is_empty() {
            url.set_query(Some(&encode_pairs(query)));
        }
        self.policy.check_url(&url)?;
        Ok(url)
    }

    /// Default headers, then per-call headers, then credentials and the timeout.
    fn decorate(
        &self,
        mut request: reqwest::RequestBuilder,
        headers: Vec<(String, String)>,
    ) -> reqwest::RequestBuilder {
        request = self.config.defaults.apply_headers(request);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        for auth in &self.config.auth {
            request = auth.apply(request);
        }
        if let Some(timeout) = self.config.defaults.effective_timeout(self.default_timeout) {
            request = request.timeout(timeout);
        }
        request
    }

    async fn read_response(&self, response: reqwest::Response) -> Result<ToolResponse> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = self.policy.read_body(response).await?;

        if status.is_success() && is_image(content_type.as_deref()) {
            let mime_type = content_type.unwrap_or_else(|| "image/*".to_string());
            return Ok(ToolResponse::Image { bytes, mime_type });
        }

        let body = decode_body(&bytes, content_type.as_deref());
        if status.is_success() {
            return Ok(ToolResponse::Json(body));
        }

        let reason = status.canonical_reason().unwrap_or("Unknown");
        Err(OpenApiToolsError::Http(format!(
            "API returned {} {reason}: {}",
            status.as_u16(),
            render_text(&body)
        )))
    }
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.parse::<Mime>().ok())
        .is_some_and(|m| m.type_() == mime::IMAGE)
}

/// JSON when it parses, text when it is UTF-8, otherwise a base64 envelope.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
        Err(_) => json!({
            "encoding": "base64",
            "mimeType": content_type,
            "data": base64::engine::general_purpose::STANDARD.encode(bytes),
        }),
    }
}

fn render_text(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_query_value(raw: &str, ty: Option<&str>) -> Value {
    let parsed = match ty {
        Some("integer") => raw.parse::<i64>().ok().map(Value::from),
        Some("number") => raw.parse::<f64>().ok().map(Value::from),
        Some("boolean") => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn build_request_parts(tool: &GeneratedTool, arguments: &Map<String, Value>) -> Result<RequestParts> {
    let mut path = tool.path.clone();
    let mut query = Vec::new();
    let mut headers = Vec::new();
    let mut fields = Map::new();
    let mut whole_body = None;

    for param in &tool.parameters {
        let Some(value) = arguments.get(&param.arg).filter(|v| !v.is_null()) else {
            if param.required {
                return Err(OpenApiToolsError::Runtime(format!(
                    "Missing required parameter: {}",
                    param.arg
                )));
            }
            continue;
        };

        match &param.location {
            ParamLocation::Path => {
                let encoded = encode_component(&value_to_string(value), false);
                path = path.replace(&format!("{{{}}}", param.wire), &encoded);
            }
            ParamLocation::Query(ser) => {
                query.extend(serialize_param(&param.wire, value, param.required, ser));
            }
            ParamLocation::Header => headers.push((param.wire.clone(), value_to_string(value))),
            ParamLocation::BodyField => {
                fields.insert(param.wire.clone(), value.clone());
            }
            ParamLocation::Body => whole_body = Some(value.clone()),
        }
    }

    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    let body = whole_body.or_else(|| (!fields.is_empty()).then_some(Value::Object(fields)));

    Ok(RequestParts {
        path,
        query,
        headers,
        body,
    })
}

/// Explicit base URL, else the first server entry with variables substituted. Relative server
/// URLs are only accepted when the spec itself was loaded from a URL.
fn resolve_base_url(explicit: Option<&str>, loaded: &LoadedSpec) -> Result<String> {
    let raw = match explicit {
        Some(url) => url.to_string(),
        None => {
            let server = loaded.spec.servers.first().ok_or_else(|| {
                OpenApiToolsError::Config(
                    "No base URL configured and none found in spec".to_string(),
                )
            })?;
            let mut url = server.url.clone();
            for (name, var) in server.variables.iter().flatten() {
                url = url.replace(&format!("{{{name}}}"), &var.default);
            }
            url
        }
    };

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Ok(raw);
    }
    match loaded.doc_id.as_url() {
        Some(spec_url) => spec_url.join(&raw).map(String::from).map_err(|e| {
            OpenApiToolsError::Config(format!("Invalid base URL '{raw}': {e} (set baseUrl)"))
        }),
        None => Err(OpenApiToolsError::Config(format!(
            "Invalid base URL '{raw}': must be an absolute http(s) URL (set baseUrl)"
        ))),
    }
}

fn http_method(method: &str) -> Result<Method> {
    match method {
        "get" => Ok(Method::GET),
        "put" => Ok(Method::PUT),
        "post" => Ok(Method::POST),
        "delete" => Ok(Method::DELETE),
        "patch" => Ok(Method::PATCH),
        other => Err(OpenApiToolsError::Runtime(format!(
            "Unsupported HTTP method: {other}"
        ))),
    }
}

fn operations(item: &PathItem) -> [(&'static str, Option<&Operation>); 5] {
    [
        ("get", item.get.as_ref()),
        ("put", item.put.as_ref()),
        ("post", item.post.as_ref()),
        ("delete", item.delete.as_ref()),
        ("patch", item.patch.as_ref()),
    ]
}

fn merge_tags(operation_tags: &[String], global: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    operation_tags
        .iter()
        .chain(global)
        .filter(|t| seen.insert(t.trim().to_lowercase()))
        .cloned()
        .collect()
}

/// `application/json` first, then any other JSON media type.
fn json_media<'a, I>(content: I) -> Option<&'a MediaType>
where
    I: IntoIterator<Item = (&'a String, &'a MediaType)>,
{
    let entries: Vec<(&String, &MediaType)> = content.into_iter().collect();
    entries
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("application/json"))
        .or_else(|| entries.iter().find(|(k, _)| k.to_ascii_lowercase().contains("json")))
        .map(|(_, v)| *v)
}

struct OperationInput<'a> {
    doc: &'a DocId,
    path_params: &'a [ReferenceOr<Parameter>],
    path: &'a str,
    method: &'static str,
    op: &'a Operation,
}

struct Discovery<'a> {
    config: &'a ApiSourceConfig,
    routes: &'a RouteTable,
    resolver: SpecResolver<'a>,
    names: HashSet<String>,
}

impl Discovery<'_> {
    async fn run(mut self, loaded: &LoadedSpec) -> Vec<GeneratedTool> {
        let mut tools = Vec::new();

        for (path, item) in &loaded.spec.paths.paths {
            let (item_doc, item) = match self.resolver.resolve(&loaded.doc_id, item).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "skipping path");
                    continue;
                }
            };

            for (method, op) in operations(&item) {
                let Some(op) = op else { continue };
                let tags = merge_tags(&op.tags, &self.config.global_tags);
                let kind = self.routes.classify(method, path, &tags);
                if kind == RouteKind::Exclude {
                    tracing::debug!(method, path = %path, "operation excluded by route map");
                    continue;
                }

                let input = OperationInput {
                    doc: &item_doc,
                    path_params: &item.parameters,
                    path,
                    method,
                    op,
                };
                match self.generate(&input, tags, kind).await {
                    Ok(tool) => tools.push(tool),
                    Err(e) => tracing::warn!(
                        method = %method.to_uppercase(),
                        path = %path,
                        error = %e,
                        "skipping operation"
                    ),
                }
            }
        }

        tools
    }

    async fn generate(
        &mut self,
        input: &OperationInput<'_>,
        tags: Vec<String>,
        kind: RouteKind,
    ) -> Result<GeneratedTool> {
        let op = input.op;
        let method = http_method(input.method)?;
        let parameters = self.collect_parameters(input).await?;
        let output_schema = self
            .response_schema(input.doc, op)
            .await?
            .as_ref()
            .map(wrap_body_output_schema)
            .transpose()?;

        let args: Vec<ArgSchema<'_>> = parameters
            .iter()
            .map(|p| ArgSchema {
                name: &p.arg,
                required: p.required,
                schema: &p.schema,
            })
            .collect();
        let input_schema = build_input_schema(&args);

        let base = self
            .config
            .name_style
            .tool_name(op.operation_id.as_deref(), input.method, input.path);
        let name = reserve_unique(&mut self.names, &base);
        if name != base {
            tracing::warn!(tool = %base, renamed = %name, "duplicate tool name");
        }

        let description = op
            .summary
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| op.description.clone())
            .unwrap_or_else(|| format!("Calls {} {}", input.method.to_uppercase(), input.path));

        Ok(GeneratedTool {
            name,
            title: op.summary.clone(),
            description,
            method,
            path: input.path.to_string(),
            parameters,
            input_schema,
            output_schema,
            tags,
            kind,
        })
    }

    async fn collect_parameters(&self, input: &OperationInput<'_>) -> Result<Vec<ToolParameter>> {
        let merged = self
            .merge_parameters(input.doc, input.path_params, &input.op.parameters)
            .await?;

        let mut params = Vec::with_capacity(merged.len());
        let mut seen: HashSet<String> = HashSet::new();
        for (doc, p) in &merged {
            let param = self.parameter(doc, p).await?;
            if !seen.insert(param.arg.clone()) {
                return Err(OpenApiToolsError::ParamCollision(format!(
                    "'{}' appears more than once in {} {}",
                    param.arg,
                    input.method.to_uppercase(),
                    input.path
                )));
            }
            params.push(param);
        }

        if let Some(body_ref) = &input.op.request_body {
            let (body_doc, body) = self.resolver.resolve(input.doc, body_ref).await?;
            for field in self.body_parameters(&body_doc, &body).await? {
                if !seen.insert(field.arg.clone()) {
                    return Err(OpenApiToolsError::ParamCollision(format!(
                        "body field '{}' collides with a parameter in {} {}",
                        field.arg,
                        input.method.to_uppercase(),
                        input.path
                    )));
                }
                params.push(field);
            }
        }

        Ok(params)
    }

    /// Path-item parameters overridden by operation parameters with the same location + name.
    async fn merge_parameters(
        &self,
        doc: &DocId,
        path_params: &[ReferenceOr<Parameter>],
        op_params: &[ReferenceOr<Parameter>],
    ) -> Result<Vec<(DocId, Parameter)>> {
        fn key(p: &Parameter) -> (&'static str, String) {
            let (loc, data) = match p {
                Parameter::Path { parameter_data, .. } => ("path", parameter_data),
                Parameter::Query { parameter_data, .. } => ("query", parameter_data),
                Parameter::Header { parameter_data, .. } => ("header", parameter_data),
                Parameter::Cookie { parameter_data, .. } => ("cookie", parameter_data),
            };
            (loc, data.name.clone())
        }

        let mut merged: Vec<(DocId, Parameter)> = Vec::new();
        let mut index: HashMap<(&'static str, String), usize> = HashMap::new();
        for p in path_params.iter().chain(op_params) {
            let resolved = self.resolver.resolve(doc, p).await?;
            match index.get(&key(&resolved.1)) {
                Some(&i) => merged[i] = resolved,
                None => {
                    index.insert(key(&resolved.1), merged.len());
                    merged.push(resolved);
                }
            }
        }
        Ok(merged)
    }

    async fn parameter(&self, doc: &DocId, param: &Parameter) -> Result<ToolParameter> {
        let (data, location) = match param {
            Parameter::Path { parameter_data, .. } => (parameter_data, ParamLocation::Path),
            Parameter::Query {
                parameter_data,
                style,
                allow_reserved,
                allow_empty_value,
            } => {
                let mut ser = QuerySerialization::new(style.clone(), parameter_data.explode);
                ser.allow_reserved = *allow_reserved;
                ser.allow_empty_value = allow_empty_value.unwrap_or(false);
                (parameter_data, ParamLocation::Query(ser))
            }
            Parameter::Header { parameter_data, .. } => (parameter_data, ParamLocation::Header),
            Parameter::Cookie { parameter_data, .. } => {
                return Err(OpenApiToolsError::OpenApi(format!(
                    "cookie parameter '{}' is not supported",
                    parameter_data.name
                )));
            }
        };

        let mut schema = match &data.format {
            ParameterSchemaOrContent::Schema(r) => self.schema_value(doc, r).await,
            ParameterSchemaOrContent::Content(_) => json!({ "type": "string" }),
        };
        if let Some(obj) = schema.as_object_mut()
            && !obj.contains_key("description")
            && let Some(desc) = &data.description
        {
            obj.insert("description".to_string(), Value::String(desc.clone()));
        }

        Ok(ToolParameter {
            arg: data.name.clone(),
            wire: data.name.clone(),
            required: data.required || location == ParamLocation::Path,
            location,
            schema,
        })
    }

    /// Inline referenced schemas; keep the `$ref` when it cannot be resolved.
    async fn schema_value<T>(&self, doc: &DocId, r: &ReferenceOr<T>) -> Value
    where
        T: Clone + serde::de::DeserializeOwned + Borrow<Schema>,
    {
        match r {
            ReferenceOr::Item(s) => schema_to_json(s.borrow()),
            ReferenceOr::Reference { reference } => match self.resolver.resolve(doc, r).await {
                Ok((_, s)) => schema_to_json(s.borrow()),
                Err(e) => {
                    tracing::debug!(reference = %reference, error = %e, "keeping unresolved $ref");
                    json!({ "$ref": reference })
                }
            },
        }
    }

    /// Object bodies are flattened into one argument per property; anything else becomes a
    /// single `body` argument. Non-JSON bodies are not exposed.
    async fn body_parameters(&self, doc: &DocId, body: &RequestBody) -> Result<Vec<ToolParameter>> {
        let Some(schema_ref) = json_media(&body.content).and_then(|m| m.schema.as_ref()) else {
            return Ok(Vec::new());
        };
        let (schema_doc, schema) = self.resolver.resolve(doc, schema_ref).await?;

        if let SchemaKind::Type(Type::Object(obj)) = &schema.schema_kind
            && !obj.properties.is_empty()
        {
            let mut fields = Vec::with_capacity(obj.properties.len());
            for (name, prop) in &obj.properties {
                fields.push(ToolParameter {
                    arg: name.clone(),
                    wire: name.clone(),
                    location: ParamLocation::BodyField,
                    // Without a required body, no single field can be required.
                    required: body.required && obj.required.contains(name),
                    schema: self.schema_value(&schema_doc, prop).await,
                });
            }
            return Ok(fields);
        }

        Ok(vec![ToolParameter {
            arg: "body".to_string(),
            wire: "body".to_string(),
            location: ParamLocation::Body,
            required: body.required,
            schema: schema_to_json(&schema),
        }])
    }

    /// Schema of the first JSON 2xx response (explicit codes before the `2XX` range).
    async fn response_schema(&self, doc: &DocId, op: &Operation) -> Result<Option<Value>> {
        let mut explicit: Vec<(u16, _)> = op
            .responses
            .responses
            .iter()
            .filter_map(|(code, r)| match code {
                StatusCode::Code(n) if (200..300).contains(n) => Some((*n, r)),
                _ => None,
            })
            .collect();
        explicit.sort_by_key(|(n, _)| *n);

        let chosen = explicit.first().map(|(_, r)| *r).or_else(|| {
            op.responses
                .responses
                .iter()
                .find(|(code, _)| matches!(code, StatusCode::Range(2)))
                .map(|(_, r)| r)
        });
        let Some(response_ref) = chosen else {
            return Ok(None);
        };

        let (resp_doc, response) = self.resolver.resolve(doc, response_ref).await?;
        let Some(schema_ref) = json_media(&response.content).and_then(|m| m.schema.as_ref()) else {
            return Ok(None);
        };
        Ok(Some(self.schema_value(&resp_doc, schema_ref).await))
    }
}
