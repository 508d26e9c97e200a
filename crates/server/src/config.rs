//! Settings resolution: CLI flags over the optional YAML file over built-in defaults.

use crate::cli::{Cli, Transport};
use crate::error::{Result, ServerError};
use crate::twitch;
use helix_http_tools::config::{AuthConfig, EndpointDefaults};
use helix_http_tools::safety::OutboundPolicy;
use helix_openapi_tools::config::{ApiSourceConfig, HashPolicy};
use helix_openapi_tools::filter::parse_tag_list;
use helix_openapi_tools::naming::NameStyle;
use helix_openapi_tools::routes::RouteMapConfig;
use helix_tool_transforms::TransformPipeline;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SPEC: &str = "openapi.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 60;

/// The YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    pub spec: Option<String>,
    pub spec_hash: Option<String>,
    #[serde(default)]
    pub spec_hash_policy: HashPolicy,
    pub base_url: Option<String>,
    /// Extra headers for every upstream request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Per-request timeout; `0` disables it.
    pub timeout_secs: Option<u64>,
    pub startup_timeout_secs: Option<u64>,
    /// Added to the built-in Twitch global tags.
    #[serde(default)]
    pub global_tags: Vec<String>,
    #[serde(default)]
    pub include_tags: Vec<String>,
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    /// Evaluated before the `--expose-resources` preset.
    #[serde(default)]
    pub route_maps: Vec<RouteMapConfig>,
    /// Layered over the built-in Twitch transforms.
    #[serde(default)]
    pub transforms: TransformPipeline,
    #[serde(default)]
    pub name_style: NameStyle,
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    pub max_response_bytes: Option<usize>,
    pub token_validate_url: Option<String>,
}

impl FileConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML for this shape.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    pub source: ApiSourceConfig,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    /// `None` when transformations are disabled.
    pub transforms: Option<TransformPipeline>,
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub default_timeout: Duration,
    pub startup_timeout: Duration,
    pub policy: OutboundPolicy,
    pub token_validate_url: String,
}

impl Settings {
    /// Merge CLI flags with the config file named by `--config`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(cli, file))
    }

    #[must_use]
    pub fn resolve(cli: &Cli, file: FileConfig) -> Self {
        let client_id = non_empty(cli.client_id.clone());
        let access_token = non_empty(cli.access_token.clone());

        let mut global_tags: Vec<String> = twitch::GLOBAL_TAGS.iter().map(|t| (*t).to_string()).collect();
        global_tags.extend(file.global_tags);

        let mut route_maps = file.route_maps;
        if cli.expose_resources {
            route_maps.extend(twitch::resource_route_maps());
        }

        let source = ApiSourceConfig {
            spec: cli
                .spec
                .clone()
                .or(file.spec)
                .unwrap_or_else(|| DEFAULT_SPEC.to_string()),
            spec_hash: file.spec_hash,
            spec_hash_policy: file.spec_hash_policy,
            base_url: Some(
                cli.base_url
                    .clone()
                    .or(file.base_url)
                    .unwrap_or_else(|| twitch::DEFAULT_BASE_URL.to_string()),
            ),
            auth: credentials(client_id.as_deref(), access_token.as_deref()),
            defaults: EndpointDefaults {
                timeout: file.timeout_secs,
                headers: file.headers,
            },
            name_style: file.name_style,
            global_tags,
            route_maps,
            resource_scheme: twitch::RESOURCE_SCHEME.to_string(),
        };

        let transforms = (!cli.no_transformations).then(|| {
            let mut pipeline = twitch::preset_transforms();
            pipeline.merge(file.transforms);
            pipeline
        });

        let include_tags = tag_list(&cli.include_tags, &file.include_tags);
        let exclude_tags = tag_list(&cli.exclude_tags, &file.exclude_tags);

        let mut policy = OutboundPolicy::permissive().with_max_response_bytes(file.max_response_bytes);
        if !file.allowed_hosts.is_empty() {
            policy = policy.with_allowed_hosts(file.allowed_hosts);
        }

        Self {
            client_id,
            access_token,
            source,
            include_tags,
            exclude_tags,
            transforms,
            transport: cli.transport,
            host: cli.host.clone(),
            port: cli.port,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            startup_timeout: Duration::from_secs(
                file.startup_timeout_secs.unwrap_or(DEFAULT_STARTUP_TIMEOUT_SECS),
            ),
            policy,
            token_validate_url: file
                .token_validate_url
                .unwrap_or_else(|| twitch::TOKEN_VALIDATE_URL.to_string()),
        }
    }

    /// # Errors
    ///
    /// Returns an error when no client id is configured.
    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id.as_deref().ok_or_else(|| {
            ServerError::Config(
                "a Twitch client id is required (--client-id or TWITCH_CLIENT_ID)".to_string(),
            )
        })
    }
}

/// `Client-Id` header plus the bearer token, each when configured.
fn credentials(client_id: Option<&str>, access_token: Option<&str>) -> Vec<AuthConfig> {
    let mut auth = Vec::new();
    if let Some(id) = client_id {
        auth.push(AuthConfig::Header {
            name: "Client-Id".to_string(),
            value: id.to_string(),
        });
    }
    if let Some(token) = access_token {
        auth.push(AuthConfig::Bearer {
            token: token.to_string(),
        });
    }
    auth
}

/// CLI tags replace the file's list when given.
fn tag_list(cli: &[String], file: &[String]) -> Vec<String> {
    if cli.is_empty() {
        parse_tag_list(file)
    } else {
        parse_tag_list(cli)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
