use crate::naming::NameStyle;
use crate::routes::RouteMapConfig;
use helix_http_tools::config::{AuthConfig, EndpointDefaults};
use serde::{Deserialize, Serialize};

/// Configuration for an OpenAPI-based tool source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSourceConfig {
    /// Spec location (file path, `file://` URL or `http(s)` URL).
    pub spec: String,

    /// Expected `sha256:<hex>` digest of the raw spec.
    #[serde(default)]
    pub spec_hash: Option<String>,

    #[serde(default)]
    pub spec_hash_policy: HashPolicy,

    /// Overrides `servers[0].url` from the spec.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Credentials applied to every request, in order.
    #[serde(default)]
    pub auth: Vec<AuthConfig>,

    #[serde(default)]
    pub defaults: EndpointDefaults,

    #[serde(default)]
    pub name_style: NameStyle,

    /// Tags added to every generated tool.
    #[serde(default)]
    pub global_tags: Vec<String>,

    #[serde(default)]
    pub route_maps: Vec<RouteMapConfig>,

    /// URI scheme for resource-kind operations (`<scheme>://operation/<name>`).
    #[serde(default = "default_resource_scheme")]
    pub resource_scheme: String,
}

fn default_resource_scheme() -> String {
    "openapi".to_string()
}

impl ApiSourceConfig {
    #[must_use]
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            spec_hash: None,
            spec_hash_policy: HashPolicy::default(),
            base_url: None,
            auth: Vec::new(),
            defaults: EndpointDefaults::default(),
            name_style: NameStyle::default(),
            global_tags: Vec::new(),
            route_maps: Vec::new(),
            resource_scheme: default_resource_scheme(),
        }
    }
}

/// Hash verification policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Log a warning on mismatch.
    #[default]
    Warn,
    /// Fail startup on mismatch.
    Fail,
    Ignore,
}
