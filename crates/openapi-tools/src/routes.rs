//! Route maps: classify operations as tools, resources, or excluded.
//!
//! Rules are checked in order and the first match wins. Operations that match no rule are
//! exposed as tools.

use crate::error::{OpenApiToolsError, Result};
use crate::filter::normalize_tag;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    #[default]
    Tool,
    Resource,
    Exclude,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteMapConfig {
    /// HTTP methods this rule applies to. Empty (or `*`) matches any method.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Regex matched against the path template (e.g. `^/search/.*`).
    #[serde(default)]
    pub pattern: Option<String>,
    /// The operation must carry all of these tags.
    #[serde(default)]
    pub tags: Vec<String>,
    pub kind: RouteKind,
}

impl RouteMapConfig {
    #[must_use]
    pub fn get_pattern(pattern: &str, kind: RouteKind) -> Self {
        Self {
            methods: vec!["GET".to_string()],
            pattern: Some(pattern.to_string()),
            tags: Vec::new(),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
struct RouteMap {
    methods: BTreeSet<String>,
    pattern: Option<Regex>,
    tags: BTreeSet<String>,
    kind: RouteKind,
}

impl RouteMap {
    fn compile(idx: usize, cfg: &RouteMapConfig) -> Result<Self> {
        let pattern = cfg
            .pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    OpenApiToolsError::Config(format!("routeMaps[{idx}].pattern '{p}': {e}"))
                })
            })
            .transpose()?;

        let methods = cfg
            .methods
            .iter()
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty() && m.as_str() != "*")
            .collect();

        Ok(Self {
            methods,
            pattern,
            tags: cfg.tags.iter().map(|t| normalize_tag(t)).collect(),
            kind: cfg.kind,
        })
    }

    fn matches(&self, method: &str, path: &str, tags: &BTreeSet<String>) -> bool {
        if !self.methods.is_empty() && !self.methods.contains(&method.to_ascii_uppercase()) {
            return false;
        }
        if let Some(re) = &self.pattern
            && !re.is_match(path)
        {
            return false;
        }
        self.tags.is_subset(tags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    maps: Vec<RouteMap>,
}

impl RouteTable {
    /// Compile route map rules.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid regex.
    pub fn compile(configs: &[RouteMapConfig]) -> Result<Self> {
        let maps = configs
            .iter()
            .enumerate()
            .map(|(idx, cfg)| RouteMap::compile(idx, cfg))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { maps })
    }

    pub fn classify<S: AsRef<str>>(&self, method: &str, path: &str, tags: &[S]) -> RouteKind {
        let tags: BTreeSet<String> = tags.iter().map(|t| normalize_tag(t.as_ref())).collect();
        self.maps
            .iter()
            .find(|m| m.matches(method, path, &tags))
            .map_or(RouteKind::Tool, |m| m.kind)
    }
}
