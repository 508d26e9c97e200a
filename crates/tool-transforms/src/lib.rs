//! Tool surface transforms.
//!
//! A [`TransformPipeline`] is a static table keyed by the *original* tool name (as generated from
//! the API description). It changes what clients see (names, descriptions, argument names,
//! hidden arguments) and maps calls back so the underlying endpoint receives its own parameter
//! names.
//!
//! Keying by the original name keeps enablement and tag filtering independent of renames.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Named values available when filling arguments (e.g. `token.user_id`).
pub type CallContext = Map<String, Value>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransformError {
    #[error("tools '{first}' and '{second}' are both renamed to '{name}'")]
    DuplicateToolName {
        name: String,
        first: String,
        second: String,
    },
    #[error("tool '{tool}': arguments '{first}' and '{second}' are both exposed as '{name}'")]
    DuplicateParamName {
        tool: String,
        name: String,
        first: String,
        second: String,
    },
    #[error("tool '{tool}': argument '{param}' needs '{key}', which is not available")]
    MissingContext {
        tool: String,
        param: String,
        key: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransformPipeline {
    #[serde(default)]
    pub tool_overrides: HashMap<String, ToolOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `Some(false)` removes the tool from the surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Extra `_meta` entries for the exposed tool.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    /// Per-argument overrides keyed by the original argument name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, ParamOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParamOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Static value used when the caller omits the argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// [`CallContext`] key used when the caller omits the argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_from: Option<String>,
    /// Remove the argument from the exposed schema. Caller-provided values are ignored.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hide: bool,
}

impl ParamOverride {
    fn exposed_name<'a>(&'a self, original: &'a str) -> &'a str {
        self.rename.as_deref().unwrap_or(original)
    }

    fn has_fallback(&self) -> bool {
        self.default.is_some() || self.default_from.is_some()
    }
}

impl TransformPipeline {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tool_overrides.is_empty()
    }

    /// Overlay `other` on top of `self`; entries in `other` replace whole tool overrides.
    pub fn merge(&mut self, other: TransformPipeline) {
        self.tool_overrides.extend(other.tool_overrides);
    }

    /// Check the table for collisions that would make routing ambiguous.
    ///
    /// # Errors
    ///
    /// Returns an error if two tools are renamed to the same name, or if two arguments of one
    /// tool end up with the same exposed name.
    pub fn validate(&self) -> Result<(), TransformError> {
        let mut renamed: HashMap<&str, &str> = HashMap::new();
        let mut originals: Vec<&String> = self.tool_overrides.keys().collect();
        originals.sort();

        for original in originals {
            let ovr = &self.tool_overrides[original];
            if let Some(name) = ovr.rename.as_deref()
                && let Some(first) = renamed.insert(name, original)
            {
                return Err(TransformError::DuplicateToolName {
                    name: name.to_string(),
                    first: first.to_string(),
                    second: original.clone(),
                });
            }

            let mut exposed: HashMap<&str, &str> = HashMap::new();
            let mut params: Vec<&String> = ovr.params.keys().collect();
            params.sort();
            for param in params {
                let po = &ovr.params[param];
                if po.hide {
                    continue;
                }
                let name = po.exposed_name(param);
                if let Some(first) = exposed.insert(name, param) {
                    return Err(TransformError::DuplicateParamName {
                        tool: original.clone(),
                        name: name.to_string(),
                        first: first.to_string(),
                        second: param.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Check one tool's overrides against its input schema.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::DuplicateParamName`] when an argument is renamed onto a property
    /// the tool already exposes under that name.
    pub fn validate_schema(&self, original: &str, schema: &Value) -> Result<(), TransformError> {
        let Some(ovr) = self.tool_overrides.get(original) else {
            return Ok(());
        };
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };

        let mut params: Vec<&String> = ovr.params.keys().collect();
        params.sort();
        for param in params {
            let po = &ovr.params[param];
            if po.hide || !properties.contains_key(param) {
                continue;
            }
            let name = po.exposed_name(param);
            // Overridden properties are detached before renames, so only untouched ones clash.
            if name != param.as_str()
                && properties.contains_key(name)
                && !ovr.params.contains_key(name)
            {
                return Err(TransformError::DuplicateParamName {
                    tool: original.to_string(),
                    name: name.to_string(),
                    first: name.to_string(),
                    second: param.clone(),
                });
            }
        }
        Ok(())
    }

    /// The name clients see for `original`.
    #[must_use]
    pub fn exposed_tool_name<'a>(&'a self, original: &'a str) -> &'a str {
        self.tool_overrides
            .get(original)
            .and_then(|o| o.rename.as_deref())
            .unwrap_or(original)
    }

    #[must_use]
    pub fn is_enabled(&self, original: &str) -> bool {
        self.tool_overrides
            .get(original)
            .and_then(|o| o.enabled)
            .unwrap_or(true)
    }

    #[must_use]
    pub fn description_for(&self, original: &str) -> Option<&str> {
        self.tool_overrides
            .get(original)?
            .description
            .as_deref()
    }

    #[must_use]
    pub fn meta_for(&self, original: &str) -> Option<&Map<String, Value>> {
        self.tool_overrides
            .get(original)
            .map(|o| &o.meta)
            .filter(|m| !m.is_empty())
    }

    /// Context keys a call to `original` may need.
    #[must_use]
    pub fn required_context(&self, original: &str) -> Vec<&str> {
        let Some(ovr) = self.tool_overrides.get(original) else {
            return Vec::new();
        };
        let mut keys: Vec<&str> = ovr
            .params
            .values()
            .filter_map(|p| p.default_from.as_deref())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Rewrite a tool input schema (`{"type":"object","properties":...,"required":[...]}`) to the
    /// exposed surface.
    pub fn apply_schema_transforms(&self, original: &str, schema: &mut Value) {
        let Some(ovr) = self.tool_overrides.get(original) else {
            return;
        };
        if ovr.params.is_empty() {
            return;
        }
        let Some(obj) = schema.as_object_mut() else {
            return;
        };

        let mut properties = match obj.remove("properties") {
            Some(Value::Object(p)) => p,
            _ => Map::new(),
        };
        let mut required: Vec<String> = obj
            .remove("required")
            .and_then(|r| serde_json::from_value(r).ok())
            .unwrap_or_default();

        // Detach every overridden property first so renames can swap names safely.
        let mut detached: Vec<(&str, &ParamOverride, Option<Value>, bool)> = ovr
            .params
            .iter()
            .map(|(name, po)| {
                let was_required = required.iter().any(|r| r == name);
                (name.as_str(), po, properties.remove(name), was_required)
            })
            .collect();
        detached.sort_by(|a, b| a.0.cmp(b.0));
        required.retain(|r| !ovr.params.contains_key(r));

        for (name, po, prop, was_required) in detached {
            // Overrides for arguments the tool does not have are ignored.
            let Some(mut prop) = prop else { continue };
            if po.hide {
                continue;
            }

            if let Some(p) = prop.as_object_mut() {
                if let Some(desc) = &po.description {
                    p.insert("description".to_string(), Value::String(desc.clone()));
                }
                if let Some(default) = &po.default {
                    p.insert("default".to_string(), default.clone());
                }
            }

            let exposed = po.exposed_name(name).to_string();
            if was_required && !po.has_fallback() {
                required.push(exposed.clone());
            }
            properties.insert(exposed, prop);
        }

        obj.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            obj.insert(
                "required".to_string(),
                Value::Array(required.into_iter().map(Value::String).collect()),
            );
        }
    }

    /// Map exposed call arguments back to the original tool's arguments.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::MissingContext`] when a hidden argument must be filled from a
    /// context key that `context` does not provide.
    pub fn apply_call_transforms(
        &self,
        original: &str,
        args: &mut Map<String, Value>,
        context: &CallContext,
    ) -> Result<(), TransformError> {
        let Some(ovr) = self.tool_overrides.get(original) else {
            return Ok(());
        };
        if ovr.params.is_empty() {
            return Ok(());
        }

        let mut reverse: HashMap<&str, &str> = HashMap::new();
        let mut hidden: HashSet<&str> = HashSet::new();
        for (name, po) in &ovr.params {
            if po.hide {
                hidden.insert(name.as_str());
                hidden.insert(po.exposed_name(name));
            } else if let Some(exposed) = po.rename.as_deref() {
                reverse.insert(exposed, name.as_str());
            }
        }

        let mut out = Map::new();
        for (key, value) in std::mem::take(args) {
            if let Some(target) = reverse.get(key.as_str()) {
                out.insert((*target).to_string(), value);
            } else if hidden.contains(key.as_str()) {
                continue;
            } else {
                out.entry(key).or_insert(value);
            }
        }

        let mut names: Vec<&String> = ovr.params.keys().collect();
        names.sort();
        for name in names {
            let po = &ovr.params[name];
            if out.get(name).is_some_and(|v| !v.is_null()) {
                continue;
            }
            if let Some(default) = &po.default {
                out.insert(name.clone(), default.clone());
            } else if let Some(key) = &po.default_from {
                match context.get(key) {
                    Some(v) => {
                        out.insert(name.clone(), v.clone());
                    }
                    None if po.hide => {
                        return Err(TransformError::MissingContext {
                            tool: original.to_string(),
                            param: name.clone(),
                            key: key.clone(),
                        });
                    }
                    None => {}
                }
            }
        }

        *args = out;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users_pipeline() -> TransformPipeline {
        TransformPipeline {
            tool_overrides: HashMap::from([(
                "get_users".to_string(),
                ToolOverride {
                    rename: Some("find_twitch_users".to_string()),
                    description: Some("Find users".to_string()),
                    params: HashMap::from([
                        (
                            "login".to_string(),
                            ParamOverride {
                                rename: Some("usernames".to_string()),
                                description: Some("Logins".to_string()),
                                ..Default::default()
                            },
                        ),
                        (
                            "id".to_string(),
                            ParamOverride {
                                rename: Some("user_ids".to_string()),
                                ..Default::default()
                            },
                        ),
                    ]),
                    ..Default::default()
                },
            )]),
        }
    }

    fn ban_pipeline() -> TransformPipeline {
        TransformPipeline {
            tool_overrides: HashMap::from([(
                "ban_user".to_string(),
                ToolOverride {
                    rename: Some("moderate_ban_user".to_string()),
                    params: HashMap::from([
                        (
                            "broadcaster_id".to_string(),
                            ParamOverride {
                                rename: Some("channel_id".to_string()),
                                ..Default::default()
                            },
                        ),
                        (
                            "moderator_id".to_string(),
                            ParamOverride {
                                hide: true,
                                default_from: Some("token.user_id".to_string()),
                                ..Default::default()
                            },
                        ),
                    ]),
                    ..Default::default()
                },
            )]),
        }
    }

    #[test]
    fn exposed_names_and_descriptions() {
        let p = users_pipeline();
        assert_eq!(p.exposed_tool_name("get_users"), "find_twitch_users");
        assert_eq!(p.exposed_tool_name("get_streams"), "get_streams");
        assert_eq!(p.description_for("get_users"), Some("Find users"));
    }

    #[test]
    fn schema_renames_properties_and_required() {
        let p = users_pipeline();
        let mut schema = json!({
            "type": "object",
            "properties": {
                "login": { "type": "array", "items": { "type": "string" } },
                "id": { "type": "array", "items": { "type": "string" } },
                "first": { "type": "integer" }
            },
            "required": ["login", "first"]
        });
        p.apply_schema_transforms("get_users", &mut schema);

        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("usernames"));
        assert!(props.contains_key("user_ids"));
        assert!(props.contains_key("first"));
        assert!(!props.contains_key("login"));
        assert_eq!(props["usernames"]["description"], json!("Logins"));

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"usernames"));
        assert!(required.contains(&"first"));
        assert!(!required.contains(&"login"));
    }

    #[test]
    fn schema_hides_arguments() {
        let p = ban_pipeline();
        let mut schema = json!({
            "type": "object",
            "properties": {
                "broadcaster_id": { "type": "string" },
                "moderator_id": { "type": "string" },
                "data": { "type": "object" }
            },
            "required": ["broadcaster_id", "moderator_id", "data"]
        });
        p.apply_schema_transforms("ban_user", &mut schema);

        let props = schema["properties"].as_object().unwrap();
        assert!(!props.contains_key("moderator_id"));
        assert!(props.contains_key("channel_id"));
        let required = schema["required"].as_array().unwrap();
        assert!(!required.contains(&json!("moderator_id")));
        assert!(required.contains(&json!("channel_id")));
    }

    #[test]
    fn call_maps_renamed_arguments_back() {
        let p = users_pipeline();
        let mut args = json!({ "usernames": ["ninja"], "first": 5 })
            .as_object()
            .cloned()
            .unwrap();
        p.apply_call_transforms("get_users", &mut args, &CallContext::new())
            .unwrap();
        assert_eq!(args.get("login"), Some(&json!(["ninja"])));
        assert_eq!(args.get("first"), Some(&json!(5)));
        assert!(!args.contains_key("usernames"));
    }

    #[test]
    fn call_accepts_original_argument_names() {
        let p = users_pipeline();
        let mut args = json!({ "login": ["shroud"] }).as_object().cloned().unwrap();
        p.apply_call_transforms("get_users", &mut args, &CallContext::new())
            .unwrap();
        assert_eq!(args.get("login"), Some(&json!(["shroud"])));
    }

    #[test]
    fn hidden_argument_is_filled_from_context_and_caller_value_ignored() {
        let p = ban_pipeline();
        let mut args = json!({ "channel_id": "123", "moderator_id": "spoofed" })
            .as_object()
            .cloned()
            .unwrap();
        let ctx = json!({ "token.user_id": "999" }).as_object().cloned().unwrap();
        p.apply_call_transforms("ban_user", &mut args, &ctx).unwrap();
        assert_eq!(args.get("broadcaster_id"), Some(&json!("123")));
        assert_eq!(args.get("moderator_id"), Some(&json!("999")));
        assert_eq!(p.required_context("ban_user"), vec!["token.user_id"]);
    }

    #[test]
    fn hidden_argument_without_context_is_an_error() {
        let p = ban_pipeline();
        let mut args = json!({ "channel_id": "123" }).as_object().cloned().unwrap();
        let err = p
            .apply_call_transforms("ban_user", &mut args, &CallContext::new())
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::MissingContext {
                tool: "ban_user".to_string(),
                param: "moderator_id".to_string(),
                key: "token.user_id".to_string(),
            }
        );
    }

    #[test]
    fn static_default_fills_missing_argument() {
        let p = TransformPipeline {
            tool_overrides: HashMap::from([(
                "get_streams".to_string(),
                ToolOverride {
                    params: HashMap::from([(
                        "first".to_string(),
                        ParamOverride {
                            default: Some(json!(20)),
                            ..Default::default()
                        },
                    )]),
                    ..Default::default()
                },
            )]),
        };
        let mut args = Map::new();
        p.apply_call_transforms("get_streams", &mut args, &CallContext::new())
            .unwrap();
        assert_eq!(args.get("first"), Some(&json!(20)));

        let mut schema = json!({
            "type": "object",
            "properties": { "first": { "type": "integer" } },
            "required": ["first"]
        });
        p.apply_schema_transforms("get_streams", &mut schema);
        assert_eq!(schema["properties"]["first"]["default"], json!(20));
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn swapped_argument_names_route_correctly() {
        let p = TransformPipeline {
            tool_overrides: HashMap::from([(
                "t".to_string(),
                ToolOverride {
                    params: HashMap::from([
                        (
                            "a".to_string(),
                            ParamOverride {
                                rename: Some("b".to_string()),
                                ..Default::default()
                            },
                        ),
                        (
                            "b".to_string(),
                            ParamOverride {
                                rename: Some("a".to_string()),
                                ..Default::default()
                            },
                        ),
                    ]),
                    ..Default::default()
                },
            )]),
        };
        let mut args = json!({ "a": 1, "b": 2 }).as_object().cloned().unwrap();
        p.apply_call_transforms("t", &mut args, &CallContext::new())
            .unwrap();
        assert_eq!(args.get("a"), Some(&json!(2)));
        assert_eq!(args.get("b"), Some(&json!(1)));
    }

    #[test]
    fn validate_rejects_duplicate_tool_renames() {
        let p = TransformPipeline {
            tool_overrides: HashMap::from([
                (
                    "a".to_string(),
                    ToolOverride {
                        rename: Some("same".to_string()),
                        ..Default::default()
                    },
                ),
                (
                    "b".to_string(),
                    ToolOverride {
                        rename: Some("same".to_string()),
                        ..Default::default()
                    },
                ),
            ]),
        };
        assert!(matches!(
            p.validate(),
            Err(TransformError::DuplicateToolName { .. })
        ));
        assert!(users_pipeline().validate().is_ok());
    }

    #[test]
    fn validate_schema_rejects_a_rename_onto_an_existing_argument() {
        let p = TransformPipeline {
            tool_overrides: HashMap::from([(
                "get_users".to_string(),
                ToolOverride {
                    params: HashMap::from([(
                        "login".to_string(),
                        ParamOverride {
                            rename: Some("id".to_string()),
                            ..Default::default()
                        },
                    )]),
                    ..Default::default()
                },
            )]),
        };
        assert!(p.validate().is_ok());

        let schema = json!({
            "type": "object",
            "properties": { "id": { "type": "array" }, "login": { "type": "array" } }
        });
        assert_eq!(
            p.validate_schema("get_users", &schema),
            Err(TransformError::DuplicateParamName {
                tool: "get_users".to_string(),
                name: "id".to_string(),
                first: "id".to_string(),
                second: "login".to_string(),
            })
        );

        let without_id = json!({ "type": "object", "properties": { "login": { "type": "array" } } });
        assert!(p.validate_schema("get_users", &without_id).is_ok());
        assert!(users_pipeline().validate_schema("get_users", &schema).is_ok());
    }

    #[test]
    fn disabled_tools_and_yaml_shape() {
        let yaml = r"
toolOverrides:
  get_users:
    rename: find_users
    enabled: false
    meta:
      category: users
    params:
      login:
        rename: usernames
      moderator_id:
        hide: true
        defaultFrom: token.user_id
";
        let p: TransformPipeline = serde_yaml::from_str(yaml).unwrap();
        assert!(!p.is_enabled("get_users"));
        assert!(p.is_enabled("get_streams"));
        assert_eq!(
            p.meta_for("get_users").and_then(|m| m.get("category")),
            Some(&json!("users"))
        );
        let po = &p.tool_overrides["get_users"].params["moderator_id"];
        assert!(po.hide);
        assert_eq!(po.default_from.as_deref(), Some("token.user_id"));
    }
}
