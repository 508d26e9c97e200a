//! Twitch-specific presets: global tags, resource routes, tool transforms and token validation.

use crate::error::{Result, ServerError};
use helix_http_tools::safety::sanitize_reqwest_error;
use helix_openapi_tools::routes::{RouteKind, RouteMapConfig};
use helix_tool_transforms::{CallContext, ParamOverride, ToolOverride, TransformPipeline};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;

pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/helix";
pub const TOKEN_VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";
pub const RESOURCE_SCHEME: &str = "helix";

/// Tags attached to every generated tool.
pub const GLOBAL_TAGS: [&str; 4] = ["twitch", "streaming", "api", "helix"];

/// Context key filled from the validated access token.
pub const CONTEXT_USER_ID: &str = "token.user_id";

/// Read-only search and analytics endpoints as resources.
#[must_use]
pub fn resource_route_maps() -> Vec<RouteMapConfig> {
    vec![
        RouteMapConfig::get_pattern(r"^/search/.*", RouteKind::Resource),
        RouteMapConfig::get_pattern(r"^/analytics/.*", RouteKind::Resource),
    ]
}

fn meta(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn renamed(to: &str, description: &str) -> ParamOverride {
    ParamOverride {
        rename: Some(to.to_string()),
        description: Some(description.to_string()),
        ..Default::default()
    }
}

fn tool(
    rename: &str,
    description: &str,
    meta: Map<String, Value>,
    params: Vec<(&str, ParamOverride)>,
) -> ToolOverride {
    ToolOverride {
        rename: Some(rename.to_string()),
        description: Some(description.to_string()),
        enabled: None,
        meta,
        params: params
            .into_iter()
            .map(|(name, po)| (name.to_string(), po))
            .collect(),
    }
}

/// Friendlier names and argument labels for the most used Helix endpoints.
#[must_use]
pub fn preset_transforms() -> TransformPipeline {
    let mut pipeline = TransformPipeline::default();
    let overrides = &mut pipeline.tool_overrides;

    overrides.insert(
        "get_channel_info".to_string(),
        tool(
            "get_twitch_channel",
            "Get information about a Twitch channel by broadcaster id: title, current game, \
             language and more.",
            meta(&[
                ("category", json!("channels")),
                ("difficulty", json!("easy")),
                ("rate_limit", json!("low")),
            ]),
            vec![(
                "broadcaster_id",
                renamed("streamer_id", "Broadcaster id (look it up with find_twitch_users)"),
            )],
        ),
    );

    overrides.insert(
        "get_users".to_string(),
        tool(
            "find_twitch_users",
            "Find Twitch users by login or id. Several users can be looked up at once.",
            meta(&[
                ("category", json!("users")),
                ("difficulty", json!("easy")),
                ("examples", json!(["ninja", "pokimane", "shroud"])),
            ]),
            vec![
                (
                    "login",
                    renamed("usernames", "User logins, e.g. [\"ninja\", \"pokimane\"]"),
                ),
                ("id", renamed("user_ids", "User ids")),
            ],
        ),
    );

    overrides.insert(
        "get_streams".to_string(),
        tool(
            "get_live_streams",
            "List live streams, optionally filtered by streamer, game or language.",
            meta(&[
                ("category", json!("streams")),
                ("difficulty", json!("easy")),
                ("data_freshness", json!("real-time")),
            ]),
            vec![
                ("user_login", renamed("streamers", "Streamer logins to check")),
                ("game_id", renamed("game_ids", "Game ids to filter by")),
                (
                    "language",
                    renamed("languages", "Stream languages, e.g. [\"en\", \"ru\", \"es\"]"),
                ),
            ],
        ),
    );

    overrides.insert(
        "search_channels".to_string(),
        tool(
            "search_twitch_channels",
            "Search Twitch channels by name or description, optionally only live ones.",
            meta(&[
                ("category", json!("search")),
                ("difficulty", json!("easy")),
                ("use_cases", json!(["discovery", "research"])),
            ]),
            vec![
                (
                    "query",
                    ParamOverride {
                        description: Some(
                            "Search query (channel name or words from its description)".to_string(),
                        ),
                        ..Default::default()
                    },
                ),
                (
                    "live_only",
                    renamed("only_live", "Only return channels that are live right now"),
                ),
            ],
        ),
    );

    overrides.insert(
        "ban_user".to_string(),
        tool(
            "moderate_ban_user",
            "Ban a user from a channel's chat. Requires moderator rights.",
            meta(&[
                ("category", json!("moderation")),
                ("difficulty", json!("advanced")),
                ("requires_auth", json!("moderator")),
                ("destructive", json!(true)),
            ]),
            vec![
                (
                    "broadcaster_id",
                    renamed("channel_id", "Id of the channel to ban the user from"),
                ),
                (
                    "moderator_id",
                    ParamOverride {
                        hide: true,
                        default_from: Some(CONTEXT_USER_ID.to_string()),
                        ..Default::default()
                    },
                ),
            ],
        ),
    );

    pipeline
}

/// Result of `GET /oauth2/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub client_id: Option<String>,
    pub login: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expires_in: Option<u64>,
}

impl TokenInfo {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "valid": true,
            "client_id": self.client_id,
            "login": self.login,
            "user_id": self.user_id,
            "scopes": self.scopes,
            "expires_in": self.expires_in,
        })
    }
}

/// Validates the configured access token once and caches the successful result.
#[derive(Debug)]
pub struct TokenValidator {
    client: reqwest::Client,
    token: Option<String>,
    validate_url: String,
    cache: OnceCell<TokenInfo>,
}

impl TokenValidator {
    #[must_use]
    pub fn new(client: reqwest::Client, token: Option<String>, validate_url: impl Into<String>) -> Self {
        Self {
            client,
            token,
            validate_url: validate_url.into(),
            cache: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Failures are not cached; the next call retries.
    ///
    /// # Errors
    ///
    /// Returns an error without a token, on transport failures, and when the endpoint rejects
    /// the token.
    pub async fn validate(&self) -> Result<&TokenInfo> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ServerError::Token("No access token provided".to_string()))?;

        self.cache
            .get_or_try_init(|| async {
                let resp = self
                    .client
                    .get(&self.validate_url)
                    .header(reqwest::header::AUTHORIZATION, format!("OAuth {token}"))
                    .send()
                    .await
                    .map_err(|e| ServerError::Token(sanitize_reqwest_error(&e)))?;

                let status = resp.status();
                if !status.is_success() {
                    return Err(ServerError::Token(format!(
                        "Token validation failed: {}",
                        status.as_u16()
                    )));
                }
                let info: TokenInfo = resp
                    .json()
                    .await
                    .map_err(|e| ServerError::Token(format!("unexpected validate response: {e}")))?;
                tracing::info!(
                    login = info.login.as_deref().unwrap_or("-"),
                    client_id = info.client_id.as_deref().unwrap_or("-"),
                    "access token validated"
                );
                Ok(info)
            })
            .await
    }

    /// Context values for `defaultFrom`. Empty when the token is missing or invalid.
    pub async fn call_context(&self) -> CallContext {
        let mut ctx = CallContext::new();
        match self.validate().await {
            Ok(info) => {
                if let Some(id) = &info.user_id {
                    ctx.insert(CONTEXT_USER_ID.to_string(), Value::String(id.clone()));
                }
            }
            Err(e) => tracing::debug!(error = %e, "no token context"),
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn spawn_validate(calls: Arc<AtomicUsize>) -> String {
        let app = axum::Router::new().route(
            "/oauth2/validate",
            get(move |headers: HeaderMap| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    if auth == "OAuth good" {
                        (
                            StatusCode::OK,
                            Json(json!({
                                "client_id": "cid",
                                "login": "mod_user",
                                "user_id": "42",
                                "scopes": ["moderator:manage:banned_users"],
                                "expires_in": 3600
                            })),
                        )
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "status": 401, "message": "invalid access token" })),
                        )
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/oauth2/validate")
    }

    #[test]
    fn preset_is_consistent() {
        let pipeline = preset_transforms();
        pipeline.validate().unwrap();
        assert_eq!(pipeline.exposed_tool_name("get_users"), "find_twitch_users");
        assert_eq!(pipeline.exposed_tool_name("ban_user"), "moderate_ban_user");
        assert_eq!(pipeline.required_context("ban_user"), vec![CONTEXT_USER_ID]);
        assert_eq!(
            pipeline.meta_for("ban_user").and_then(|m| m.get("difficulty")),
            Some(&json!("advanced"))
        );
    }

    #[tokio::test]
    async fn validation_is_cached_after_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let url = spawn_validate(Arc::clone(&calls)).await;
        let validator = TokenValidator::new(reqwest::Client::new(), Some("good".into()), url);

        let info = validator.validate().await.unwrap();
        assert_eq!(info.user_id.as_deref(), Some("42"));
        assert_eq!(info.to_json()["valid"], json!(true));

        let ctx = validator.call_context().await;
        assert_eq!(ctx.get(CONTEXT_USER_ID), Some(&json!("42")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_tokens_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let url = spawn_validate(Arc::clone(&calls)).await;
        let validator = TokenValidator::new(reqwest::Client::new(), Some("bad".into()), url);

        let err = validator.validate().await.unwrap_err();
        assert_eq!(err.to_string(), "Token error: Token validation failed: 401");
        assert!(validator.call_context().await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_token_is_an_error() {
        let validator = TokenValidator::new(reqwest::Client::new(), None, TOKEN_VALIDATE_URL);
        assert!(!validator.has_token());
        assert!(validator.validate().await.is_err());
    }
}
