//! Tools that are not generated from the API description.

use crate::error::ServerError;
use crate::twitch::TokenValidator;
use helix_http_tools::semantics::MethodSemantics;
use helix_openapi_tools::OpenApiToolSource;
use rmcp::model::{CallToolResult, Content, JsonObject, Meta, Tool};
use serde_json::{Map, Value, json};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    TokenInfo,
    QuickStats,
}

impl Builtin {
    pub const ALL: [Builtin; 2] = [Builtin::TokenInfo, Builtin::QuickStats];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Builtin::TokenInfo => "get_twitch_token_info",
            Builtin::QuickStats => "twitch_quick_stats",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    #[must_use]
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            Builtin::TokenInfo => &["auth", "utility"],
            Builtin::QuickStats => &["users", "stats", "utility"],
        }
    }

    fn description(self) -> &'static str {
        match self {
            Builtin::TokenInfo => "Check the configured Twitch access token: validity, client id, \
                                   login, scopes and remaining lifetime.",
            Builtin::QuickStats => "Quick statistics for a Twitch user: followers, views and \
                                    live stream status.",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Builtin::TokenInfo => json!({ "type": "object", "properties": {} }),
            Builtin::QuickStats => json!({
                "type": "object",
                "properties": {
                    "username": { "type": "string", "description": "Twitch login, e.g. ninja" }
                },
                "required": ["username"]
            }),
        }
    }

    #[must_use]
    pub fn to_mcp_tool(self) -> Tool {
        let schema = match self.input_schema() {
            Value::Object(obj) => obj,
            _ => JsonObject::new(),
        };
        let mut tool = Tool::new(self.name(), self.description(), Arc::new(schema));
        tool.annotations = Some(MethodSemantics::of(&reqwest::Method::GET).annotations(None));

        let (category, difficulty) = match self {
            Builtin::TokenInfo => ("authentication", "easy"),
            Builtin::QuickStats => ("analytics", "easy"),
        };
        let mut meta = JsonObject::new();
        meta.insert("tags".to_string(), json!(self.tags()));
        meta.insert("category".to_string(), json!(category));
        meta.insert("difficulty".to_string(), json!(difficulty));
        tool.meta = Some(Meta(meta));
        tool
    }

    /// Failures are reported as error results, never as protocol errors.
    pub async fn call(
        self,
        args: &Map<String, Value>,
        source: &OpenApiToolSource,
        tokens: &TokenValidator,
    ) -> CallToolResult {
        let outcome = match self {
            Builtin::TokenInfo => token_info(tokens).await,
            Builtin::QuickStats => match args.get("username").and_then(Value::as_str) {
                Some(username) if !username.trim().is_empty() => {
                    quick_stats(source, username.trim()).await
                }
                _ => Err("Missing required parameter: username".to_string()),
            },
        };

        match outcome {
            Ok(body) => CallToolResult::success(vec![Content::text(body.to_string())]),
            Err(message) => {
                tracing::warn!(tool = self.name(), error = %message, "built-in tool failed");
                CallToolResult::error(vec![Content::text(message)])
            }
        }
    }
}

async fn token_info(tokens: &TokenValidator) -> Result<Value, String> {
    match tokens.validate().await {
        Ok(info) => Ok(info.to_json()),
        Err(ServerError::Token(message)) => Err(message),
        Err(other) => Err(other.to_string()),
    }
}

async fn quick_stats(source: &OpenApiToolSource, username: &str) -> Result<Value, String> {
    let users = source
        .fetch_json("/users", &[("login", username)])
        .await
        .map_err(|e| e.to_string())?;
    let user = users
        .get("data")
        .and_then(|d| d.get(0))
        .ok_or_else(|| format!("User {username} not found"))?;
    let user_id = user
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("User {username} has no id"))?;

    let streams = source
        .fetch_json("/streams", &[("user_id", user_id)])
        .await
        .map_err(|e| e.to_string())?;
    let live = streams.get("data").and_then(|d| d.get(0));

    // Follower totals need extra scopes; treat failures as zero.
    let followers = match source
        .fetch_json("/channels/followers", &[("broadcaster_id", user_id)])
        .await
    {
        Ok(v) => v.get("total").and_then(Value::as_u64).unwrap_or(0),
        Err(e) => {
            tracing::debug!(error = %e, "follower lookup failed");
            0
        }
    };

    let field = |v: &Value, key: &str| v.get(key).cloned().unwrap_or(Value::Null);
    let mut stats = json!({
        "username": field(user, "display_name"),
        "user_id": user_id,
        "is_live": live.is_some(),
        "followers_count": followers,
        "total_views": field(user, "view_count"),
        "created_at": field(user, "created_at"),
        "description": field(user, "description"),
    });
    if let (Some(stream), Some(obj)) = (live, stats.as_object_mut()) {
        obj.insert("current_game".to_string(), field(stream, "game_name"));
        obj.insert("stream_title".to_string(), field(stream, "title"));
        obj.insert("viewer_count".to_string(), field(stream, "viewer_count"));
        obj.insert("stream_started".to_string(), field(stream, "started_at"));
    }
    Ok(stats)
}
