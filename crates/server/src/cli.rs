use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    /// Streamable HTTP at `/mcp`.
    Http,
    /// Accepted for compatibility; served by the streamable HTTP transport.
    Sse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Twitch Helix API as MCP tools, generated from an `OpenAPI` description.
#[derive(Debug, Clone, Parser)]
#[command(name = "helix-mcp", version)]
pub struct Cli {
    /// Twitch application client id (sent as `Client-Id`).
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    pub client_id: Option<String>,

    /// User or app access token (sent as `Authorization: Bearer`).
    #[arg(long, env = "TWITCH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// `OpenAPI` description: file path, `file://` or `http(s)` URL [default: openapi.json]
    #[arg(long, env = "HELIX_OPENAPI_SPEC")]
    pub spec: Option<String>,

    /// API base URL [default: https://api.twitch.tv/helix]
    #[arg(long, env = "HELIX_BASE_URL")]
    pub base_url: Option<String>,

    /// Only expose tools carrying one of these tags (space or comma separated).
    #[arg(long, num_args = 1..)]
    pub include_tags: Vec<String>,

    /// Hide tools carrying any of these tags. Wins over `--include-tags`.
    #[arg(long, num_args = 1..)]
    pub exclude_tags: Vec<String>,

    /// Expose tools exactly as generated, without the Twitch renames.
    #[arg(long)]
    pub no_transformations: bool,

    #[arg(long, value_enum, env = "TRANSPORT", default_value_t = Transport::Stdio)]
    pub transport: Transport,

    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Print the tag catalog and exit.
    #[arg(long)]
    pub list_tags: bool,

    /// Print the tools that would be exposed and exit.
    #[arg(long)]
    pub list_tools: bool,

    /// Serve `GET /search/*` and `GET /analytics/*` as MCP resources instead of tools.
    #[arg(long)]
    pub expose_resources: bool,

    /// YAML config file; CLI flags override its values.
    #[arg(long, env = "HELIX_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter (`RUST_LOG` takes precedence).
    #[arg(long, env = "HELIX_MCP_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, env = "HELIX_MCP_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lists_accept_several_values() {
        let cli = Cli::try_parse_from([
            "helix-mcp",
            "--client-id",
            "abc",
            "--include-tags",
            "users",
            "streams,games",
            "--exclude-tags",
            "moderation",
            "--transport",
            "sse",
        ])
        .unwrap();
        assert_eq!(cli.include_tags, vec!["users", "streams,games"]);
        assert_eq!(cli.exclude_tags, vec!["moderation"]);
        assert_eq!(cli.transport, Transport::Sse);
        assert!(!cli.no_transformations);
    }

    #[test]
    fn rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["helix-mcp", "--transport", "websocket"]).is_err());
    }
}
