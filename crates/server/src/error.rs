//! Error types for the Helix MCP server.

use helix_openapi_tools::error::OpenApiToolsError;
use helix_tool_transforms::TransformError;
use thiserror::Error;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration errors (invalid YAML, missing credentials, conflicting flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (spec unavailable, listener failed to bind)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Failures from the generated tool source
    #[error(transparent)]
    Source(#[from] OpenApiToolsError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Token validation against the OAuth endpoint
    #[error("Token error: {0}")]
    Token(String),

    /// MCP transport failures (stdio session, HTTP listener)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
