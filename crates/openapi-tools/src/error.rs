//! Error types for `helix-openapi-tools`.

use helix_http_tools::error::HttpToolsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Invalid configuration (bad route map pattern, missing base URL, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spec loading or tool discovery failed.
    #[error("Startup error: {0}")]
    Startup(String),

    /// Tool call failed before a request was sent (missing arguments, bad URL, ...).
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The upstream answered with a non-success status or an unusable body.
    #[error("{0}")]
    Http(String),

    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    #[error("OpenAPI error: failed to fetch spec from '{url}': {message}")]
    OpenApiSpecFetch { url: String, message: String },

    #[error("OpenAPI error: failed to read spec file '{path}': {source}")]
    OpenApiSpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenAPI error: failed to parse spec from '{location}': {message}")]
    OpenApiSpecParse { location: String, message: String },

    #[error("Parameter collision: {0}")]
    ParamCollision(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Transport-level failure (connect, timeout, TLS). URLs are redacted.
    #[error("Request error: {0}")]
    Request(String),
}

pub type Result<T> = std::result::Result<T, OpenApiToolsError>;

impl From<HttpToolsError> for OpenApiToolsError {
    fn from(value: HttpToolsError) -> Self {
        match value {
            HttpToolsError::Config(m) => Self::Config(m),
            HttpToolsError::Http(m) => Self::Http(m),
            HttpToolsError::Transport(m) => Self::Request(m),
            HttpToolsError::Blocked(m) => Self::Http(format!("Request blocked: {m}")),
        }
    }
}
