//! OpenAPI -> MCP tooling.
//!
//! Loads an API description, turns each operation into a tool, classifies operations with
//! route maps, and executes tool calls as outbound HTTP requests. Tag filtering and surface
//! transforms are applied by the server on top of the generated tools.

pub mod config;
pub mod error;
pub mod filter;
pub mod fixups;
pub mod loader;
pub mod naming;
pub mod query;
pub mod resolver;
pub mod routes;
pub mod runtime;
pub mod schema;

pub use runtime::{GeneratedTool, OpenApiToolSource, SourceOptions, ToolResponse};
