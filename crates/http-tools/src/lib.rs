//! Outbound HTTP building blocks shared by `helix-mcp` tool sources.
//!
//! This crate knows nothing about `OpenAPI` or MCP sessions. It covers:
//! - credentials and default headers attached to every outbound call ([`config`])
//! - the outbound policy (scheme/host checks, body limits, redaction) ([`safety`])
//! - tool annotations derived from HTTP method semantics ([`semantics`])

pub mod config;
pub mod error;
pub mod safety;
pub mod semantics;
