//! MCP server exposing the Twitch Helix API as tools generated from its `OpenAPI` description.

pub mod builtins;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod surface;
pub mod transport;
pub mod twitch;

use crate::cli::{Cli, Transport};
use crate::config::Settings;
use crate::error::Result;
use crate::server::HelixServer;
use crate::surface::ToolSurface;
use crate::twitch::TokenValidator;
use helix_openapi_tools::filter::TagFilter;
use helix_openapi_tools::{OpenApiToolSource, SourceOptions};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Load the API description and assemble the filtered, transformed tool surface.
///
/// # Errors
///
/// Returns an error if the description cannot be loaded or the transforms are ambiguous.
pub async fn build_surface(settings: &Settings) -> Result<ToolSurface> {
    let options = SourceOptions {
        default_timeout: settings.default_timeout,
        startup_timeout: settings.startup_timeout,
        policy: settings.policy.clone(),
        ..SourceOptions::default()
    };
    let source = OpenApiToolSource::build(settings.source.clone(), options).await?;
    tracing::info!(
        api = %source.spec_title(),
        operations = source.tools().len(),
        "loaded API description"
    );

    let discovered: Vec<String> = source
        .tools()
        .iter()
        .flat_map(|t| t.tags().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    catalog::warn_unknown(
        settings.include_tags.iter().chain(&settings.exclude_tags),
        &discovered,
    );

    let tokens = TokenValidator::new(
        source.client().clone(),
        settings.access_token.clone(),
        settings.token_validate_url.clone(),
    );
    if !tokens.has_token() {
        tracing::warn!("no access token configured; Helix calls will likely be rejected");
    }

    let filter = TagFilter::new(&settings.include_tags, &settings.exclude_tags);
    ToolSurface::new(Arc::new(source), filter, settings.transforms.clone(), tokens)
}

/// # Errors
///
/// Returns configuration, startup and transport errors.
pub async fn run(cli: Cli) -> Result<()> {
    if cli.list_tags {
        print!("{}", catalog::render());
        return Ok(());
    }

    let settings = Settings::from_cli(&cli)?;
    settings.require_client_id()?;
    let surface = build_surface(&settings).await?;

    if cli.list_tools {
        print!("{}", surface.render_listing());
        return Ok(());
    }

    surface.log_summary();
    let server = HelixServer::new(Arc::new(surface));
    match settings.transport {
        Transport::Stdio => transport::serve_stdio(server).await,
        Transport::Http => transport::serve_http(server, &settings.host, settings.port).await,
        Transport::Sse => {
            tracing::info!("sse transport is served as streamable HTTP");
            transport::serve_http(server, &settings.host, settings.port).await
        }
    }
}
