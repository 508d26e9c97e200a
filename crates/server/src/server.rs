//! MCP protocol handler over a [`ToolSurface`].

use crate::surface::ToolSurface;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Implementation, ListResourcesResult, ListToolsResult,
    PaginatedRequestParams, ReadResourceRequestParams, ReadResourceResult, ResourceContents,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use std::sync::Arc;

const INSTRUCTIONS: &str = "Tools for the Twitch Helix API. Look up users with \
find_twitch_users to get the ids other tools expect; get_twitch_token_info shows which \
scopes the configured token carries.";

#[derive(Debug, Clone)]
pub struct HelixServer {
    surface: Arc<ToolSurface>,
}

impl HelixServer {
    #[must_use]
    pub fn new(surface: Arc<ToolSurface>) -> Self {
        Self { surface }
    }
}

impl ServerHandler for HelixServer {
    fn get_info(&self) -> ServerInfo {
        let capabilities = if self.surface.has_resources() {
            ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build()
        } else {
            ServerCapabilities::builder().enable_tools().build()
        };

        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities,
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                title: Some(self.surface.source().spec_title().to_string()),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.surface.tools(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::debug!(tool = %request.name, "call_tool");
        self.surface.call_tool(&request.name, request.arguments).await
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            resources: self.surface.list_resources(),
            ..Default::default()
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let text = self.surface.read_resource(&request.uri).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}
