//! MCP Server implementation for Dawa chat.

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

use dawa::ChatSession;

use crate::config;
use crate::handlers::chat as handlers;

/// MCP Server for marketplace conversations.
///
/// One chat session is opened on the first tool call and shared by every
/// later call, so local messages and the selection survive between tools.
#[derive(Clone)]
pub struct DawaMCPServer {
    base_url: Option<String>,
    session: Arc<OnceCell<ChatSession>>,
    tool_router: ToolRouter<Self>,
}

impl DawaMCPServer {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url,
            session: Arc::new(OnceCell::new()),
            tool_router: Self::tool_router(),
        }
    }

    #[cfg(test)]
    fn with_session(session: ChatSession) -> Self {
        Self {
            base_url: None,
            session: Arc::new(OnceCell::new_with(Some(session))),
            tool_router: Self::tool_router(),
        }
    }

    async fn session(&self) -> Result<&ChatSession, McpError> {
        self.session
            .get_or_try_init(|| config::connect_chat(self.base_url.as_deref()))
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    /// The shared session with conversations brought up to date.
    async fn refreshed(&self) -> Result<&ChatSession, McpError> {
        let session = self.session().await?;
        session
            .refresh()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(session)
    }

    fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
        serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    fn ok(text: String) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

// Parameter structs
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GroupParam {
    /// Conversation (group) ID
    pub group_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendParams {
    /// Message content
    pub message: String,
    /// Item ID the message is about (defaults to the conversation's item)
    #[serde(default)]
    pub item_id: Option<String>,
    /// Recipient user ID (defaults to the other side of the conversation)
    #[serde(default)]
    pub receiver_id: Option<String>,
    /// Conversation (group) ID
    #[serde(default)]
    pub group_id: Option<String>,
}

#[tool_router]
impl DawaMCPServer {
    #[tool(description = "List marketplace conversations, most recently active first (requires authentication via CLI: dawa auth login)")]
    async fn chat_groups(&self) -> Result<CallToolResult, McpError> {
        let session = self.refreshed().await?;
        let result = handlers::list_conversations(session)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Self::ok(Self::to_json(&result)?)
    }

    #[tool(description = "Read the messages of a conversation")]
    async fn chat_read(&self, params: Parameters<GroupParam>) -> Result<CallToolResult, McpError> {
        let session = self.refreshed().await?;
        let result = handlers::read_conversation(session, &params.0.group_id)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        Self::ok(Self::to_json(&result)?)
    }

    #[tool(description = "Send a message about an item to a buyer or seller")]
    async fn chat_send(&self, params: Parameters<SendParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let session = self.session().await?;
        let result = handlers::send_message(
            session,
            handlers::SendParams {
                item: p.item_id,
                to: p.receiver_id,
                group: p.group_id,
                content: p.message,
            },
        )
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Self::ok(Self::to_json(&result)?)
    }

    #[tool(description = "Count unread messages addressed to the signed-in user")]
    async fn chat_unread_count(&self) -> Result<CallToolResult, McpError> {
        let session = self.refreshed().await?;
        Self::ok(Self::to_json(&handlers::unread_count(session))?)
    }
}

#[tool_handler]
impl ServerHandler for DawaMCPServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "dawa-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            ..Default::default()
        }
    }
}

/// Run the MCP Server.
pub async fn run_server(base_url: Option<String>) -> anyhow::Result<()> {
    use rmcp::transport::io::stdio;

    tracing::info!("Starting Dawa MCP server");

    let server = DawaMCPServer::new(base_url);
    let service = rmcp::serve_server(server, stdio()).await?;

    tracing::info!("Dawa MCP server ready");
    service.waiting().await?;

    Ok(())
}
