//! Shared handlers for CLI and MCP.

pub mod chat;

#[cfg(test)]
pub(crate) mod fake;
