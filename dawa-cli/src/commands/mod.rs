//! CLI command definitions.

pub mod chat;
