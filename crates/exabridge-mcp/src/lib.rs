//! `exabridge` crate (library surface).
//!
//! The primary entrypoint for end users is the `exabridge` binary (CLI + MCP stdio).
//! This module re-exports the provider types and the client so embedders can reuse the
//! poller and formatter without the MCP server.

pub use exabridge_client as client;
pub use exabridge_core as core;
