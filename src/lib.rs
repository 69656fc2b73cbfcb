// This file exposes the modules as public modules in the crate

pub mod config;
pub mod credentials;
pub mod jira;
pub mod mcp;
