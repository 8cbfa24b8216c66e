//! Confluent Cloud service discovery server library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod server;
pub mod upstream;

// Re-export commonly used types for convenience
pub use catalog::{Catalog, ResourceCollector, UpstreamCollector};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
pub use upstream::{ConfluentClient, UpstreamSettings};
