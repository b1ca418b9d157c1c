//! # MCP Discovery Workflow Server
//!
//! A Model Context Protocol (MCP) server that guides product discovery
//! through five gated stages and scores the resulting PRD against weighted
//! quality criteria.
//!
//! ## Features
//!
//! - **Stage-Gated Sessions**: problem framing, market research, technical
//!   feasibility, requirements synthesis, and PRD generation, advanced only
//!   through validated completions
//! - **Single-Document Persistence**: one JSON state document per project
//!   with optimistic versioning and corrupt-state fallback
//! - **Research Aggregation**: uniform provider adapters appending typed
//!   research records into session buckets
//! - **Quality Scoring**: deterministic five-criteria assessment with gaps,
//!   recommendations, and readiness thresholds
//! - **Document Assembly**: PRD generation through an external
//!   text-generation service
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Generation Service (HTTP)
//!                    ↓
//!           JSON state document
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_discovery_workflow::{AppState, Config, McpServer};
//! use mcp_discovery_workflow::generation::GenerationClient;
//! use mcp_discovery_workflow::storage::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(JsonFileStore::new(&config.storage.state_path));
//!     let client = GenerationClient::new(&config.generation, config.request.clone())?;
//!     let state = Arc::new(AppState::new(config, store, client));
//!     let server = McpServer::new(state);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management for the MCP server.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Text-generation service client and document assembly.
pub mod generation;
/// System prompts for the generation service.
pub mod prompts;
/// Quality scoring engine for generated documents.
pub mod quality;
/// Research provider adapters and aggregation.
pub mod research;
/// Session and stage schema definitions and validation.
pub mod schema;
/// MCP server implementation and request handling.
pub mod server;
/// Stage-gated session state machine.
pub mod session;
/// Persisted-state storage backends.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
