//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::config::Config;
use crate::generation::{GenerationClient, PrdGenerator};
use crate::quality::QualityEngine;
use crate::research::{GenerationResearchProvider, ProviderRegistry, ResearchAggregator};
use crate::session::SessionManager;
use crate::storage::StateStore;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Session state machine.
    pub manager: Arc<SessionManager>,
    /// Research aggregator with its provider registry.
    pub aggregator: ResearchAggregator,
    /// PRD assembler.
    pub generator: PrdGenerator,
    /// Quality scoring engine.
    pub quality: QualityEngine,
}

impl AppState {
    /// Create new application state over a storage backend and generation
    /// client.
    pub fn new(config: Config, store: Arc<dyn StateStore>, client: GenerationClient) -> Self {
        let manager = Arc::new(SessionManager::new(store, config.session.clone()));

        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(GenerationResearchProvider::new(client.clone())));

        let aggregator = ResearchAggregator::new(Arc::clone(&manager), registry);
        let generator = PrdGenerator::new(client);

        Self {
            config,
            manager,
            aggregator,
            generator,
            quality: QualityEngine::default(),
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
