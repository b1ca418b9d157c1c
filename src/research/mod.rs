//! Research provider adapters and the research aggregator.
//!
//! Every provider is reached through the same two-method capability:
//! `execute` and `is_available`. Concrete adapters translate the uniform
//! call onto their provider's native operations using contextual hints; the
//! orchestrator never special-cases a provider. The layer performs no
//! retries and no caching.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{AppResult, ResearchError, ResearchResult};
use crate::generation::{GenerationClient, GenerationRequest};
use crate::schema::{QueryType, ResearchQuery, Session, Stage};
use crate::session::SessionManager;

/// Contextual hints a provider adapter routes on.
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    /// Stage the query originates from, if known.
    pub stage: Option<Stage>,
    /// Technologies under consideration, if any.
    pub technologies: Vec<String>,
    /// Free-form extra hints.
    pub hints: HashMap<String, String>,
}

impl ProviderContext {
    /// Context for a query issued from a stage.
    pub fn for_stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    /// Attach a technology list
    pub fn with_technologies(mut self, technologies: Vec<String>) -> Self {
        self.technologies = technologies;
        self
    }
}

/// Uniform provider capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Provider identifier recorded on research records.
    fn name(&self) -> &str;

    /// Whether the provider can serve queries in this context.
    fn is_available(&self, context: &ProviderContext) -> bool;

    /// Execute one research query. May reject; never retries.
    async fn execute(
        &self,
        query_type: QueryType,
        query: &str,
        context: &ProviderContext,
    ) -> ResearchResult<Value>;
}

/// Safe default for unknown provider names: never available, always fails.
#[derive(Debug, Clone)]
pub struct NullProvider {
    name: String,
}

impl NullProvider {
    /// Create a null adapter carrying the unknown name for diagnostics.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ResearchProvider for NullProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self, _context: &ProviderContext) -> bool {
        false
    }

    async fn execute(
        &self,
        _query_type: QueryType,
        _query: &str,
        _context: &ProviderContext,
    ) -> ResearchResult<Value> {
        Err(ResearchError::ProviderUnavailable {
            provider: self.name.clone(),
        })
    }
}

/// Research adapter backed by the text-generation service.
///
/// Routing: a technology list in the context selects a feasibility-style
/// call; a market-research stage or market/competitive query type selects a
/// market-opportunity call; everything else falls back to a generic lookup.
pub struct GenerationResearchProvider {
    client: GenerationClient,
}

impl GenerationResearchProvider {
    /// Adapter name used in registries and research records.
    pub const NAME: &'static str = "generation";

    /// Create an adapter over the generation client.
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    fn operation_for(query_type: QueryType, context: &ProviderContext) -> &'static str {
        if !context.technologies.is_empty() || query_type == QueryType::TechnicalValidation {
            return "feasibility-assessment";
        }
        if context.stage == Some(Stage::MarketResearch)
            || matches!(
                query_type,
                QueryType::MarketAnalysis | QueryType::CompetitiveAnalysis
            )
        {
            return "market-opportunity";
        }
        "general-lookup"
    }
}

#[async_trait]
impl ResearchProvider for GenerationResearchProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self, _context: &ProviderContext) -> bool {
        true
    }

    async fn execute(
        &self,
        query_type: QueryType,
        query: &str,
        context: &ProviderContext,
    ) -> ResearchResult<Value> {
        let operation = Self::operation_for(query_type, context);
        debug!(operation, query_type = %query_type, "Routing research query");

        let prompt = match operation {
            "feasibility-assessment" => format!(
                "Assess technical feasibility. Technologies: {}. Question: {}",
                context.technologies.join(", "),
                query
            ),
            "market-opportunity" => format!(
                "Analyze the market opportunity and competitive landscape for: {}",
                query
            ),
            _ => format!("Research the following and summarize findings: {}", query),
        };

        let response = self
            .client
            .generate(GenerationRequest::new(prompt))
            .await
            .map_err(|e| ResearchError::QueryFailed {
                message: e.to_string(),
            })?;

        Ok(json!({
            "operation": operation,
            "summary": response.content,
        }))
    }
}

/// Registry resolving provider names to adapters.
///
/// Unknown names resolve to [`NullProvider`] rather than an error; research
/// is supplementary and a misnamed provider must not break the workflow.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ResearchProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own name.
    pub fn register(&mut self, provider: Arc<dyn ResearchProvider>) {
        self.providers
            .insert(provider.name().to_string(), provider);
    }

    /// Resolve a provider by name; unknown names get the null adapter.
    pub fn adapter_for(&self, name: &str) -> Arc<dyn ResearchProvider> {
        match self.providers.get(name) {
            Some(provider) => Arc::clone(provider),
            None => {
                warn!(provider = %name, "Unknown research provider, using null adapter");
                Arc::new(NullProvider::new(name))
            }
        }
    }

    /// Number of registered adapters.
    pub fn count(&self) -> usize {
        self.providers.len()
    }
}

/// Executes research queries and records them into session buckets.
pub struct ResearchAggregator {
    manager: Arc<SessionManager>,
    registry: ProviderRegistry,
}

impl ResearchAggregator {
    /// Create an aggregator over the session manager and provider registry.
    pub fn new(manager: Arc<SessionManager>, registry: ProviderRegistry) -> Self {
        Self { manager, registry }
    }

    /// Run one query against a named provider and append the outcome -
    /// success or failure - to the session bucket matching the query type.
    pub async fn run_query(
        &self,
        session_id: &str,
        provider_name: &str,
        query_type: QueryType,
        query: &str,
        context: &ProviderContext,
    ) -> AppResult<Session> {
        let provider = self.registry.adapter_for(provider_name);

        let record = if !provider.is_available(context) {
            ResearchQuery::new(provider_name, query_type, query)
                .with_error(format!("provider {} not available", provider_name))
        } else {
            match provider.execute(query_type, query, context).await {
                Ok(results) => {
                    ResearchQuery::new(provider_name, query_type, query).with_results(results)
                }
                Err(e) => ResearchQuery::new(provider_name, query_type, query)
                    .with_error(e.to_string()),
            }
        };

        self.manager
            .add_research_data(session_id, query_type.bucket(), record)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_provider_is_never_available() {
        let provider = NullProvider::new("mystery");
        assert!(!provider.is_available(&ProviderContext::default()));
    }

    #[tokio::test]
    async fn test_null_provider_execute_always_fails() {
        let provider = NullProvider::new("mystery");
        let err = provider
            .execute(QueryType::General, "anything", &ProviderContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::ProviderUnavailable { .. }));
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn test_registry_unknown_name_yields_null_adapter() {
        let registry = ProviderRegistry::new();
        let adapter = registry.adapter_for("nope");
        assert_eq!(adapter.name(), "nope");
        assert!(!adapter.is_available(&ProviderContext::default()));
    }

    #[test]
    fn test_routing_prefers_technology_hints() {
        let context = ProviderContext::default()
            .with_technologies(vec!["postgres".to_string(), "axum".to_string()]);
        assert_eq!(
            GenerationResearchProvider::operation_for(QueryType::General, &context),
            "feasibility-assessment"
        );
    }

    #[test]
    fn test_routing_market_stage_and_query_types() {
        let context = ProviderContext::for_stage(Stage::MarketResearch);
        assert_eq!(
            GenerationResearchProvider::operation_for(QueryType::General, &context),
            "market-opportunity"
        );

        let plain = ProviderContext::default();
        assert_eq!(
            GenerationResearchProvider::operation_for(QueryType::MarketAnalysis, &plain),
            "market-opportunity"
        );
        assert_eq!(
            GenerationResearchProvider::operation_for(QueryType::CompetitiveAnalysis, &plain),
            "market-opportunity"
        );
    }

    #[test]
    fn test_routing_falls_back_to_generic_lookup() {
        let plain = ProviderContext::default();
        assert_eq!(
            GenerationResearchProvider::operation_for(QueryType::General, &plain),
            "general-lookup"
        );
    }

    #[test]
    fn test_technical_validation_routes_to_feasibility() {
        let plain = ProviderContext::default();
        assert_eq!(
            GenerationResearchProvider::operation_for(QueryType::TechnicalValidation, &plain),
            "feasibility-assessment"
        );
    }

    mod aggregator {
        use super::*;
        use crate::config::SessionConfig;
        use crate::schema::SessionMetadata;
        use crate::storage::MemoryStore;

        async fn aggregator_with(provider: MockResearchProvider) -> (ResearchAggregator, String) {
            let store = Arc::new(MemoryStore::new());
            let manager = Arc::new(SessionManager::new(store, SessionConfig::default()));
            let mut registry = ProviderRegistry::new();
            registry.register(Arc::new(provider));

            let session_id = manager
                .create_session("Research Test", SessionMetadata::default())
                .await
                .unwrap()
                .id;

            (ResearchAggregator::new(manager, registry), session_id)
        }

        #[tokio::test]
        async fn test_successful_query_lands_in_matching_bucket() {
            let mut provider = MockResearchProvider::new();
            provider.expect_name().return_const("mock".to_string());
            provider.expect_is_available().return_const(true);
            provider
                .expect_execute()
                .returning(|_, _, _| Ok(json!({ "hits": 2 })));

            let (aggregator, session_id) = aggregator_with(provider).await;
            let session = aggregator
                .run_query(
                    &session_id,
                    "mock",
                    QueryType::CompetitiveAnalysis,
                    "who competes with X",
                    &ProviderContext::default(),
                )
                .await
                .unwrap();

            assert_eq!(session.research_data.competitive_analysis.len(), 1);
            let record = &session.research_data.competitive_analysis[0];
            assert!(record.success);
            assert_eq!(record.provider, "mock");
        }

        #[tokio::test]
        async fn test_failed_query_is_recorded_not_dropped() {
            let mut provider = MockResearchProvider::new();
            provider.expect_name().return_const("mock".to_string());
            provider.expect_is_available().return_const(true);
            provider.expect_execute().returning(|_, _, _| {
                Err(ResearchError::QueryFailed {
                    message: "upstream 500".to_string(),
                })
            });

            let (aggregator, session_id) = aggregator_with(provider).await;
            let session = aggregator
                .run_query(
                    &session_id,
                    "mock",
                    QueryType::General,
                    "anything",
                    &ProviderContext::default(),
                )
                .await
                .unwrap();

            let record = &session.research_data.general[0];
            assert!(!record.success);
            assert!(record.error.as_deref().unwrap().contains("upstream 500"));
        }

        #[tokio::test]
        async fn test_unknown_provider_records_failure() {
            let mut provider = MockResearchProvider::new();
            provider.expect_name().return_const("mock".to_string());

            let (aggregator, session_id) = aggregator_with(provider).await;
            let session = aggregator
                .run_query(
                    &session_id,
                    "nonexistent",
                    QueryType::MarketAnalysis,
                    "market size",
                    &ProviderContext::default(),
                )
                .await
                .unwrap();

            let record = &session.research_data.market_analysis[0];
            assert!(!record.success);
            assert_eq!(record.provider, "nonexistent");
        }
    }
}
