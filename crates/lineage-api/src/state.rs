use crate::config::Config;
use crate::protocol::Dispatcher;
use crate::session::SessionRegistry;
use lineage_graph::{Explorer, TitleResolver};
use lineage_kg::KnowledgeGraph;
use std::sync::Arc;

/// Shared application state passed to all handlers
///
/// The explorer and resolver are stateless between runs and shared by every
/// session; per-connection state lives in the session registry.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub explorer: Arc<Explorer>,
    pub resolver: Arc<TitleResolver>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config, explorer: Explorer, resolver: TitleResolver) -> Self {
        Self {
            config: Arc::new(config),
            explorer: Arc::new(explorer),
            resolver: Arc::new(resolver),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    /// Wire the explorer and resolver for the configured domain around `graph`
    pub fn from_graph(config: Config, graph: Arc<dyn KnowledgeGraph>) -> anyhow::Result<Self> {
        let explorer = Explorer::builder()
            .graph(Arc::clone(&graph))
            .domain(config.explorer.adapter())
            .config(config.explorer.traversal_config())
            .build()?;

        let resolver = TitleResolver::new(graph)
            .with_limit(config.explorer.candidate_limit)
            .with_timeout(config.explorer.fetch_timeout());

        Ok(Self::new(config, explorer, resolver))
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.explorer),
            Arc::clone(&self.resolver),
            self.config.explorer.default_depth,
            self.config.explorer.expand_depth,
        )
    }
}
