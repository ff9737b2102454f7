use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;

use lineage_kg::KnowledgeGraph;
use lineage_types::TraversalConfig;

use crate::domain::DomainAdapter;
use crate::explorer::Explorer;

/// Builder for constructing an Explorer
pub struct ExplorerBuilder {
    graph: Option<Arc<dyn KnowledgeGraph>>,
    domain: Option<DomainAdapter>,
    config: TraversalConfig,
}

impl ExplorerBuilder {
    pub fn new() -> Self {
        Self {
            graph: None,
            domain: None,
            config: TraversalConfig::default(),
        }
    }

    /// Set the knowledge graph backend
    pub fn graph(mut self, graph: Arc<dyn KnowledgeGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Set the domain adapter
    pub fn domain(mut self, domain: DomainAdapter) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn config(mut self, config: TraversalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_fetch_timeout(timeout);
        self
    }

    /// Build the Explorer
    pub fn build(self) -> Result<Explorer> {
        let graph = self.graph
            .ok_or_else(|| anyhow!("Knowledge graph is required"))?;
        let domain = self.domain
            .ok_or_else(|| anyhow!("Domain adapter is required"))?;

        Ok(Explorer::new(graph, domain, self.config))
    }
}

impl Default for ExplorerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
