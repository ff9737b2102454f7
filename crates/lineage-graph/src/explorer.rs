use crate::cancel::CancelToken;
use crate::domain::DomainAdapter;
use crate::run::{RunOutcome, TraversalRun};
use lineage_kg::KnowledgeGraph;
use lineage_types::{ExploreRequest, TraversalConfig, TraversalEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Traversal engine for one domain over a shared knowledge graph
pub struct Explorer {
    graph: Arc<dyn KnowledgeGraph>,
    domain: Arc<DomainAdapter>,
    config: TraversalConfig,
}

impl Explorer {
    pub fn new(graph: Arc<dyn KnowledgeGraph>, domain: DomainAdapter, config: TraversalConfig) -> Self {
        Self {
            graph,
            domain: Arc::new(domain),
            config,
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::ExplorerBuilder {
        crate::builder::ExplorerBuilder::new()
    }

    pub fn domain(&self) -> &DomainAdapter {
        &self.domain
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Spawn a traversal in the background, return its event receiver and task handle.
    ///
    /// Events arrive in discovery order. Cancelling `cancel` stops the run
    /// without a terminal event.
    pub fn spawn_explore(
        &self,
        request: ExploreRequest,
        cancel: CancelToken,
    ) -> (mpsc::Receiver<TraversalEvent>, JoinHandle<RunOutcome>) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let run = TraversalRun::new(
            Arc::clone(&self.graph),
            Arc::clone(&self.domain),
            self.config.clone(),
            tx,
            cancel,
        );
        let handle = tokio::spawn(run.execute(request));

        (rx, handle)
    }

    /// Run a traversal to its end and return every event it produced
    pub async fn collect(&self, request: ExploreRequest) -> Vec<TraversalEvent> {
        let (mut rx, handle) = self.spawn_explore(request, CancelToken::new());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Traversal task panicked");
        }

        events
    }
}
