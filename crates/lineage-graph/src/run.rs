use crate::cancel::CancelToken;
use crate::domain::{DomainAdapter, Orientation, RelationSpec};
use anyhow::Result;
use lineage_kg::{Claim, KgError, KnowledgeGraph};
use lineage_types::{
    Direction, Edge, EdgeKey, ExploreRequest, Node, NodeAttributes, NodeId, Relationship, RootRef,
    TraversalConfig, TraversalEvent,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { total_edges: usize },
    Failed,
    Cancelled,
}

/// Stops a run without emitting anything further
#[derive(Debug, thiserror::Error)]
enum Halt {
    #[error("traversal cancelled")]
    Cancelled,
    #[error("event receiver dropped")]
    Disconnected,
}

enum Fetch<T> {
    Done(T),
    Failed(String),
    Cancelled,
}

enum Walk {
    Done,
    RootFailed(String),
}

/// State of one traversal: visited sets per direction, emitted edge keys,
/// nodes whose details went out, and the run's label cache.
///
/// Each direction is walked breadth-first from the root with a worklist of
/// `(node, remaining depth)`, so every node is expanded with the largest
/// depth budget it can be reached with.
pub struct TraversalRun {
    run_id: String,
    graph: Arc<dyn KnowledgeGraph>,
    domain: Arc<DomainAdapter>,
    config: TraversalConfig,
    events: mpsc::Sender<TraversalEvent>,
    cancel: CancelToken,
    visited: HashMap<Direction, HashSet<NodeId>>,
    emitted: HashSet<EdgeKey>,
    relationships: Vec<Relationship>,
    described: HashSet<NodeId>,
    labels: HashMap<NodeId, String>,
    progress: u8,
}

impl TraversalRun {
    pub fn new(
        graph: Arc<dyn KnowledgeGraph>,
        domain: Arc<DomainAdapter>,
        config: TraversalConfig,
        events: mpsc::Sender<TraversalEvent>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            graph,
            domain,
            config,
            events,
            cancel,
            visited: HashMap::new(),
            emitted: HashSet::new(),
            relationships: Vec::new(),
            described: HashSet::new(),
            labels: HashMap::new(),
            progress: 0,
        }
    }

    /// Drive the run to its end. Unexpected errors become a `Failed` event.
    pub async fn execute(mut self, request: ExploreRequest) -> RunOutcome {
        let started = Instant::now();
        tracing::info!(
            run_id = %self.run_id,
            domain = %self.domain.kind,
            root = ?request.root,
            max_depth = ?request.max_depth,
            direction = ?request.direction,
            "Traversal started"
        );

        let outcome = match self.drive(&request).await {
            Ok(outcome) => outcome,
            Err(e) if e.is::<Halt>() => RunOutcome::Cancelled,
            Err(e) => {
                tracing::error!(run_id = %self.run_id, error = %e, "Traversal aborted");
                if !self.cancel.is_cancelled() {
                    let _ = self.events.send(TraversalEvent::failed(e.to_string())).await;
                }
                RunOutcome::Failed
            }
        };

        tracing::info!(
            run_id = %self.run_id,
            outcome = ?outcome,
            edges = self.relationships.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Traversal finished"
        );
        outcome
    }

    async fn drive(&mut self, request: &ExploreRequest) -> Result<RunOutcome> {
        let root = match &request.root {
            RootRef::Id(id) => id.clone(),
            RootRef::Title(title) => {
                let graph = Arc::clone(&self.graph);
                match self.guarded(graph.resolve_title(title)).await {
                    Fetch::Done(Some(resolved)) => {
                        self.labels.insert(resolved.id.clone(), resolved.title);
                        resolved.id
                    }
                    Fetch::Done(None) => return self.fail("root not found").await,
                    Fetch::Failed(reason) => {
                        return self.fail(format!("root lookup failed: {}", reason)).await;
                    }
                    Fetch::Cancelled => return Err(Halt::Cancelled.into()),
                }
            }
        };

        if request.max_depth == Some(0) {
            return self.complete().await;
        }

        self.ensure_labels(std::slice::from_ref(&root)).await?;
        self.describe(&root).await?;

        let phases = request.direction.phases();
        let span = 80 / phases.len() as u8;
        for (i, &direction) in phases.iter().enumerate() {
            let floor = 10 + span * i as u8;
            if let Walk::RootFailed(reason) = self.walk(&root, request.max_depth, direction, floor, span).await? {
                let message = format!("failed to expand {}: {}", self.label_of(&root), reason);
                return self.fail(message).await;
            }
        }

        self.complete().await
    }

    async fn walk(
        &mut self,
        root: &NodeId,
        max_depth: Option<u32>,
        direction: Direction,
        floor: u8,
        span: u8,
    ) -> Result<Walk> {
        let domain = Arc::clone(&self.domain);
        let graph = Arc::clone(&self.graph);
        let specs = domain.specs(direction);
        let queries = domain.queries(direction);

        let mut queue = VecDeque::from([(root.clone(), max_depth)]);
        let mut expanded = 0usize;

        while let Some((node, remaining)) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                return Err(Halt::Cancelled.into());
            }
            if remaining == Some(0) {
                continue;
            }
            if !self.visited.entry(direction).or_default().insert(node.clone()) {
                continue;
            }

            let claims = match self.guarded(graph.fetch_edges(&node, &queries)).await {
                Fetch::Done(claims) => claims,
                Fetch::Cancelled => return Err(Halt::Cancelled.into()),
                Fetch::Failed(reason) if node == *root => return Ok(Walk::RootFailed(reason)),
                Fetch::Failed(reason) => {
                    tracing::warn!(
                        run_id = %self.run_id,
                        node = %node,
                        direction = %direction,
                        error = %reason,
                        "Fetch failed, treating node as leaf"
                    );
                    continue;
                }
            };
            expanded += 1;

            let mut wanted: Vec<NodeId> = claims.iter().map(|claim| claim.node.clone()).collect();
            wanted.push(node.clone());
            self.ensure_labels(&wanted).await?;

            if self.config.emit_progress {
                let done = expanded as f32 / (expanded + queue.len()) as f32;
                let percent = floor + (span as f32 * done) as u8;
                let message = match direction {
                    Direction::Up => format!("Exploring ancestors of {}", self.label_of(&node)),
                    Direction::Down => format!("Exploring descendants of {}", self.label_of(&node)),
                };
                self.report(message, percent).await?;
            }

            let partners = match direction {
                Direction::Down => self.partners(&node, specs, &claims),
                Direction::Up => Vec::new(),
            };
            let next = remaining.map(|depth| depth - 1);

            for claim in &claims {
                let Some(spec) = specs.iter().find(|spec| claim.matches(&spec.query)) else {
                    continue;
                };
                if claim.node == node {
                    continue;
                }

                self.record(spec.edge(&node, &claim.node, direction)).await?;
                self.describe(&claim.node).await?;

                if !partners.is_empty() && self.is_child_spec(spec) {
                    self.link_co_parents(&claim.node, &node, &partners).await?;
                }
                if spec.expand {
                    queue.push_back((claim.node.clone(), next));
                }
            }
        }

        Ok(Walk::Done)
    }

    /// Partners of `node` among the claims of a downward fetch
    fn partners(&self, node: &NodeId, specs: &[RelationSpec], claims: &[Claim]) -> Vec<NodeId> {
        let Some(rule) = &self.domain.co_parent else {
            return Vec::new();
        };
        claims
            .iter()
            .filter(|claim| claim.node != *node)
            .filter(|claim| {
                specs
                    .iter()
                    .any(|spec| spec.kind == rule.partner_kind && claim.matches(&spec.query))
            })
            .map(|claim| claim.node.clone())
            .collect()
    }

    fn is_child_spec(&self, spec: &RelationSpec) -> bool {
        self.domain
            .co_parent
            .as_ref()
            .is_some_and(|rule| spec.kind == rule.parent_kind && spec.orientation == Orientation::NodeIsTarget)
    }

    /// Emit `(child, parent_kind, partner)` for every partner the child also names as a parent
    async fn link_co_parents(&mut self, child: &NodeId, node: &NodeId, partners: &[NodeId]) -> Result<()> {
        let Some(rule) = self.domain.co_parent.clone() else {
            return Ok(());
        };
        let graph = Arc::clone(&self.graph);

        let parents = match self.guarded(graph.fetch_edges(child, &rule.parent_queries)).await {
            Fetch::Done(claims) => claims,
            Fetch::Cancelled => return Err(Halt::Cancelled.into()),
            Fetch::Failed(reason) => {
                tracing::warn!(run_id = %self.run_id, node = %child, error = %reason, "Parent lookup failed");
                return Ok(());
            }
        };

        for parent in parents.iter().map(|claim| &claim.node) {
            if parent != node && partners.contains(parent) {
                let edge = Edge::new(child.clone(), rule.parent_kind, parent.clone(), Direction::Down);
                self.record(edge).await?;
            }
        }
        Ok(())
    }

    async fn record(&mut self, edge: Edge) -> Result<()> {
        if !self.emitted.insert(edge.key()) {
            return Ok(());
        }

        let relationship = Relationship::new(
            self.label_of(&edge.source),
            edge.relation.as_str(),
            self.label_of(&edge.target),
        );
        tracing::debug!(
            run_id = %self.run_id,
            source = %edge.source,
            relation = %edge.relation,
            target = %edge.target,
            "Edge discovered"
        );
        self.relationships.push(relationship.clone());
        self.emit(TraversalEvent::EdgeDiscovered { edge, relationship }).await
    }

    /// Details of a node, once per run
    async fn describe(&mut self, id: &NodeId) -> Result<()> {
        if !self.described.insert(id.clone()) {
            return Ok(());
        }

        let domain = Arc::clone(&self.domain);
        let graph = Arc::clone(&self.graph);
        let attributes = match self.guarded(graph.fetch_details(id, &domain.details)).await {
            Fetch::Done(attributes) => attributes,
            Fetch::Cancelled => return Err(Halt::Cancelled.into()),
            Fetch::Failed(reason) => {
                tracing::warn!(run_id = %self.run_id, node = %id, error = %reason, "Detail lookup failed");
                NodeAttributes::new()
            }
        };

        let mut node = Node::new(id.clone());
        if let Some(label) = self.labels.get(id) {
            node = node.with_label(label.clone());
        }
        self.emit(TraversalEvent::NodeDetailsDiscovered { node, attributes }).await
    }

    /// Resolve labels not yet in the run cache, in one backend call
    async fn ensure_labels(&mut self, ids: &[NodeId]) -> Result<()> {
        let mut missing: Vec<NodeId> = ids
            .iter()
            .filter(|id| !self.labels.contains_key(*id))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        if missing.is_empty() {
            return Ok(());
        }

        let graph = Arc::clone(&self.graph);
        match self.guarded(graph.resolve_labels(&missing)).await {
            Fetch::Done(labels) => self.labels.extend(labels),
            Fetch::Cancelled => return Err(Halt::Cancelled.into()),
            Fetch::Failed(reason) => {
                tracing::warn!(run_id = %self.run_id, count = missing.len(), error = %reason, "Label lookup failed");
            }
        }
        Ok(())
    }

    fn label_of(&self, id: &NodeId) -> String {
        self.labels
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    async fn report(&mut self, message: String, percent: u8) -> Result<()> {
        self.progress = self.progress.max(percent.min(100));
        let percent = self.progress;
        self.emit(TraversalEvent::progress(message, percent)).await
    }

    async fn fail(&mut self, reason: impl Into<String>) -> Result<RunOutcome> {
        let reason = reason.into();
        tracing::warn!(run_id = %self.run_id, reason = %reason, "Traversal failed");
        self.emit(TraversalEvent::failed(reason)).await?;
        Ok(RunOutcome::Failed)
    }

    async fn complete(&mut self) -> Result<RunOutcome> {
        let total_edges = self.relationships.len();
        self.emit(TraversalEvent::Completed {
            total_edges,
            relationships: self.relationships.clone(),
        })
        .await?;
        Ok(RunOutcome::Completed { total_edges })
    }

    async fn emit(&mut self, event: TraversalEvent) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Halt::Cancelled.into());
        }
        self.events
            .send(event)
            .await
            .map_err(|_| Halt::Disconnected)?;
        Ok(())
    }

    /// Backend call bounded by the fetch timeout and interrupted by cancellation
    async fn guarded<T, F>(&self, fetch: F) -> Fetch<T>
    where
        F: Future<Output = lineage_kg::Result<T>>,
    {
        let timeout = self.config.fetch_timeout;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Fetch::Cancelled,
            result = tokio::time::timeout(timeout, fetch) => match result {
                Ok(Ok(value)) => Fetch::Done(value),
                Ok(Err(e)) => Fetch::Failed(e.to_string()),
                Err(_) => Fetch::Failed(KgError::Timeout(timeout).to_string()),
            },
        }
    }
}
