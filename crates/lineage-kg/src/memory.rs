use crate::error::{KgError, Result};
use crate::traits::{Claim, DetailField, KnowledgeGraph, Lookup, PropertyQuery, ResolvedTitle};
use async_trait::async_trait;
use lineage_types::{Candidate, NodeAttributes, NodeId};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory knowledge graph.
///
/// Claims are `(subject, property, object)` triples kept in insertion order,
/// so fetches return edges in a stable order. Used as the offline backend in
/// tests and demos; supports failure and latency injection per node.
#[derive(Default)]
pub struct StaticGraph {
    claims: Vec<(NodeId, String, NodeId)>,
    labels: HashMap<NodeId, String>,
    titles: HashMap<String, ResolvedTitle>,
    details: HashMap<NodeId, NodeAttributes>,
    snippets: HashMap<String, String>,
    failing: HashSet<NodeId>,
    latency: Option<Duration>,
    fetch_log: Mutex<Vec<NodeId>>,
}

impl StaticGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity with its label and make its label resolvable as a title
    pub fn with_node(mut self, id: &str, label: &str) -> Self {
        self.labels.insert(NodeId::from(id), label.to_string());
        self.titles
            .insert(title_key(label), ResolvedTitle::new(id, label));
        self
    }

    /// Extra title (e.g. a redirect) that resolves to an existing node
    pub fn with_redirect(mut self, title: &str, id: &str) -> Self {
        let canonical = self
            .labels
            .get(&NodeId::from(id))
            .cloned()
            .unwrap_or_else(|| title.to_string());
        self.titles.insert(title_key(title), ResolvedTitle::new(id, canonical));
        self
    }

    pub fn with_claim(mut self, subject: &str, property: &str, object: &str) -> Self {
        self.claims
            .push((NodeId::from(subject), property.to_string(), NodeId::from(object)));
        self
    }

    pub fn with_detail(mut self, id: &str, key: &str, value: impl Into<Value>) -> Self {
        self.details
            .entry(NodeId::from(id))
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_snippet(mut self, title: &str, snippet: &str) -> Self {
        self.snippets.insert(title.to_string(), snippet.to_string());
        self
    }

    /// Every fetch for this node fails as if the backend were down
    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing.insert(NodeId::from(id));
        self
    }

    /// Delay applied to every edge fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Nodes whose edges were fetched, in call order
    pub fn fetched_nodes(&self) -> Vec<NodeId> {
        self.fetch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched_nodes().len()
    }

    fn record_fetch(&self, node: &NodeId) {
        if let Ok(mut log) = self.fetch_log.lock() {
            log.push(node.clone());
        }
    }

    fn candidate(&self, title: &str) -> Candidate {
        let snippet = self.snippets.get(title).cloned().unwrap_or_default();
        Candidate::new(title, snippet)
    }
}

fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Crude stand-in for full-text search: containment either way, or a shared
/// four-character prefix
fn loosely_matches(title: &str, query: &str) -> bool {
    let title = title.to_lowercase();
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return false;
    }
    if title.contains(&query) || query.contains(&title) {
        return true;
    }
    let prefix: String = query.chars().take(4).collect();
    prefix.chars().count() == 4 && title.starts_with(&prefix)
}

#[async_trait]
impl KnowledgeGraph for StaticGraph {
    async fn resolve_title(&self, name: &str) -> Result<Option<ResolvedTitle>> {
        Ok(self.titles.get(&title_key(name)).cloned())
    }

    async fn fetch_edges(&self, node: &NodeId, queries: &[PropertyQuery]) -> Result<Vec<Claim>> {
        self.record_fetch(node);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.contains(node) {
            return Err(KgError::Unavailable(format!("injected failure for {}", node)));
        }

        let mut claims = Vec::new();
        for query in queries {
            for (subject, property, object) in &self.claims {
                if property != &query.property {
                    continue;
                }
                let other = match query.lookup {
                    Lookup::Forward if subject == node => object,
                    Lookup::Reverse if object == node => subject,
                    _ => continue,
                };
                claims.push(Claim {
                    property: property.clone(),
                    lookup: query.lookup,
                    node: other.clone(),
                });
            }
        }

        Ok(claims)
    }

    async fn resolve_labels(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, String>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.labels.get(id).map(|label| (id.clone(), label.clone())))
            .collect())
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let mut titles: Vec<&str> = self
            .titles
            .values()
            .map(|resolved| resolved.title.as_str())
            .chain(self.snippets.keys().map(String::as_str))
            .filter(|title| loosely_matches(title, query))
            .collect();
        titles.sort_unstable();
        titles.dedup();

        Ok(titles
            .into_iter()
            .take(limit)
            .map(|title| self.candidate(title))
            .collect())
    }

    async fn fetch_details(&self, node: &NodeId, fields: &[DetailField]) -> Result<NodeAttributes> {
        if self.failing.contains(node) {
            return Err(KgError::Unavailable(format!("injected failure for {}", node)));
        }

        let stored = self.details.get(node);
        Ok(fields
            .iter()
            .filter_map(|field| {
                stored
                    .and_then(|attrs| attrs.get(&field.key))
                    .map(|value| (field.key.clone(), value.clone()))
            })
            .collect())
    }
}
