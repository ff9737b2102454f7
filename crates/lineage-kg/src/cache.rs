use crate::error::Result;
use crate::traits::{Claim, DetailField, KnowledgeGraph, PropertyQuery, ResolvedTitle};
use async_trait::async_trait;
use lineage_types::{Candidate, NodeAttributes, NodeId};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

/// Wraps a backend with a label cache shared by every session.
///
/// Only labels are cached; edges and details always go to the backend.
pub struct CachedGraph<G> {
    inner: G,
    labels: Mutex<LruCache<NodeId, String>>,
}

impl<G: KnowledgeGraph> CachedGraph<G> {
    pub fn new(inner: G, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            labels: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub async fn cached_labels(&self) -> usize {
        self.labels.lock().await.len()
    }
}

#[async_trait]
impl<G: KnowledgeGraph> KnowledgeGraph for CachedGraph<G> {
    async fn resolve_title(&self, name: &str) -> Result<Option<ResolvedTitle>> {
        self.inner.resolve_title(name).await
    }

    async fn fetch_edges(&self, node: &NodeId, queries: &[PropertyQuery]) -> Result<Vec<Claim>> {
        self.inner.fetch_edges(node, queries).await
    }

    async fn resolve_labels(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, String>> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        {
            let mut cache = self.labels.lock().await;
            for id in ids {
                match cache.get(id) {
                    Some(label) => {
                        found.insert(id.clone(), label.clone());
                    }
                    None => missing.push(id.clone()),
                }
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }

        let fetched = self.inner.resolve_labels(&missing).await?;
        {
            let mut cache = self.labels.lock().await;
            for (id, label) in &fetched {
                cache.put(id.clone(), label.clone());
            }
        }
        found.extend(fetched);
        Ok(found)
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        self.inner.search_titles(query, limit).await
    }

    async fn fetch_details(&self, node: &NodeId, fields: &[DetailField]) -> Result<NodeAttributes> {
        self.inner.fetch_details(node, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StaticGraph;

    #[tokio::test]
    async fn test_labels_are_cached() {
        let graph = StaticGraph::new()
            .with_node("Q1", "Alpha")
            .with_node("Q2", "Beta");
        let cached = CachedGraph::new(graph, 16);

        let ids = vec![NodeId::from("Q1"), NodeId::from("Q2"), NodeId::from("Q404")];
        let labels = cached.resolve_labels(&ids).await.unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[&NodeId::from("Q1")], "Alpha");
        assert_eq!(cached.cached_labels().await, 2);

        let again = cached.resolve_labels(&ids[..1]).await.unwrap();
        assert_eq!(again[&NodeId::from("Q1")], "Alpha");
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let graph = StaticGraph::new()
            .with_node("Q1", "Alpha")
            .with_node("Q2", "Beta")
            .with_node("Q3", "Gamma");
        let cached = CachedGraph::new(graph, 2);

        let ids = vec![NodeId::from("Q1"), NodeId::from("Q2"), NodeId::from("Q3")];
        cached.resolve_labels(&ids).await.unwrap();

        assert_eq!(cached.cached_labels().await, 2);
    }
}
