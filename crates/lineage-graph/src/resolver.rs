use crate::similarity::{is_mismatch, similarity};
use lineage_kg::{KgError, KnowledgeGraph, ResolvedTitle};
use lineage_types::Candidate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("No match found for '{0}'")]
    NotFound(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Lookup failed: {0}")]
    Backend(#[from] KgError),
}

/// Outcome of resolving free text to a node
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedTitle),
    /// The client has to pick; never guessed on its behalf
    Ambiguous {
        query: String,
        candidates: Vec<Candidate>,
    },
}

/// Maps user input to a node id, falling back to ranked search candidates
/// when the direct lookup fails or looks like a different entity.
pub struct TitleResolver {
    graph: Arc<dyn KnowledgeGraph>,
    limit: usize,
    timeout: Duration,
}

impl TitleResolver {
    pub fn new(graph: Arc<dyn KnowledgeGraph>) -> Self {
        Self {
            graph,
            limit: DEFAULT_CANDIDATE_LIMIT,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn resolve(&self, query: &str) -> Result<Resolution, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        let resolved = self.bounded(self.graph.resolve_title(query)).await?;
        if let Some(resolved) = &resolved {
            if !is_mismatch(query, &resolved.title) {
                tracing::debug!(query = %query, id = %resolved.id, "Title resolved");
                return Ok(Resolution::Resolved(resolved.clone()));
            }
            tracing::info!(query = %query, title = %resolved.title, "Resolved title looks unrelated, asking for a choice");
        }

        let candidates = self.candidates(query, resolved.as_ref()).await?;
        if candidates.is_empty() {
            return Err(ResolveError::NotFound(query.to_string()));
        }

        Ok(Resolution::Ambiguous {
            query: query.to_string(),
            candidates,
        })
    }

    /// Resolve a title the client picked from a candidate list, without the mismatch check
    pub async fn resolve_exact(&self, title: &str) -> Result<ResolvedTitle, ResolveError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        self.bounded(self.graph.resolve_title(title))
            .await?
            .ok_or_else(|| ResolveError::NotFound(title.to_string()))
    }

    /// Search hits ranked by similarity to the query
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        let limit = limit.clamp(1, self.limit);
        let hits = self.bounded(self.graph.search_titles(query, limit)).await?;
        let mut ranked = rank(query, hits);
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn candidates(
        &self,
        query: &str,
        resolved: Option<&ResolvedTitle>,
    ) -> Result<Vec<Candidate>, ResolveError> {
        let hits = match self.bounded(self.graph.search_titles(query, self.limit)).await {
            Ok(hits) => hits,
            Err(e) if resolved.is_some() => {
                tracing::warn!(query = %query, error = %e, "Title search failed");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let mut ranked = rank(query, hits);

        if let Some(resolved) = resolved {
            let position = ranked
                .iter()
                .position(|c| c.title.eq_ignore_ascii_case(&resolved.title));
            let first = match position {
                Some(index) => ranked.remove(index),
                None => Candidate::new(resolved.title.clone(), String::new()),
            };
            ranked.insert(0, first);
        }

        ranked.truncate(self.limit);
        Ok(ranked)
    }

    async fn bounded<T, F>(&self, lookup: F) -> Result<T, ResolveError>
    where
        F: Future<Output = lineage_kg::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ResolveError::Timeout(self.timeout)),
        }
    }
}

/// Stable sort by descending similarity, dropping duplicate titles
pub fn rank(query: &str, candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut scored: Vec<(f64, Candidate)> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if scored.iter().any(|(_, c)| c.title == candidate.title) {
            continue;
        }
        scored.push((similarity(query, &candidate.title), candidate));
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_by_similarity() {
        let ranked = rank(
            "Fingalian",
            vec![
                Candidate::new("Fingal", ""),
                Candidate::new("Portuguese language", ""),
                Candidate::new("Fingallian", ""),
                Candidate::new("Fingal", "duplicate"),
            ],
        );
        let titles: Vec<_> = ranked.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Fingallian", "Fingal", "Portuguese language"]);
    }
}
