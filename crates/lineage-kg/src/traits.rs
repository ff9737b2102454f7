use crate::error::Result;
use async_trait::async_trait;
use lineage_types::{Candidate, NodeAttributes, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backend contract consumed by the traversal engine and the title resolver.
///
/// Implementations are shared by every session, so they must be safe for
/// concurrent use.
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Map a title (or redirect) to a node id and its canonical title
    async fn resolve_title(&self, name: &str) -> Result<Option<ResolvedTitle>>;

    /// Claims of `node` for the given properties, grouped in query order
    async fn fetch_edges(&self, node: &NodeId, queries: &[PropertyQuery]) -> Result<Vec<Claim>>;

    /// Human-readable labels; ids without a label are absent from the map
    async fn resolve_labels(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, String>>;

    /// Full-text title search
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Candidate>>;

    /// Domain attributes of a node; fields without a value are omitted
    async fn fetch_details(&self, node: &NodeId, fields: &[DetailField]) -> Result<NodeAttributes>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTitle {
    pub id: NodeId,
    pub title: String,
}

impl ResolvedTitle {
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Whether a property is read from the node's own claims or from claims
/// other entities make about the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyQuery {
    pub property: String,
    pub lookup: Lookup,
}

impl PropertyQuery {
    pub fn forward(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            lookup: Lookup::Forward,
        }
    }

    pub fn reverse(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            lookup: Lookup::Reverse,
        }
    }
}

/// One hit for a [`PropertyQuery`]: the entity on the other end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub property: String,
    pub lookup: Lookup,
    pub node: NodeId,
}

impl Claim {
    pub fn matches(&self, query: &PropertyQuery) -> bool {
        self.lookup == query.lookup && self.property == query.property
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    /// Year of a time value (negative for BCE)
    Year,
    /// Plain string or external identifier
    Text,
    /// Numeric amount
    Quantity,
    /// Commons file name turned into a URL
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailField {
    /// Attribute name on the wire (`birth_year`, `iso_code`, ...)
    pub key: String,
    pub property: String,
    pub kind: DetailKind,
}

impl DetailField {
    pub fn new(key: impl Into<String>, property: impl Into<String>, kind: DetailKind) -> Self {
        Self {
            key: key.into(),
            property: property.into(),
            kind,
        }
    }
}
