use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    ChildOf,
    SpouseOf,
    MemberOf,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChildOf => "child-of",
            Self::SpouseOf => "spouse-of",
            Self::MemberOf => "member-of",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of expansion at the time an edge was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub relation: RelationKind,
    pub direction: Direction,
}

/// Dedup key: exact `(source, relation, target)` tuple, the reverse is a different key
pub type EdgeKey = (NodeId, RelationKind, NodeId);

impl Edge {
    pub fn new(
        source: impl Into<NodeId>,
        relation: RelationKind,
        target: impl Into<NodeId>,
        direction: Direction,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            direction,
        }
    }

    pub fn key(&self) -> EdgeKey {
        (self.source.clone(), self.relation, self.target.clone())
    }
}

/// Labelled relationship as it travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub entity1: String,
    pub relationship: String,
    pub entity2: String,
}

impl Relationship {
    pub fn new(
        entity1: impl Into<String>,
        relationship: impl Into<String>,
        entity2: impl Into<String>,
    ) -> Self {
        Self {
            entity1: entity1.into(),
            relationship: relationship.into(),
            entity2: entity2.into(),
        }
    }
}
