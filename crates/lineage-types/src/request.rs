use crate::edge::Direction;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Where a traversal starts: an already resolved id or a title still to look up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RootRef {
    Id(NodeId),
    Title(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalDirection {
    Up,
    Down,
    #[default]
    Both,
}

impl TraversalDirection {
    /// Directions to run, in order
    pub fn phases(&self) -> &'static [Direction] {
        match self {
            Self::Up => &[Direction::Up],
            Self::Down => &[Direction::Down],
            Self::Both => &[Direction::Up, Direction::Down],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreRequest {
    pub root: RootRef,
    /// `None` explores without a depth bound
    pub max_depth: Option<u32>,
    pub direction: TraversalDirection,
}

impl ExploreRequest {
    pub fn new(root: RootRef, max_depth: Option<u32>) -> Self {
        Self {
            root,
            max_depth,
            direction: TraversalDirection::default(),
        }
    }

    pub fn from_id(id: impl Into<NodeId>, max_depth: Option<u32>) -> Self {
        Self::new(RootRef::Id(id.into()), max_depth)
    }

    pub fn from_title(title: impl Into<String>, max_depth: Option<u32>) -> Self {
        Self::new(RootRef::Title(title.into()), max_depth)
    }

    pub fn with_direction(mut self, direction: TraversalDirection) -> Self {
        self.direction = direction;
        self
    }
}
