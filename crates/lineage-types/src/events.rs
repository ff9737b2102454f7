use crate::edge::{Edge, Relationship};
use crate::node::{Node, NodeAttributes};
use serde::{Deserialize, Serialize};

/// Events produced by a traversal run, in discovery order.
///
/// A run emits any number of `EdgeDiscovered`, `NodeDetailsDiscovered` and
/// `Progress` events followed by exactly one terminal event (`Completed` or
/// `Failed`), unless it is cancelled, in which case it simply stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraversalEvent {
    /// New relationship, labels already resolved
    EdgeDiscovered {
        edge: Edge,
        relationship: Relationship,
    },

    /// Attributes of a node seen for the first time in this run
    NodeDetailsDiscovered {
        node: Node,
        attributes: NodeAttributes,
    },

    Progress {
        message: String,
        percent: u8,
    },

    /// The run could not start or the root failed
    Failed {
        reason: String,
    },

    Completed {
        total_edges: usize,
        relationships: Vec<Relationship>,
    },
}

impl TraversalEvent {
    pub fn progress(message: impl Into<String>, percent: u8) -> Self {
        Self::Progress {
            message: message.into(),
            percent: percent.min(100),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}
