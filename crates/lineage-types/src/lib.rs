pub mod node;
pub mod edge;
pub mod candidate;
pub mod config;
pub mod request;
pub mod events;

pub use node::{Node, NodeAttributes, NodeId};
pub use edge::{Direction, Edge, EdgeKey, RelationKind, Relationship};
pub use candidate::Candidate;
pub use config::TraversalConfig;
pub use request::{ExploreRequest, RootRef, TraversalDirection};
pub use events::TraversalEvent;
