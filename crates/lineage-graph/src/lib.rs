pub mod cancel;
pub mod domain;
pub mod run;
pub mod explorer;
pub mod builder;
pub mod similarity;
pub mod resolver;

pub use cancel::CancelToken;
pub use domain::{CoParentRule, DomainAdapter, DomainKind, Orientation, RelationSpec};
pub use run::{RunOutcome, TraversalRun};
pub use explorer::Explorer;
pub use builder::ExplorerBuilder;
pub use resolver::{Resolution, ResolveError, TitleResolver};

// Re-export key types from lineage-types
pub use lineage_types::{
    Direction, Edge, ExploreRequest, Node, NodeId, Relationship, RootRef, TraversalConfig,
    TraversalDirection, TraversalEvent,
};
