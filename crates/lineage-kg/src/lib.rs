pub mod error;
pub mod traits;
pub mod wikidata;
pub mod memory;
pub mod cache;

pub use error::{KgError, Result};
pub use traits::{
    KnowledgeGraph,
    ResolvedTitle,
    PropertyQuery, Lookup, Claim,
    DetailField, DetailKind,
};
pub use wikidata::{WikidataClient, WikidataConfig};
pub use memory::StaticGraph;
pub use cache::CachedGraph;
