pub mod client;
pub mod config;
pub mod types;

pub use client::WikidataClient;
pub use config::WikidataConfig;
