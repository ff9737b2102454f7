#![allow(dead_code)]

use lineage_api::{config::Config, protocol::ServerMessage, state::AppState};
use lineage_kg::StaticGraph;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub fn config(domain: &str) -> Config {
    let text = format!(
        r#"
        [server]
        host = "127.0.0.1"
        port = 0
        request_timeout_secs = 5

        [cors]
        enabled = false
        origins = []

        [explorer]
        domain = "{}"
        default_depth = 2
        fetch_timeout_ms = 500
        candidate_limit = 10
        expand_depth = 1
        channel_capacity = 64

        [logging]
        level = "debug"
        format = "pretty"
        "#,
        domain
    );
    toml::from_str(&text).unwrap()
}

pub fn state(graph: StaticGraph, domain: &str) -> Arc<AppState> {
    Arc::new(AppState::from_graph(config(domain), Arc::new(graph)).unwrap())
}

pub fn einstein() -> StaticGraph {
    StaticGraph::new()
        .with_node("Q937", "Albert Einstein")
        .with_node("Q88665", "Hermann Einstein")
        .with_node("Q76346", "Mileva Marić")
        .with_node("Q123371", "Hans Albert Einstein")
        .with_claim("Q937", "P22", "Q88665")
        .with_claim("Q937", "P26", "Q76346")
        .with_claim("Q937", "P40", "Q123371")
        .with_claim("Q123371", "P22", "Q937")
        .with_detail("Q937", "birth_year", 1879)
        .with_detail("Q937", "death_year", 1955)
}

/// Adds Hans Albert's son, one level below the depth-2 tree
pub fn einstein_grandson() -> StaticGraph {
    einstein()
        .with_node("Q118253", "Bernhard Caesar Einstein")
        .with_claim("Q123371", "P40", "Q118253")
}

pub fn languages() -> StaticGraph {
    StaticGraph::new()
        .with_node("Q3072036", "Fingallian")
        .with_node("Q1418547", "Fingal")
        .with_node("Q1160046", "Anglic languages")
        .with_redirect("Fingalian", "Q3072036")
        .with_claim("Q3072036", "P279", "Q1160046")
        .with_snippet("Fingallian", "extinct Anglic language of Fingal")
}

pub fn big_cats() -> StaticGraph {
    StaticGraph::new()
        .with_node("Q140", "Lion")
        .with_node("Q127960", "Panthera")
        .with_node("Q3736439", "Pantherinae")
        .with_node("Q25265", "Felidae")
        .with_claim("Q140", "P171", "Q127960")
        .with_claim("Q127960", "P171", "Q3736439")
        .with_claim("Q3736439", "P171", "Q25265")
}

/// Messages up to and including the first terminal one
pub async fn until_terminal(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("session channel closed");
        let terminal = message.is_terminal();
        messages.push(message);
        if terminal {
            return messages;
        }
    }
}

/// Whether anything else arrives within `wait`
pub async fn stays_quiet(rx: &mut mpsc::Receiver<ServerMessage>, wait: Duration) -> bool {
    tokio::time::timeout(wait, rx.recv()).await.is_err()
}
