use lineage_graph::{
    CancelToken, DomainAdapter, ExploreRequest, Explorer, RunOutcome, TraversalConfig,
    TraversalDirection, TraversalEvent,
};
use lineage_kg::StaticGraph;
use lineage_types::{Relationship, RelationKind};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn explorer(graph: StaticGraph, domain: DomainAdapter) -> (Explorer, Arc<StaticGraph>) {
    let graph = Arc::new(graph);
    let explorer = Explorer::builder()
        .graph(graph.clone())
        .domain(domain)
        .config(TraversalConfig::new().with_fetch_timeout(Duration::from_millis(500)))
        .build()
        .unwrap();
    (explorer, graph)
}

fn einstein() -> StaticGraph {
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

fn big_cats() -> StaticGraph {
    StaticGraph::new()
        .with_node("Q140", "Lion")
        .with_node("Q127960", "Panthera")
        .with_node("Q3736439", "Pantherinae")
        .with_node("Q25265", "Felidae")
        .with_node("Q138262", "Feliformia")
        .with_claim("Q140", "P171", "Q127960")
        .with_claim("Q127960", "P171", "Q3736439")
        .with_claim("Q3736439", "P171", "Q25265")
        .with_claim("Q25265", "P171", "Q138262")
}

fn relationships(events: &[TraversalEvent]) -> Vec<Relationship> {
    events
        .iter()
        .filter_map(|event| match event {
            TraversalEvent::EdgeDiscovered { relationship, .. } => Some(relationship.clone()),
            _ => None,
        })
        .collect()
}

fn rel(a: &str, kind: &str, b: &str) -> Relationship {
    Relationship::new(a, kind, b)
}

#[tokio::test]
async fn test_einstein_family_depth_two() {
    let (explorer, _) = explorer(einstein(), DomainAdapter::family());

    let events = explorer
        .collect(ExploreRequest::from_title("Albert Einstein", Some(2)))
        .await;

    let found: HashSet<Relationship> = relationships(&events).into_iter().collect();
    let expected: HashSet<Relationship> = [
        rel("Albert Einstein", "child-of", "Hermann Einstein"),
        rel("Albert Einstein", "spouse-of", "Mileva Marić"),
        rel("Hans Albert Einstein", "child-of", "Albert Einstein"),
    ]
    .into_iter()
    .collect();
    assert_eq!(found, expected);

    match events.last() {
        Some(TraversalEvent::Completed { total_edges, relationships }) => {
            assert_eq!(*total_edges, 3);
            assert_eq!(relationships.len(), 3);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_details_emitted_once_per_node() {
    let (explorer, _) = explorer(einstein(), DomainAdapter::family());

    let events = explorer
        .collect(ExploreRequest::from_id("Q937", Some(3)))
        .await;

    let described: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            TraversalEvent::NodeDetailsDiscovered { node, attributes } => Some((node, attributes)),
            _ => None,
        })
        .collect();
    let ids: HashSet<_> = described.iter().map(|(node, _)| node.id.as_str()).collect();
    assert_eq!(described.len(), ids.len());
    assert_eq!(ids.len(), 4);

    let (root, attributes) = described[0];
    assert_eq!(root.label.as_deref(), Some("Albert Einstein"));
    assert_eq!(attributes["birth_year"], 1879);
}

#[tokio::test]
async fn test_far_end_details_precede_its_expansion() {
    let (explorer, _) = explorer(big_cats(), DomainAdapter::species());

    let events = explorer
        .collect(ExploreRequest::from_id("Q140", Some(2)).with_direction(TraversalDirection::Up))
        .await;

    // Panthera's details go out before the edge found by expanding Panthera
    let details = events.iter().position(|event| {
        matches!(event, TraversalEvent::NodeDetailsDiscovered { node, .. } if node.id.as_str() == "Q127960")
    });
    let expansion = events.iter().position(|event| {
        matches!(event, TraversalEvent::EdgeDiscovered { edge, .. } if edge.source.as_str() == "Q127960")
    });
    assert!(details.is_some());
    assert!(expansion.is_some());
    assert!(details < expansion);
}

#[tokio::test]
async fn test_depth_zero_only_completes() {
    let (explorer, graph) = explorer(einstein(), DomainAdapter::family());

    let events = explorer
        .collect(ExploreRequest::from_id("Q937", Some(0)))
        .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        TraversalEvent::Completed { total_edges: 0, relationships } if relationships.is_empty()
    ));
    assert_eq!(graph.fetch_count(), 0);
}

#[tokio::test]
async fn test_depth_is_respected_per_direction() {
    let (explorer, _) = explorer(big_cats(), DomainAdapter::species());

    let events = explorer
        .collect(ExploreRequest::from_id("Q127960", Some(2)))
        .await;

    let found: HashSet<Relationship> = relationships(&events).into_iter().collect();
    let expected: HashSet<Relationship> = [
        rel("Panthera", "member-of", "Pantherinae"),
        rel("Pantherinae", "member-of", "Felidae"),
        rel("Lion", "member-of", "Panthera"),
    ]
    .into_iter()
    .collect();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn test_unbounded_depth_walks_whole_chain() {
    let (explorer, _) = explorer(big_cats(), DomainAdapter::species());

    let events = explorer
        .collect(ExploreRequest::from_id("Q140", None).with_direction(TraversalDirection::Up))
        .await;

    assert_eq!(relationships(&events).len(), 4);
}

#[tokio::test]
async fn test_cycles_terminate() {
    let graph = StaticGraph::new()
        .with_node("QA", "A")
        .with_node("QB", "B")
        .with_node("QC", "C")
        .with_claim("QA", "P279", "QB")
        .with_claim("QB", "P279", "QC")
        .with_claim("QC", "P279", "QA");
    let (explorer, graph) = explorer(graph, DomainAdapter::language());

    let events = tokio::time::timeout(
        Duration::from_secs(5),
        explorer.collect(ExploreRequest::from_id("QA", None)),
    )
    .await
    .expect("traversal should terminate");

    assert_eq!(relationships(&events).len(), 3);

    // Each node expanded once upward and once downward
    let fetched = graph.fetched_nodes();
    assert_eq!(fetched.len(), 6);
    for id in ["QA", "QB", "QC"] {
        assert_eq!(fetched.iter().filter(|n| n.as_str() == id).count(), 2);
    }
}

#[tokio::test]
async fn test_edges_are_never_repeated() {
    let graph = einstein()
        .with_claim("Q937", "P22", "Q88665")
        .with_claim("Q76346", "P26", "Q937")
        .with_claim("Q937", "P26", "Q76346");
    let (explorer, _) = explorer(graph, DomainAdapter::family());

    let events = explorer
        .collect(ExploreRequest::from_id("Q937", Some(5)))
        .await;

    let keys: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            TraversalEvent::EdgeDiscovered { edge, .. } => Some(edge.key()),
            _ => None,
        })
        .collect();
    let unique: HashSet<_> = keys.iter().cloned().collect();
    assert_eq!(keys.len(), unique.len());
    assert_eq!(keys.len(), 3);
}

#[tokio::test]
async fn test_co_parent_edges() {
    let graph = StaticGraph::new()
        .with_node("Q937", "Albert Einstein")
        .with_node("Q76346", "Mileva Marić")
        .with_node("Q123371", "Hans Albert Einstein")
        .with_node("Q118253", "Eduard Einstein")
        .with_claim("Q937", "P26", "Q76346")
        .with_claim("Q937", "P40", "Q123371")
        .with_claim("Q937", "P40", "Q118253")
        .with_claim("Q123371", "P22", "Q937")
        .with_claim("Q123371", "P25", "Q76346")
        .with_claim("Q118253", "P22", "Q937");
    let (explorer, _) = explorer(graph, DomainAdapter::family());

    let events = explorer
        .collect(ExploreRequest::from_id("Q937", Some(1)).with_direction(TraversalDirection::Down))
        .await;

    let found = relationships(&events);
    assert!(found.contains(&rel("Hans Albert Einstein", "child-of", "Mileva Marić")));
    assert!(!found.contains(&rel("Eduard Einstein", "child-of", "Mileva Marić")));
    assert_eq!(
        found
            .iter()
            .filter(|r| r.entity1 == "Hans Albert Einstein" && r.entity2 == "Albert Einstein")
            .count(),
        1
    );
    assert_eq!(found.len(), 4);

    let co_parent = events.iter().find_map(|event| match event {
        TraversalEvent::EdgeDiscovered { edge, relationship } if relationship.entity2 == "Mileva Marić"
            && relationship.relationship == "child-of" => Some(edge.clone()),
        _ => None,
    });
    assert_eq!(co_parent.map(|edge| edge.relation), Some(RelationKind::ChildOf));
}

#[tokio::test]
async fn test_failing_node_becomes_leaf() {
    let (explorer, _) = explorer(big_cats().with_failure("Q127960"), DomainAdapter::species());

    let events = explorer
        .collect(ExploreRequest::from_id("Q140", Some(4)).with_direction(TraversalDirection::Up))
        .await;

    assert_eq!(relationships(&events), vec![rel("Lion", "member-of", "Panthera")]);
    assert!(matches!(events.last(), Some(TraversalEvent::Completed { total_edges: 1, .. })));
}

#[tokio::test]
async fn test_root_not_found_fails_fast() {
    let (explorer, graph) = explorer(einstein(), DomainAdapter::family());

    let events = explorer
        .collect(ExploreRequest::from_title("Nobody In Particular", Some(2)))
        .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], TraversalEvent::Failed { reason } if reason == "root not found"));
    assert_eq!(graph.fetch_count(), 0);
}

#[tokio::test]
async fn test_root_timeout_fails_run() {
    let graph = Arc::new(big_cats().with_latency(Duration::from_millis(200)));
    let explorer = Explorer::builder()
        .graph(graph)
        .domain(DomainAdapter::species())
        .fetch_timeout(Duration::from_millis(20))
        .build()
        .unwrap();

    let events = explorer
        .collect(ExploreRequest::from_id("Q140", Some(2)))
        .await;

    assert!(relationships(&events).is_empty());
    match events.last() {
        Some(TraversalEvent::Failed { reason }) => assert!(reason.contains("timed out")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_stops_run() {
    let (explorer, graph) = explorer(
        big_cats().with_latency(Duration::from_millis(30)),
        DomainAdapter::species(),
    );
    let cancel = CancelToken::new();

    let (mut rx, handle) = explorer.spawn_explore(
        ExploreRequest::from_id("Q140", None).with_direction(TraversalDirection::Up),
        cancel.clone(),
    );

    let first = rx.recv().await;
    assert!(first.is_some());
    cancel.cancel();

    let mut rest = Vec::new();
    while let Some(event) = rx.recv().await {
        rest.push(event);
    }

    assert_eq!(handle.await.unwrap(), RunOutcome::Cancelled);
    assert!(!rest.iter().any(|event| event.is_terminal()));
    assert!(graph.fetch_count() < 4);
}
