use lineage_kg::{
    DetailField, DetailKind, KgError, KnowledgeGraph, Lookup, PropertyQuery, WikidataClient,
    WikidataConfig,
};
use lineage_types::NodeId;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn client_for(server: &Server) -> WikidataClient {
    let config = WikidataConfig::new()
        .with_base_url(&server.url())
        .with_min_interval(Duration::ZERO)
        .with_timeout(Duration::from_secs(5));
    WikidataClient::new(config).unwrap()
}

fn einstein_entity() -> serde_json::Value {
    json!({
        "entities": {
            "Q937": {
                "id": "Q937",
                "claims": {
                    "P22": [{
                        "mainsnak": {"datavalue": {"type": "wikibase-entityid", "value": {"id": "Q88665"}}},
                        "rank": "normal"
                    }],
                    "P26": [
                        {
                            "mainsnak": {"datavalue": {"type": "wikibase-entityid", "value": {"id": "Q76346"}}},
                            "rank": "normal"
                        },
                        {
                            "mainsnak": {"datavalue": {"type": "wikibase-entityid", "value": {"id": "Q999"}}},
                            "rank": "deprecated"
                        }
                    ],
                    "P569": [{
                        "mainsnak": {"datavalue": {"type": "time", "value": {"time": "+1879-03-14T00:00:00Z"}}}
                    }],
                    "P18": [{
                        "mainsnak": {"datavalue": {"type": "string", "value": "Albert Einstein Head.jpg"}}
                    }]
                }
            }
        }
    })
}

#[tokio::test]
async fn test_resolve_title_follows_pageprops() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/w/api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("prop".into(), "pageprops".into()),
            Matcher::UrlEncoded("titles".into(), "Einstein".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "query": {"pages": [{
                    "pageid": 736,
                    "title": "Albert Einstein",
                    "pageprops": {"wikibase_item": "Q937"}
                }]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let resolved = client.resolve_title("Einstein").await.unwrap().unwrap();

    assert_eq!(resolved.id, NodeId::from("Q937"));
    assert_eq!(resolved.title, "Albert Einstein");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_resolve_title_missing_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/w/api.php")
        .match_query(Matcher::Any)
        .with_body(json!({"query": {"pages": [{"title": "Fingalian", "missing": true}]}}).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(client.resolve_title("Fingalian").await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_strips_snippet_markup() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/w/api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("list".into(), "search".into()),
            Matcher::UrlEncoded("srlimit".into(), "5".into()),
        ]))
        .with_body(
            json!({
                "query": {"search": [
                    {"title": "Fingallian", "snippet": "<span class=\"searchmatch\">Fingallian</span> dialect"},
                    {"title": "Fingal", "snippet": "county area"}
                ]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let results = client.search_titles("Fingalian", 5).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Fingallian");
    assert_eq!(results[0].snippet, "Fingallian dialect");
    assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/Fingallian");
}

#[tokio::test]
async fn test_forward_edges_skip_deprecated_claims() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/wd/api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("action".into(), "wbgetentities".into()),
            Matcher::UrlEncoded("ids".into(), "Q937".into()),
            Matcher::UrlEncoded("props".into(), "claims".into()),
        ]))
        .with_body(einstein_entity().to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let claims = client
        .fetch_edges(
            &NodeId::from("Q937"),
            &[PropertyQuery::forward("P22"), PropertyQuery::forward("P25"), PropertyQuery::forward("P26")],
        )
        .await
        .unwrap();

    let targets: Vec<_> = claims.iter().map(|c| (c.property.as_str(), c.node.as_str())).collect();
    assert_eq!(targets, vec![("P22", "Q88665"), ("P26", "Q76346")]);
    assert!(claims.iter().all(|c| c.lookup == Lookup::Forward));
}

#[tokio::test]
async fn test_reverse_edges_use_sparql() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/sparql")
        .match_query(Matcher::UrlEncoded("format".into(), "json".into()))
        .with_body(
            json!({
                "results": {"bindings": [
                    {"item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q140"}},
                    {"item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q3736439"}}
                ]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let claims = client
        .fetch_edges(&NodeId::from("Q127960"), &[PropertyQuery::reverse("P171")])
        .await
        .unwrap();

    let ids: Vec<_> = claims.iter().map(|c| c.node.as_str()).collect();
    assert_eq!(ids, vec!["Q140", "Q3736439"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_reverse_lookup_rejects_bad_ids() {
    let server = Server::new_async().await;
    let client = client_for(&server);

    let err = client
        .fetch_edges(&NodeId::from("Q1 } UNION {"), &[PropertyQuery::reverse("P171")])
        .await
        .unwrap_err();
    assert!(matches!(err, KgError::InvalidId(_)));
}

#[tokio::test]
async fn test_labels_and_details() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/wd/api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("props".into(), "labels".into()),
            Matcher::UrlEncoded("languages".into(), "en".into()),
        ]))
        .with_body(
            json!({
                "entities": {
                    "Q937": {"labels": {"en": {"language": "en", "value": "Albert Einstein"}}},
                    "Q88665": {"labels": {"en": {"language": "en", "value": "Hermann Einstein"}}},
                    "Q1": {"labels": {}}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/wd/api.php")
        .match_query(Matcher::UrlEncoded("props".into(), "claims".into()))
        .with_body(einstein_entity().to_string())
        .create_async()
        .await;

    let client = client_for(&server);

    let labels = client
        .resolve_labels(&[NodeId::from("Q937"), NodeId::from("Q88665"), NodeId::from("Q1")])
        .await
        .unwrap();
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[&NodeId::from("Q88665")], "Hermann Einstein");

    let details = client
        .fetch_details(
            &NodeId::from("Q937"),
            &[
                DetailField::new("birth_year", "P569", DetailKind::Year),
                DetailField::new("death_year", "P570", DetailKind::Year),
                DetailField::new("image_url", "P18", DetailKind::Image),
            ],
        )
        .await
        .unwrap();
    assert_eq!(details["birth_year"], json!(1879));
    assert!(details.get("death_year").is_none());
    assert_eq!(
        details["image_url"],
        json!("https://commons.wikimedia.org/wiki/Special:FilePath/Albert_Einstein_Head.jpg")
    );
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/wd/api.php")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .fetch_edges(&NodeId::from("Q937"), &[PropertyQuery::forward("P22")])
        .await
        .unwrap_err();

    assert!(matches!(err, KgError::Status { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_error_body_cut_on_char_boundary() {
    let mut server = Server::new_async().await;
    let body = format!("{}é tail", "a".repeat(199));
    server
        .mock("GET", "/wd/api.php")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body(body)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .fetch_edges(&NodeId::from("Q937"), &[PropertyQuery::forward("P22")])
        .await
        .unwrap_err();

    match err {
        KgError::Status { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message.chars().count(), 200);
            assert!(message.ends_with('é'));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}
