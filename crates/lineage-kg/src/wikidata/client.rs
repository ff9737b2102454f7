// Wikipedia/Wikidata client implementation

use crate::error::{KgError, Result};
use crate::traits::{Claim, DetailField, DetailKind, KnowledgeGraph, Lookup, PropertyQuery, ResolvedTitle};
use crate::wikidata::config::WikidataConfig;
use crate::wikidata::types::{
    ApiErrorBody, DataValue, EntitiesResponse, Entity, PagesQuery, QueryResponse, SearchQuery,
    SparqlResponse,
};
use async_trait::async_trait;
use lineage_types::{Candidate, NodeAttributes, NodeId};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;

/// `wbgetentities` accepts at most 50 ids per call
const ENTITY_BATCH: usize = 50;
const COMMONS_FILE_PATH: &str = "https://commons.wikimedia.org/wiki/Special:FilePath/";

/// Knowledge graph backed by the public Wikipedia and Wikidata APIs (HTTP direct, no SDK)
pub struct WikidataClient {
    http_client: reqwest::Client,
    config: WikidataConfig,
    last_request: Mutex<Option<Instant>>,
}

impl WikidataClient {
    pub fn new(config: WikidataConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            config,
            last_request: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &WikidataConfig {
        &self.config
    }

    /// Keep consecutive requests `min_interval` apart (best effort, not a token bucket)
    async fn throttle(&self) {
        if self.config.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_interval {
                tokio::time::sleep(self.config.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        self.throttle().await;

        let response = self
            .http_client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(200).collect();
            return Err(KgError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> KgError {
        if e.is_timeout() {
            KgError::Timeout(self.config.timeout)
        } else {
            KgError::Http(e)
        }
    }

    async fn get_entities(&self, ids: &[NodeId], props: &str) -> Result<HashMap<String, Entity>> {
        let mut entities = HashMap::new();

        for chunk in ids.chunks(ENTITY_BATCH) {
            let joined = chunk.iter().map(NodeId::as_str).collect::<Vec<_>>().join("|");
            let params = [
                ("action", "wbgetentities".to_string()),
                ("format", "json".to_string()),
                ("ids", joined),
                ("props", props.to_string()),
                ("languages", self.config.language.clone()),
            ];

            let response: EntitiesResponse = self.get_json(&self.config.wikidata_api, &params).await?;
            if let Some(error) = response.error {
                return Err(api_error(error));
            }
            entities.extend(response.entities);
        }

        Ok(entities)
    }

    async fn get_entity(&self, id: &NodeId, props: &str) -> Result<Entity> {
        let mut entities = self.get_entities(std::slice::from_ref(id), props).await?;
        Ok(entities.remove(id.as_str()).unwrap_or_default())
    }

    /// Entities whose `property` points at `node`
    async fn reverse_lookup(&self, node: &NodeId, property: &str) -> Result<Vec<NodeId>> {
        if !is_entity_id(node.as_str()) {
            return Err(KgError::InvalidId(node.to_string()));
        }
        if !is_property_id(property) {
            return Err(KgError::InvalidId(property.to_string()));
        }

        let query = format!(
            "SELECT ?item WHERE {{ ?item wdt:{} wd:{} . }} LIMIT {}",
            property, node, self.config.reverse_limit
        );
        let params = [("query", query), ("format", "json".to_string())];

        let response: SparqlResponse = self.get_json(&self.config.sparql_endpoint, &params).await?;

        Ok(response
            .results
            .bindings
            .iter()
            .filter_map(|row| row.get("item"))
            .filter_map(|binding| binding.value.rsplit('/').next())
            .filter(|id| is_entity_id(id))
            .map(NodeId::from)
            .collect())
    }
}

#[async_trait]
impl KnowledgeGraph for WikidataClient {
    async fn resolve_title(&self, name: &str) -> Result<Option<ResolvedTitle>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("formatversion", "2".to_string()),
            ("redirects", "1".to_string()),
            ("prop", "pageprops".to_string()),
            ("ppprop", "wikibase_item".to_string()),
            ("titles", name.to_string()),
        ];

        let response: QueryResponse<PagesQuery> = self.get_json(&self.config.wikipedia_api, &params).await?;
        if let Some(error) = response.error {
            return Err(api_error(error));
        }

        let resolved = response
            .query
            .into_iter()
            .flat_map(|q| q.pages)
            .filter(|page| !page.missing)
            .find_map(|page| {
                let item = page.pageprops.and_then(|p| p.wikibase_item)?;
                Some(ResolvedTitle::new(item, page.title))
            });

        tracing::debug!(query = %name, resolved = ?resolved, "Title lookup");
        Ok(resolved)
    }

    async fn fetch_edges(&self, node: &NodeId, queries: &[PropertyQuery]) -> Result<Vec<Claim>> {
        let entity = if queries.iter().any(|q| q.lookup == Lookup::Forward) {
            Some(self.get_entity(node, "claims").await?)
        } else {
            None
        };

        let mut claims = Vec::new();
        for query in queries {
            let targets: Vec<NodeId> = match query.lookup {
                Lookup::Forward => entity
                    .as_ref()
                    .and_then(|e| e.claims.get(&query.property))
                    .map(|statements| {
                        statements
                            .iter()
                            .filter(|s| !s.is_deprecated())
                            .filter_map(|s| s.mainsnak.datavalue.as_ref())
                            .filter_map(entity_id_of)
                            .collect()
                    })
                    .unwrap_or_default(),
                Lookup::Reverse => self.reverse_lookup(node, &query.property).await?,
            };

            claims.extend(targets.into_iter().map(|target| Claim {
                property: query.property.clone(),
                lookup: query.lookup,
                node: target,
            }));
        }

        Ok(claims)
    }

    async fn resolve_labels(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let entities = self.get_entities(ids, "labels").await?;
        let language = &self.config.language;

        Ok(entities
            .into_iter()
            .filter_map(|(id, entity)| {
                let mut labels = entity.labels;
                labels.remove(language).map(|label| (NodeId::from(id), label.value))
            })
            .collect())
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("formatversion", "2".to_string()),
            ("list", "search".to_string()),
            ("srsearch", query.trim().to_string()),
            ("srlimit", limit.max(1).to_string()),
        ];

        let response: QueryResponse<SearchQuery> = self.get_json(&self.config.wikipedia_api, &params).await?;
        if let Some(error) = response.error {
            return Err(api_error(error));
        }

        Ok(response
            .query
            .into_iter()
            .flat_map(|q| q.search)
            .map(|hit| Candidate::new(hit.title, strip_html(&hit.snippet)))
            .collect())
    }

    async fn fetch_details(&self, node: &NodeId, fields: &[DetailField]) -> Result<NodeAttributes> {
        let mut attributes = NodeAttributes::new();
        if fields.is_empty() {
            return Ok(attributes);
        }

        let entity = self.get_entity(node, "claims").await?;
        for field in fields {
            let value = entity
                .claims
                .get(&field.property)
                .and_then(|statements| {
                    statements
                        .iter()
                        .filter(|s| !s.is_deprecated())
                        .filter_map(|s| s.mainsnak.datavalue.as_ref())
                        .find_map(|dv| detail_value(dv, field.kind))
                });

            if let Some(value) = value {
                attributes.insert(field.key.clone(), value);
            }
        }

        Ok(attributes)
    }
}

fn api_error(error: ApiErrorBody) -> KgError {
    KgError::InvalidResponse(format!("{}: {}", error.code, error.info))
}

fn is_entity_id(id: &str) -> bool {
    id.len() > 1 && id.starts_with('Q') && id[1..].bytes().all(|b| b.is_ascii_digit())
}

fn is_property_id(id: &str) -> bool {
    id.len() > 1 && id.starts_with('P') && id[1..].bytes().all(|b| b.is_ascii_digit())
}

fn entity_id_of(datavalue: &DataValue) -> Option<NodeId> {
    if datavalue.kind != "wikibase-entityid" {
        return None;
    }
    datavalue.value.get("id")?.as_str().map(NodeId::from)
}

fn detail_value(datavalue: &DataValue, kind: DetailKind) -> Option<Value> {
    match kind {
        DetailKind::Year => {
            let time = datavalue.value.get("time")?.as_str()?;
            year_of(time).map(Value::from)
        }
        DetailKind::Text => match &datavalue.value {
            Value::String(s) => Some(Value::from(s.clone())),
            other => other.get("text").cloned(),
        },
        DetailKind::Quantity => {
            let amount = datavalue.value.get("amount")?.as_str()?;
            quantity_of(amount)
        }
        DetailKind::Image => datavalue.value.as_str().map(|file| Value::from(commons_url(file))),
    }
}

/// Year of a Wikibase time string such as `+1879-03-14T00:00:00Z` or `-0500-00-00T00:00:00Z`
pub(crate) fn year_of(time: &str) -> Option<i64> {
    let (sign, rest) = match time.as_bytes().first()? {
        b'-' => (-1, &time[1..]),
        b'+' => (1, &time[1..]),
        _ => (1, time),
    };
    let digits = rest.split('-').next()?;
    digits.parse::<i64>().ok().map(|year| sign * year)
}

pub(crate) fn quantity_of(amount: &str) -> Option<Value> {
    let trimmed = amount.trim_start_matches('+');
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(Value::from(n));
    }
    trimmed.parse::<f64>().ok().map(Value::from)
}

pub(crate) fn commons_url(file: &str) -> String {
    format!("{}{}", COMMONS_FILE_PATH, file.trim().replace(' ', "_"))
}

/// Drop markup from search snippets (`<span class="searchmatch">...</span>`) and decode common entities
pub(crate) fn strip_html(snippet: &str) -> String {
    let mut text = String::with_capacity(snippet.len());
    let mut in_tag = false;
    for c in snippet.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
