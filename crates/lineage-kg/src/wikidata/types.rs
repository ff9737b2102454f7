// Response shapes of the MediaWiki action API and the SPARQL endpoint.
// Only the fields the client reads are modelled.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct QueryResponse<T> {
    pub query: Option<T>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

#[derive(Debug, Deserialize)]
pub struct PagesQuery {
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    pub pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
pub struct PageProps {
    pub wikibase_item: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
pub struct EntitiesResponse {
    #[serde(default)]
    pub entities: HashMap<String, Entity>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub labels: HashMap<String, LabelValue>,
    #[serde(default)]
    pub claims: HashMap<String, Vec<Statement>>,
}

#[derive(Debug, Deserialize)]
pub struct LabelValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct Statement {
    pub mainsnak: Snak,
    #[serde(default)]
    pub rank: Option<String>,
}

impl Statement {
    pub fn is_deprecated(&self) -> bool {
        self.rank.as_deref() == Some("deprecated")
    }
}

#[derive(Debug, Deserialize)]
pub struct Snak {
    pub datavalue: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
pub struct DataValue {
    pub value: Value,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct SparqlResponse {
    pub results: SparqlResults,
}

#[derive(Debug, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlBinding>>,
}

#[derive(Debug, Deserialize)]
pub struct SparqlBinding {
    pub value: String,
}
