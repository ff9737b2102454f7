use serde::{Deserialize, Serialize};
use std::time::Duration;

const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
const WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";
const SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
const USER_AGENT: &str = "Lineage/0.1 (relationship tree explorer)";

/// Endpoints and limits for [`super::WikidataClient`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikidataConfig {
    pub wikipedia_api: String,
    pub wikidata_api: String,
    pub sparql_endpoint: String,
    pub user_agent: String,
    /// Label language
    pub language: String,
    pub timeout: Duration,
    /// Best-effort spacing between consecutive requests
    pub min_interval: Duration,
    /// Row cap for reverse (SPARQL) lookups
    pub reverse_limit: usize,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            wikipedia_api: WIKIPEDIA_API.to_string(),
            wikidata_api: WIKIDATA_API.to_string(),
            sparql_endpoint: SPARQL_ENDPOINT.to_string(),
            user_agent: USER_AGENT.to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(10),
            min_interval: Duration::from_millis(50),
            reverse_limit: 200,
        }
    }
}

impl WikidataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point every endpoint at one base URL (`{base}/w/api.php`, `{base}/wd/api.php`, `{base}/sparql`)
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.wikipedia_api = format!("{}/w/api.php", base);
        self.wikidata_api = format!("{}/wd/api.php", base);
        self.sparql_endpoint = format!("{}/sparql", base);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_reverse_limit(mut self, limit: usize) -> Self {
        self.reverse_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_override() {
        let config = WikidataConfig::new().with_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.wikipedia_api, "http://127.0.0.1:1234/w/api.php");
        assert_eq!(config.wikidata_api, "http://127.0.0.1:1234/wd/api.php");
        assert_eq!(config.sparql_endpoint, "http://127.0.0.1:1234/sparql");
    }
}
