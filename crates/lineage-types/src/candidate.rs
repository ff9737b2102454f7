use serde::{Deserialize, Serialize};

/// One disambiguation option offered to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    pub url: String,
}

impl Candidate {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        let title = title.into();
        let url = Self::wiki_url(&title);
        Self {
            title,
            snippet: snippet.into(),
            url,
        }
    }

    /// English Wikipedia article URL for a title
    pub fn wiki_url(title: &str) -> String {
        format!("https://en.wikipedia.org/wiki/{}", title.trim().replace(' ', "_"))
    }
}
