use lineage_graph::DomainAdapter;
use lineage_types::Relationship;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inbound client command, discriminated by its `action` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Explore from `query`. A missing or `null` depth falls back to the
    /// configured `explorer.default_depth`; use `fetch_full_tree` for an
    /// unbounded walk.
    Start {
        query: String,
        #[serde(default)]
        depth: Option<u32>,
    },
    ChooseTitle {
        title: String,
        #[serde(default)]
        context: ChoiceContext,
        #[serde(default)]
        depth: Option<u32>,
        #[serde(default, rename = "existingGraph")]
        existing_graph: Vec<Relationship>,
        #[serde(default, rename = "nodeLabel")]
        node_label: Option<String>,
    },
    ExpandNode {
        label: String,
        #[serde(default, rename = "existingGraph")]
        existing_graph: Vec<Relationship>,
    },
    FetchFullTree {
        #[serde(alias = "label")]
        query: String,
    },
    Cancel,
}

/// Which request a disambiguation round-trip resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceContext {
    #[default]
    Search,
    ExpandNode,
    FetchFullTree,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed command: {0}")]
    Malformed(String),

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Depth must be between {min} and {max}, got {depth}")]
    DepthOutOfRange { depth: u32, min: u32, max: u32 },
}

impl Command {
    /// Parse a text frame: a JSON command or the legacy `"name,depth"` form
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        if text.starts_with('{') {
            return serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()));
        }
        Self::parse_legacy(text)
    }

    fn parse_legacy(text: &str) -> Result<Self, ProtocolError> {
        let (name, depth) = match text.rsplit_once(',') {
            Some((name, depth)) => {
                let depth = depth.trim();
                let depth = if depth.is_empty() || depth.eq_ignore_ascii_case("null") {
                    None
                } else {
                    Some(depth.parse::<u32>().map_err(|_| {
                        ProtocolError::Malformed(format!("invalid depth '{}'", depth))
                    })?)
                };
                (name, depth)
            }
            None => (text, None),
        };

        Ok(Command::Start {
            query: name.trim().to_string(),
            depth,
        })
    }

    pub fn action(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::ChooseTitle { .. } => "choose_title",
            Command::ExpandNode { .. } => "expand_node",
            Command::FetchFullTree { .. } => "fetch_full_tree",
            Command::Cancel => "cancel",
        }
    }
}

/// Reject depths outside the domain's accepted range
pub fn validate_depth(domain: &DomainAdapter, depth: u32) -> Result<u32, ProtocolError> {
    if domain.accepts_depth(depth) {
        Ok(depth)
    } else {
        Err(ProtocolError::DepthOutOfRange {
            depth,
            min: *domain.depth_range.start(),
            max: *domain.depth_range.end(),
        })
    }
}

/// Trimmed, non-empty text
pub fn require_text(text: &str) -> Result<String, ProtocolError> {
    let text = text.trim();
    if text.is_empty() {
        Err(ProtocolError::EmptyQuery)
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_form() {
        assert_eq!(
            Command::parse("Albert Einstein,3").unwrap(),
            Command::Start { query: "Albert Einstein".into(), depth: Some(3) }
        );
        assert_eq!(
            Command::parse("Smith, John, 2").unwrap(),
            Command::Start { query: "Smith, John".into(), depth: Some(2) }
        );
        assert_eq!(
            Command::parse("Latin").unwrap(),
            Command::Start { query: "Latin".into(), depth: None }
        );
        assert!(matches!(Command::parse("Latin,deep"), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_null_depth_means_default() {
        assert_eq!(
            Command::parse(r#"{"action": "start", "query": "Latin", "depth": null}"#).unwrap(),
            Command::Start { query: "Latin".into(), depth: None }
        );
        assert_eq!(
            Command::parse(r#"{"action": "start", "query": "Latin"}"#).unwrap(),
            Command::Start { query: "Latin".into(), depth: None }
        );
    }

    #[test]
    fn test_depth_validation() {
        let family = DomainAdapter::family();
        assert_eq!(validate_depth(&family, 5), Ok(5));
        assert_eq!(
            validate_depth(&family, 6),
            Err(ProtocolError::DepthOutOfRange { depth: 6, min: 1, max: 5 })
        );
        assert!(validate_depth(&family, 0).is_err());
    }
}
