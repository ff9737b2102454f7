use crate::protocol::command::ChoiceContext;
use lineage_types::{Candidate, Node, NodeAttributes, Relationship, TraversalEvent};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Wire envelope: `{"type": ..., "data": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetails {
    pub entity: String,
    pub qid: String,
    #[serde(flatten)]
    pub attributes: NodeAttributes,
}

impl NodeDetails {
    pub fn new(node: &Node, attributes: NodeAttributes) -> Self {
        Self {
            entity: node.display_name().to_string(),
            qid: node.id.to_string(),
            attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleChoices {
    pub query: String,
    pub context: ChoiceContext,
    pub results: Vec<Candidate>,
    #[serde(rename = "existingGraph", skip_serializing_if = "Option::is_none")]
    pub existing_graph: Option<Vec<Relationship>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(rename = "nodeLabel", skip_serializing_if = "Option::is_none")]
    pub node_label: Option<String>,
}

/// Outbound server message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Status {
        message: String,
        progress: u8,
    },
    Relationship(Relationship),
    /// Sent as `<domain>_details`
    Details {
        event: &'static str,
        details: NodeDetails,
    },
    TitleChoices(TitleChoices),
    ExpandComplete {
        label: String,
        added: Vec<Relationship>,
        merged: Vec<Relationship>,
    },
    Complete {
        total_relationships: usize,
        relationships: Vec<Relationship>,
    },
    Error {
        message: String,
    },
}

#[derive(Serialize)]
struct StatusData<'a> {
    message: &'a str,
    progress: u8,
}

#[derive(Serialize)]
struct ExpandCompleteData<'a> {
    label: &'a str,
    added: &'a [Relationship],
    merged: &'a [Relationship],
}

#[derive(Serialize)]
struct CompleteData<'a> {
    total_relationships: usize,
    relationships: &'a [Relationship],
}

#[derive(Serialize)]
struct ErrorData<'a> {
    message: &'a str,
}

impl ServerMessage {
    pub fn status(message: impl Into<String>, progress: u8) -> Self {
        Self::Status {
            message: message.into(),
            progress: progress.min(100),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Translate an engine event; `details_event` names the domain's details message
    pub fn from_event(event: TraversalEvent, details_event: &'static str) -> Self {
        match event {
            TraversalEvent::EdgeDiscovered { relationship, .. } => Self::Relationship(relationship),
            TraversalEvent::NodeDetailsDiscovered { node, attributes } => Self::Details {
                event: details_event,
                details: NodeDetails::new(&node, attributes),
            },
            TraversalEvent::Progress { message, percent } => Self::status(message, percent),
            TraversalEvent::Failed { reason } => Self::error(reason),
            TraversalEvent::Completed {
                total_edges,
                relationships,
            } => Self::Complete {
                total_relationships: total_edges,
                relationships,
            },
        }
    }

    /// Value of the envelope's `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Relationship(_) => "relationship",
            Self::Details { event, .. } => *event,
            Self::TitleChoices(_) => "title_choices",
            Self::ExpandComplete { .. } => "expand_complete",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TitleChoices(_) | Self::ExpandComplete { .. } | Self::Complete { .. } | Self::Error { .. }
        )
    }

    pub fn to_envelope(&self) -> Envelope {
        let data = match self {
            Self::Status { message, progress } => serde_json::to_value(StatusData {
                message,
                progress: *progress,
            }),
            Self::Relationship(relationship) => serde_json::to_value(relationship),
            Self::Details { details, .. } => serde_json::to_value(details),
            Self::TitleChoices(choices) => serde_json::to_value(choices),
            Self::ExpandComplete { label, added, merged } => serde_json::to_value(ExpandCompleteData {
                label,
                added,
                merged,
            }),
            Self::Complete {
                total_relationships,
                relationships,
            } => serde_json::to_value(CompleteData {
                total_relationships: *total_relationships,
                relationships,
            }),
            Self::Error { message } => serde_json::to_value(ErrorData { message }),
        };

        Envelope {
            kind: self.kind().to_string(),
            data: data.unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_envelope()).unwrap_or_default()
    }
}

impl Serialize for ServerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_envelope().serialize(serializer)
    }
}
