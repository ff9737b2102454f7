use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lineage_graph::{ExploreRequest, Resolution, TraversalEvent};
use lineage_types::Relationship;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    protocol::{command::validate_depth, ChoiceContext, NodeDetails, TitleChoices},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RelationshipsQuery {
    pub query: String,
    #[serde(default)]
    pub depth: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RootInfo {
    pub qid: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct RelationshipsResponse {
    pub query: String,
    pub root: RootInfo,
    pub total_relationships: usize,
    pub relationships: Vec<Relationship>,
    pub details: Vec<NodeDetails>,
}

/// Resolve a title and return its whole traversal in one body
///
/// GET /api/relationships?query=&depth=
///
/// Answers `300 Multiple Choices` with the candidate list when the title is
/// ambiguous.
pub async fn get_relationships(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RelationshipsQuery>,
) -> ApiResult<Response> {
    let depth = params.depth.unwrap_or(state.config.explorer.default_depth);
    let depth = validate_depth(state.explorer.domain(), depth)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let resolved = match state.resolver.resolve(&params.query).await? {
        Resolution::Resolved(resolved) => resolved,
        Resolution::Ambiguous { query, candidates } => {
            let choices = TitleChoices {
                query,
                context: ChoiceContext::Search,
                results: candidates,
                existing_graph: None,
                depth: Some(depth),
                node_label: None,
            };
            return Ok((StatusCode::MULTIPLE_CHOICES, Json(choices)).into_response());
        }
    };

    let events = state
        .explorer
        .collect(ExploreRequest::from_id(resolved.id.clone(), Some(depth)))
        .await;

    let mut details = Vec::new();
    for event in events {
        match event {
            TraversalEvent::NodeDetailsDiscovered { node, attributes } => {
                details.push(NodeDetails::new(&node, attributes));
            }
            TraversalEvent::Completed {
                total_edges,
                relationships,
            } => {
                let body = RelationshipsResponse {
                    query: params.query.trim().to_string(),
                    root: RootInfo {
                        qid: resolved.id.to_string(),
                        title: resolved.title,
                    },
                    total_relationships: total_edges,
                    relationships,
                    details,
                };
                return Ok(Json(body).into_response());
            }
            TraversalEvent::Failed { reason } => return Err(ApiError::Traversal(reason)),
            _ => {}
        }
    }

    tracing::error!(root = %resolved.id, "Traversal ended without a terminal event");
    Err(ApiError::Internal)
}
