use axum::{
    extract::{Query, State},
    Json,
};
use lineage_types::Candidate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<Candidate>,
}

/// Ranked title candidates
///
/// GET /api/search?query=&limit=
pub async fn search_titles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let limit = params.limit.unwrap_or_else(|| state.resolver.limit());
    let results = state.resolver.search(&params.query, limit).await?;

    tracing::debug!(query = %params.query, results = results.len(), "Search served");

    Ok(Json(SearchResponse {
        query: params.query.trim().to_string(),
        results,
    }))
}
