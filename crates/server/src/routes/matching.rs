use crate::error::ServerResult;
use crate::routes::blocking;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use medbridge::{Identity, Mapping, TopMatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to run matching for one donation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDonationRequest {
    pub donation_id: String,
}

/// Response from a matching run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDonationResponse {
    pub success: bool,
    /// Number of persisted mappings
    pub matches: usize,
    pub top_match: Option<TopMatch>,
}

/// Score every recipient against a donation and persist the top matches
/// (administrators, rate limited per caller).
pub async fn map_donation(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<MapDonationRequest>,
) -> ServerResult<Json<MapDonationResponse>> {
    let engine = state.engine.clone();
    let summary = blocking(move || {
        engine
            .matching()
            .run_matching(&request.donation_id, &identity)
    })
    .await?;

    Ok(Json(MapDonationResponse {
        success: true,
        matches: summary.match_count,
        top_match: summary.top_match,
    }))
}

/// The donation's current mapping batch, highest score first
/// (administrators).
pub async fn donation_mappings(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Path(donation_id): Path<String>,
) -> ServerResult<Json<Vec<Mapping>>> {
    let engine = state.engine.clone();
    let mappings =
        blocking(move || engine.matching().mappings(&donation_id, &identity)).await?;
    Ok(Json(mappings))
}
