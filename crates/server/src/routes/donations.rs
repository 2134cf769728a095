use crate::error::ServerResult;
use crate::routes::blocking;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use medbridge::{Donation, Identity, MatchingOutcomeView, NewDonation};
use serde::Serialize;
use std::sync::Arc;

/// Response from an approval
#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub donation: Donation,
    /// Matching runs after the approval commits and may fail on its own.
    pub matching: MatchingOutcomeView,
}

/// Submit a donation (donors)
pub async fn submit_donation(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<NewDonation>,
) -> ServerResult<impl IntoResponse> {
    let engine = state.engine.clone();
    let donation = blocking(move || engine.donations().submit(&identity, request)).await?;
    Ok((StatusCode::CREATED, Json(donation)))
}

/// The caller's own donations (donors)
pub async fn my_donations(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<Vec<Donation>>> {
    let engine = state.engine.clone();
    let donations = blocking(move || engine.donations().for_donor(&identity)).await?;
    Ok(Json(donations))
}

/// Donations awaiting review (administrators)
pub async fn pending_donations(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<Vec<Donation>>> {
    let engine = state.engine.clone();
    let donations = blocking(move || engine.donations().pending(&identity)).await?;
    Ok(Json(donations))
}

/// Approved and claimed donations (administrators)
pub async fn inventory(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<Vec<Donation>>> {
    let engine = state.engine.clone();
    let donations = blocking(move || engine.donations().inventory(&identity)).await?;
    Ok(Json(donations))
}

pub async fn get_donation(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Path(donation_id): Path<String>,
) -> ServerResult<Json<Donation>> {
    let engine = state.engine.clone();
    let donation = blocking(move || engine.donations().get(&donation_id, &identity)).await?;
    Ok(Json(donation))
}

/// Approve a pending donation and run matching for it (administrators)
pub async fn approve_donation(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Path(donation_id): Path<String>,
) -> ServerResult<Json<ApprovalResponse>> {
    let engine = state.engine.clone();
    let report = blocking(move || engine.lifecycle().approve(&donation_id, &identity)).await?;
    Ok(Json(ApprovalResponse {
        matching: MatchingOutcomeView::from(&report.matching),
        donation: report.donation,
    }))
}

/// Reject a pending donation (administrators)
pub async fn reject_donation(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Path(donation_id): Path<String>,
) -> ServerResult<Json<Donation>> {
    let engine = state.engine.clone();
    let donation = blocking(move || engine.lifecycle().reject(&donation_id, &identity)).await?;
    Ok(Json(donation))
}
