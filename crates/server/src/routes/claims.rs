use crate::error::ServerResult;
use crate::routes::blocking;
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use medbridge::Identity;
use serde::Deserialize;
use std::sync::Arc;

/// Optional claim body. Administrators may name the recipient to claim
/// for; everyone else claims for their own profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    #[serde(default)]
    pub recipient_id: Option<String>,
}

/// Claim an approved donation. Exactly one concurrent claim wins; the
/// others get 409.
pub async fn claim_donation(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Path(donation_id): Path<String>,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let request: ClaimRequest = if body.is_empty() {
        ClaimRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let recipient_id = request.recipient_id;
    let engine = state.engine.clone();
    let claim = blocking(move || match recipient_id {
        Some(recipient_id) => engine.claims().claim(&donation_id, &recipient_id, &identity),
        None => engine.claims().claim_as_caller(&donation_id, &identity),
    })
    .await?;
    Ok((StatusCode::CREATED, Json(claim)))
}
