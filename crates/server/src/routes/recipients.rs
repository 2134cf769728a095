use crate::error::ServerResult;
use crate::routes::blocking;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use medbridge::{
    AvailableDonation, ClaimedDonation, Identity, ProfileUpdate, RecipientProfile,
    RequirementEntry,
};
use serde::Deserialize;
use std::sync::Arc;

/// Body for adding or editing a requirement entry
#[derive(Debug, Deserialize)]
pub struct RequirementRequest {
    pub text: String,
}

/// The caller's recipient profile, provisioned on first access
pub async fn my_profile(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<RecipientProfile>> {
    let engine = state.engine.clone();
    let profile = blocking(move || engine.recipients().ensure_profile(&identity)).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Json(update): Json<ProfileUpdate>,
) -> ServerResult<Json<RecipientProfile>> {
    let engine = state.engine.clone();
    let profile =
        blocking(move || engine.recipients().update_profile(&identity, update)).await?;
    Ok(Json(profile))
}

pub async fn add_requirement(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<RequirementRequest>,
) -> ServerResult<impl IntoResponse> {
    let engine = state.engine.clone();
    let entry = blocking(move || {
        engine
            .recipients()
            .add_requirement(&identity, &request.text)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn edit_requirement(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Path(entry_id): Path<String>,
    Json(request): Json<RequirementRequest>,
) -> ServerResult<Json<RequirementEntry>> {
    let engine = state.engine.clone();
    let entry = blocking(move || {
        engine
            .recipients()
            .edit_requirement(&identity, &entry_id, &request.text)
    })
    .await?;
    Ok(Json(entry))
}

pub async fn delete_requirement(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
    Path(entry_id): Path<String>,
) -> ServerResult<StatusCode> {
    let engine = state.engine.clone();
    blocking(move || engine.recipients().delete_requirement(&identity, &entry_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approved donations matched to the caller, best score first
pub async fn available_donations(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<Vec<AvailableDonation>>> {
    let engine = state.engine.clone();
    let donations =
        blocking(move || engine.recipients().available_donations(&identity)).await?;
    Ok(Json(donations))
}

/// The caller's claims with their donations
pub async fn my_claims(
    State(state): State<Arc<ServerState>>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<Vec<ClaimedDonation>>> {
    let engine = state.engine.clone();
    let claims = blocking(move || engine.recipients().claimed_donations(&identity)).await?;
    Ok(Json(claims))
}
