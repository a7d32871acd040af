use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use veracity_api::{ApiError, ApiResponse};
use veracity_core::{GrantId, GrantRequest, RecordCategory, UserId, now_utc};

use crate::state::AppState;

pub async fn create_grant(
    State(state): State<AppState>,
    Json(request): Json<GrantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state.lifecycle.grant_access(request).await?;
    Ok(ApiResponse::created(grant))
}

pub async fn get_grant(
    State(state): State<AppState>,
    Path(id): Path<GrantId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .query
        .find_grant(id, now_utc())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("grant not found: {id}")))?;
    Ok(ApiResponse::ok(view))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub patient: Option<UserId>,
    pub provider: Option<UserId>,
}

pub async fn list_grants(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let now = now_utc();
    let views = match (params.patient, params.provider) {
        (Some(patient), Some(provider)) => {
            let mut views = state.query.grants_for_patient(patient, now).await?;
            views.retain(|v| v.grant.provider_id == provider);
            views
        }
        (Some(patient), None) => state.query.grants_for_patient(patient, now).await?,
        (None, Some(provider)) => state.query.grants_for_provider(provider, now).await?,
        (None, None) => {
            return Err(ApiError::bad_request(
                "patient or provider query parameter is required",
            ));
        }
    };
    Ok(ApiResponse::ok(views))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeBody {
    pub actor_id: UserId,
}

pub async fn revoke_grant(
    State(state): State<AppState>,
    Path(id): Path<GrantId>,
    Json(body): Json<RevokeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state.lifecycle.revoke(id, body.actor_id).await?;
    Ok(ApiResponse::ok(grant))
}

pub async fn purge_grant(
    State(state): State<AppState>,
    Path(id): Path<GrantId>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.purge(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub patient: UserId,
    pub provider: UserId,
    pub category: RecordCategory,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

pub async fn check_access(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> Result<impl IntoResponse, ApiError> {
    let allowed = state
        .query
        .has_access(params.patient, params.provider, params.category, now_utc())
        .await?;
    Ok(ApiResponse::ok(CheckResponse { allowed }))
}
