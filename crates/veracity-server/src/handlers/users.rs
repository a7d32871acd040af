use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use veracity_api::{ApiError, ApiResponse};
use veracity_core::{Role, User, UserId, UserPatch};
use veracity_storage::UserStore as _;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub subject: String,
    pub wallet_address: String,
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_complete: Option<bool>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUser>,
) -> Result<impl IntoResponse, ApiError> {
    if body.subject.trim().is_empty() {
        return Err(ApiError::bad_request("subject is required"));
    }
    if body.wallet_address.trim().is_empty() {
        return Err(ApiError::bad_request("walletAddress is required"));
    }

    let mut user = User::new(body.subject, body.wallet_address, body.role);
    if let Some(email) = body.email {
        user = user.with_email(email);
    }
    if let Some(name) = body.name {
        user = user.with_name(name);
    }
    if let Some(complete) = body.profile_complete {
        user = user.with_profile_complete(complete);
    }

    match state.users.insert(user).await {
        Ok(stored) => Ok(ApiResponse::created(stored)),
        Err(e) if e.is_already_exists() => Err(ApiError::conflict(e.to_string())),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("user not found: {id}")))?;
    Ok(ApiResponse::ok(user))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .users
        .list()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(ApiResponse::ok(users))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(patch): Json<UserPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = state
        .users
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("user not found: {id}")))?;

    user.apply_patch(patch);

    match state.users.update(user).await {
        Ok(stored) => Ok(ApiResponse::ok(stored)),
        Err(e) if e.is_not_found() => Err(ApiError::not_found(e.to_string())),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    match state.users.delete(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) if e.is_not_found() => Err(ApiError::not_found(e.to_string())),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}
