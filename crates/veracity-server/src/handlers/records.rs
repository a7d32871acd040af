use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use veracity_api::{ApiError, ApiResponse};
use veracity_core::{RecordDraft, RecordId, RecordPatch, UserId, now_utc};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestBody {
    pub patient_id: UserId,
    #[serde(flatten)]
    pub draft: RecordDraft,
}

pub async fn ingest_record(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.linkage.ingest(body.patient_id, body.draft).await?;
    Ok(ApiResponse::created(record))
}

#[derive(Debug, Deserialize)]
pub struct RecordsParams {
    pub patient: UserId,
    pub provider: Option<UserId>,
}

/// With a `provider` parameter this is the provider's filtered view; without
/// one it is the patient's own unfiltered listing.
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<RecordsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = match params.provider {
        Some(provider) => {
            state
                .query
                .visible_records(params.patient, provider, now_utc())
                .await?
        }
        None => state.query.records_for_patient(params.patient).await?,
    };
    Ok(ApiResponse::ok(records))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .query
        .find_record(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("record not found: {id}")))?;
    Ok(ApiResponse::ok(record))
}

pub async fn amend_record(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(patch): Json<RecordPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.linkage.amend_metadata(id, patch).await?;
    Ok(ApiResponse::ok(record))
}
