//! Audit Routes
//!
//! Move-in / move-out video inspections.
//!
//! - POST /audit - multipart: unit_id, mode, file
//! - POST /audit/move-in - multipart: unit_id, video
//! - POST /audit/move-out - multipart: unit_id, video

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::form::FormData;
use crate::api::state::AppState;
use crate::audit::{AuditMode, AuditReport};
use crate::media::{Upload, ALLOWED_VIDEO_TYPES};

/// POST /audit
pub async fn audit(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AuditReport>)> {
    let mut form = FormData::from_multipart(multipart).await?;
    let mode: AuditMode = form.require_text("mode")?.parse()?;
    run_audit(&state, mode, &mut form, "file").await
}

/// POST /audit/move-in
pub async fn move_in(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AuditReport>)> {
    let mut form = FormData::from_multipart(multipart).await?;
    run_audit(&state, AuditMode::MoveIn, &mut form, "video").await
}

/// POST /audit/move-out
pub async fn move_out(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AuditReport>)> {
    let mut form = FormData::from_multipart(multipart).await?;
    run_audit(&state, AuditMode::MoveOut, &mut form, "video").await
}

/// Failed analyses keep their report body but are sent as 500
async fn run_audit(
    state: &AppState,
    mode: AuditMode,
    form: &mut FormData,
    file_field: &str,
) -> ApiResult<(StatusCode, Json<AuditReport>)> {
    let unit_id = form.require_text("unit_id")?.to_string();
    let video = validate_video(form.require_file(file_field)?)?;
    state.require_model()?;

    tracing::info!(unit_id = %unit_id, %mode, bytes = video.len(), "Starting video audit");
    let report = state.auditor().run(mode, &unit_id, video).await?;

    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(report)))
}

fn validate_video(video: Upload) -> ApiResult<Upload> {
    if !video.is_video() {
        return Err(ApiError::Validation(format!(
            "Invalid video type '{}'. Allowed: {:?}",
            video.content_type, ALLOWED_VIDEO_TYPES
        )));
    }
    if video.is_empty() {
        return Err(ApiError::Validation("Video file is empty".to_string()));
    }
    Ok(video)
}
