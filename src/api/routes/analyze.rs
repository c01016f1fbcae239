//! Analyze Routes
//!
//! - POST /analyze - Photo diagnosis (multipart: file, description)

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;

use crate::analyze::AnalysisResult;
use crate::api::error::{ApiError, ApiResult};
use crate::api::form::FormData;
use crate::api::state::AppState;
use crate::media::ALLOWED_IMAGE_TYPES;

/// POST /analyze
///
/// Without a photo or with a vague description the reply is a follow-up
/// question (`needs_more_info = true`) rather than an error.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisResult>> {
    state.require_model()?;

    let mut form = FormData::from_multipart(multipart).await?;
    let description = form.text("description").unwrap_or_default().to_string();
    let image = form.take_file("file");

    if let Some(image) = &image {
        if !image.is_image() {
            return Err(ApiError::Validation(format!(
                "Invalid image type '{}'. Allowed: {:?}",
                image.content_type, ALLOWED_IMAGE_TYPES
            )));
        }
    }

    let result = state.diagnoser().analyze(&description, image.as_ref()).await;

    tracing::info!(
        needs_more_info = result.needs_more_info,
        risk = ?result.risk_level,
        "Analysis complete"
    );

    Ok(Json(result))
}
