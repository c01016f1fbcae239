//! Lead Routes
//!
//! Homeowner contacts captured after a photo diagnosis.
//!
//! - GET /leads - List leads, newest first
//! - POST /leads - Record a lead
//! - GET /leads/export - Download all leads as CSV

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{Lead, NewLead};

/// GET /leads
pub async fn list_leads(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Lead>>> {
    Ok(Json(state.store.list_leads()?))
}

/// POST /leads
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewLead>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    let req = normalize_lead(req)?;
    let lead = state.store.create_lead(&req)?;

    tracing::info!(lead_id = lead.id, category = ?lead.issue_category, "Lead captured");

    Ok((StatusCode::CREATED, Json(lead)))
}

/// GET /leads/export
pub async fn export_leads(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let leads = state.store.list_leads()?;
    let body = format_csv(&leads)?;

    let filename = format!("fixit_leads_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from(body),
    )
        .into_response())
}

fn normalize_lead(mut req: NewLead) -> ApiResult<NewLead> {
    req.name = req.name.trim().to_string();
    req.phone = req.phone.trim().to_string();
    req.postal_code = req.postal_code.trim().to_string();

    if req.name.is_empty() {
        return Err(ApiError::Validation("name cannot be empty".to_string()));
    }
    if !req.phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation(
            "phone must contain a phone number".to_string(),
        ));
    }
    if req.postal_code.is_empty() {
        return Err(ApiError::Validation("postal_code cannot be empty".to_string()));
    }
    Ok(req)
}

fn format_csv(leads: &[Lead]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "timestamp",
            "name",
            "phone",
            "postal_code",
            "issue_category",
            "ai_estimated_cost",
        ])
        .map_err(csv_error)?;

    for lead in leads {
        writer
            .write_record([
                lead.id.to_string(),
                lead.timestamp.to_rfc3339(),
                lead.name.clone(),
                lead.phone.clone(),
                lead.postal_code.clone(),
                lead.issue_category.clone().unwrap_or_default(),
                lead.ai_estimated_cost.clone().unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::Internal(format!("CSV export failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(name: &str, phone: &str) -> NewLead {
        NewLead {
            name: name.to_string(),
            phone: phone.to_string(),
            postal_code: "M5V 2T6".to_string(),
            issue_category: Some("Plumbing".to_string()),
            ai_estimated_cost: Some("$150-$300".to_string()),
        }
    }

    #[test]
    fn test_normalize_lead() {
        let req = normalize_lead(lead("  Dana ", " 416-555-0199 ")).unwrap();
        assert_eq!(req.name, "Dana");
        assert_eq!(req.phone, "416-555-0199");

        assert!(normalize_lead(lead("", "416-555-0199")).is_err());
        assert!(normalize_lead(lead("Dana", "call me")).is_err());
    }

    #[test]
    fn test_csv_quotes_commas() {
        let leads = vec![Lead {
            id: 1,
            name: "Smith, Dana".to_string(),
            phone: "416-555-0199".to_string(),
            postal_code: "M5V 2T6".to_string(),
            issue_category: None,
            ai_estimated_cost: Some("$50-$150".to_string()),
            timestamp: Utc::now(),
        }];

        let csv = String::from_utf8(format_csv(&leads).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,timestamp,name"));
        assert!(lines.next().unwrap().contains("\"Smith, Dana\""));
    }
}
