//! Admin Routes
//!
//! Read-only views for the property manager dashboard.
//!
//! - GET /admin/tickets - List tickets (optional ?status=)
//! - GET /admin/tickets/:id - Single ticket with conversation
//! - GET /admin/units - Units with a move-in baseline
//! - GET /admin/units/:unit_id/audit-items - Audit rows for a unit

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{TicketListParams, UnitResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{AuditItem, Ticket, TicketStatus};

/// GET /admin/tickets
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TicketListParams>,
) -> ApiResult<Json<Vec<Ticket>>> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<TicketStatus>().map_err(ApiError::Validation))
        .transpose()?;

    Ok(Json(state.store.list_tickets(status)?))
}

/// GET /admin/tickets/:id
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Ticket>> {
    state
        .store
        .get_ticket(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {} not found", id)))
}

/// GET /admin/units
pub async fn list_units(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<UnitResponse>>> {
    let units = state
        .store
        .list_baselines()?
        .into_iter()
        .map(UnitResponse::from)
        .collect();
    Ok(Json(units))
}

/// GET /admin/units/:unit_id/audit-items
pub async fn list_audit_items(
    State(state): State<Arc<AppState>>,
    Path(unit_id): Path<String>,
) -> ApiResult<Json<Vec<AuditItem>>> {
    Ok(Json(state.store.list_audit_items(&unit_id)?))
}
