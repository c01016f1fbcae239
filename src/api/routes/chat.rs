//! Chat Routes
//!
//! Conversational triage for the tenant widget.
//!
//! - POST /chat - One conversation turn (multipart: session_id, text, file)

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::ChatResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::form::FormData;
use crate::api::state::AppState;
use crate::media::ALLOWED_IMAGE_TYPES;
use crate::storage::{ChatMessage, NewTicket, Priority, Ticket, TicketDetails, TicketStatus};
use crate::triage::{EscalationMode, TriageAction, TriageOutcome, IMAGE_MARKER};

/// POST /chat
///
/// The session id is the backing ticket's id. The widget starts with its own
/// client-side id (e.g. "s_1712345"); any id that is not an existing ticket
/// opens a new one, and the response carries the id to use from then on.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<ChatResponse>> {
    state.require_model()?;

    let mut form = FormData::from_multipart(multipart).await?;
    let session_id = form.require_text("session_id")?.to_string();
    let text = form.text("text").map(str::to_string);
    let image = form.take_file("file");

    if let Some(image) = &image {
        if !image.is_image() {
            return Err(ApiError::Validation(format!(
                "Invalid image type '{}'. Allowed: {:?}",
                image.content_type, ALLOWED_IMAGE_TYPES
            )));
        }
    }
    if text.is_none() && image.is_none() {
        return Err(ApiError::Validation(
            "Send a message, a photo, or both".to_string(),
        ));
    }

    let ticket = resolve_session(&state, &session_id)?;
    let mut history = ticket.conversation_history;

    if let Some(text) = text {
        history.push(ChatMessage::user(text));
    }
    if image.is_some() {
        history.push(ChatMessage::user(IMAGE_MARKER));
    }

    let outcome = state
        .triage_agent()
        .triage_with_image(&history, image.as_ref())
        .await;

    if !outcome.text.is_empty() {
        history.push(
            ChatMessage::assistant(&outcome.text).with_action(outcome.action.as_str()),
        );
    }

    let status = status_after(&outcome);
    state
        .store
        .record_chat_turn(ticket.id, &history, Some(outcome.risk), status)?;

    if let Some(details) = details_after(&outcome) {
        state.store.apply_ticket_details(ticket.id, &details)?;
    }

    tracing::info!(
        ticket_id = ticket.id,
        action = outcome.action.as_str(),
        risk = %outcome.risk,
        status = ?status,
        "Chat turn processed"
    );

    Ok(Json(ChatResponse {
        session_id: ticket.id.to_string(),
        response: outcome.text,
        risk: outcome.risk,
        action: outcome.action,
        category: outcome.category,
        missing_info: outcome.missing_info,
        filled_slots: outcome.filled_slots,
        request_photo: outcome.request_photo,
        ticket_data: outcome.ticket_data,
        escalation_mode: outcome.escalation_mode,
        history,
    }))
}

fn resolve_session(state: &AppState, session_id: &str) -> ApiResult<Ticket> {
    if let Ok(id) = session_id.parse::<i64>() {
        if let Some(ticket) = state.store.get_ticket(id)? {
            return Ok(ticket);
        }
    }

    let ticket = state.store.create_ticket(&NewTicket::widget_session())?;
    tracing::info!(ticket_id = ticket.id, session_id = %session_id, "Opened ticket for chat session");
    Ok(ticket)
}

fn status_after(outcome: &TriageOutcome) -> Option<TicketStatus> {
    match outcome.action {
        TriageAction::Emergency => Some(TicketStatus::Escalated),
        TriageAction::CreateTicket if outcome.escalation_mode == EscalationMode::SelfHelp => {
            Some(TicketStatus::Deflected)
        }
        TriageAction::CreateTicket => Some(TicketStatus::Escalated),
        TriageAction::Question | TriageAction::Confirm => None,
    }
}

fn details_after(outcome: &TriageOutcome) -> Option<TicketDetails> {
    match outcome.action {
        TriageAction::CreateTicket => outcome.ticket_data.as_ref().map(|d| d.to_details()),
        TriageAction::Emergency => {
            let mut details = outcome
                .ticket_data
                .as_ref()
                .map(|d| d.to_details())
                .unwrap_or_default();
            details.priority = Some(Priority::Emergency);
            details
                .category
                .get_or_insert_with(|| outcome.category.clone());
            Some(details)
        }
        TriageAction::Question | TriageAction::Confirm => None,
    }
}
