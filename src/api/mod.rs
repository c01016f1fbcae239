//! Fix-It REST API
//!
//! HTTP API layer, built with Axum. The tenant widget, landing page and admin
//! dashboard all talk to these routes.
//!
//! # Endpoints
//!
//! ## Tenant widget
//! - `POST /chat` - Slot-filling triage turn (multipart)
//!
//! ## Inspections
//! - `POST /audit` - Move-in / move-out video audit (multipart: unit_id, mode, file)
//! - `POST /audit/move-in` - Move-in audit (multipart: unit_id, video)
//! - `POST /audit/move-out` - Move-out audit (multipart: unit_id, video)
//!
//! ## Lead capture
//! - `POST /analyze` - Photo diagnosis with cost estimate (multipart)
//! - `GET /leads` - List leads
//! - `POST /leads` - Record a lead
//! - `GET /leads/export` - CSV download
//!
//! ## Admin
//! - `GET /admin/tickets` - List tickets (`?status=Open|Deflected|Escalated`)
//! - `GET /admin/tickets/:id` - Ticket with conversation
//! - `GET /admin/units` - Units with a baseline
//! - `GET /admin/units/:unit_id/audit-items` - Audit rows for a unit
//!
//! ## Health
//! - `GET /` - Ping
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use fixit::ai::{GeminiClient, GeminiConfig};
//! use fixit::api::{serve, AppState};
//! use fixit::config::Config;
//! use fixit::storage::Store;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let store = Arc::new(Store::from_database_url(&config.database.url)?);
//!     let model = Arc::new(GeminiClient::new(config.model.to_gemini_config())?);
//!
//!     let state = AppState::new(store, model, config);
//!     serve(state).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod form;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes();

    let audit_routes = Router::new()
        .route("/", post(routes::audit::audit))
        .route("/move-in", post(routes::audit::move_in))
        .route("/move-out", post(routes::audit::move_out));

    let lead_routes = Router::new()
        .route("/", get(routes::leads::list_leads).post(routes::leads::create_lead))
        .route("/export", get(routes::leads::export_leads));

    let admin_routes = Router::new()
        .route("/tickets", get(routes::admin::list_tickets))
        .route("/tickets/:id", get(routes::admin::get_ticket))
        .route("/units", get(routes::admin::list_units))
        .route("/units/:unit_id/audit-items", get(routes::admin::list_audit_items));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::health::root))
        .route("/chat", post(routes::chat::chat))
        .route("/analyze", post(routes::analyze::analyze))
        .nest("/audit", audit_routes)
        .nest("/leads", lead_routes)
        .nest("/admin", admin_routes)
        .nest("/health", health_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        // The widget is embedded on arbitrary property-manager sites
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.server.addr();
    let model = state.model.name().to_string();
    let api_configured = state.api_configured();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%model, api_configured, "Fix-It API listening on {}", addr);
    if !api_configured {
        tracing::warn!("GEMINI_API_KEY is not set; chat, analyze and audit will return 503");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Fix-It API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
