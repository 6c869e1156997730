//! Obras report server library
//!
//! Exposes the export API router and its collaborators for in-process
//! testing.

pub mod audit;
pub mod auth;
pub mod config;
pub mod csv_export;
pub mod export_api;
pub mod firebase;
pub mod health;
pub mod logging;
pub mod report;
pub mod store;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use audit::{AppliedFilters, AuditEntry, AuditLog};
pub use auth::{AuthError, AuthResult, Authorizer, IdentityVerifier, VerifiedIdentity, VerifyError};
pub use config::{Config, LogFormat};
pub use csv_export::{to_csv, CsvColumn, REPORT_COLUMNS};
pub use export_api::{ExportError, ExportFormat, ExportParams, PDF_UNAVAILABLE_MESSAGE};
pub use firebase::{global_firebase_verifier, FirebaseSettings, FirebaseVerifier};
pub use report::{render_report_html, ChromiumPdf, PdfCapability, PdfEngine, RenderError};
pub use store::{CatalogError, IncidentCatalog};

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub catalog: IncidentCatalog,
    pub authorizer: Authorizer,
    pub audit: AuditLog,
    pub pdf: PdfCapability,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        catalog: IncidentCatalog,
        authorizer: Authorizer,
        audit: AuditLog,
        pdf: PdfCapability,
    ) -> Self {
        Self {
            catalog,
            authorizer,
            audit,
            pdf,
            started_at: Utc::now(),
        }
    }

    /// Wire production collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        let catalog = IncidentCatalog::load(config.incidents_file.as_deref())?;

        let settings = FirebaseSettings {
            service_account: config.firebase_service_account.clone(),
            project_id: config.firebase_project_id.clone(),
            request_timeout: config.auth_timeout(),
            ..FirebaseSettings::default()
        };
        let authorizer = Authorizer::new(
            config.api_key().map(str::to_string),
            global_firebase_verifier(&settings),
        )
        .with_timeout(config.auth_timeout());

        let pdf = PdfCapability::detect(config.chrome_bin.as_deref(), config.pdf_timeout());
        if let Some(reason) = pdf.unavailable_reason() {
            tracing::warn!(reason, "PDF export disabled");
        }

        Ok(Self::new(catalog, authorizer, AuditLog::new(&config.data_dir), pdf))
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::health_handler))
        .route("/api/reportes/export", get(export_api::export_reports))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
