//! GET /health and /api/health
//!
//! Unauthenticated liveness and capability summary. Never touches the audit
//! log.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SharedState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Incidents in the loaded catalog
    pub incidents: usize,
    pub api_key_configured: bool,
    pub pdf: PdfStatus,
    pub started_at: DateTime<Utc>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        incidents: state.catalog.len(),
        api_key_configured: state.authorizer.api_key_configured(),
        pdf: PdfStatus {
            available: state.pdf.is_available(),
            reason: state.pdf.unavailable_reason().map(str::to_string),
        },
        started_at: state.started_at,
        checked_at: Utc::now(),
    })
}
