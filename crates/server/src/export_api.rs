//! Incident report export endpoint
//!
//! `GET /api/reportes/export?format=&project=&type=&from=&to=`
//!
//! Order of operations is fixed: authorize, then parse dates, then filter,
//! then render. Nothing is filtered, rendered, or audited for a caller that
//! fails authorization.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use obras_core::{filter_incidents, DateParseError, DateRange, IncidentFilter};
use thiserror::Error;
use tracing::Instrument;

use crate::audit::{AppliedFilters, AuditEntry, ACTION_EXPORT};
use crate::auth::AuthError;
use crate::csv_export::{to_csv, CsvExportError, REPORT_COLUMNS};
use crate::report::{render_report_html, RenderError};
use crate::SharedState;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const CSV_DISPOSITION: &str = "attachment; filename=\"reportes-incidentes.csv\"";
pub const PDF_DISPOSITION: &str = "attachment; filename=\"reportes-incidentes.pdf\"";

pub const PDF_UNAVAILABLE_MESSAGE: &str =
    "PDF generation requires a headless Chromium browser to be installed on the server.";

const DEFAULT_FORMAT: &str = "csv";
const DEFAULT_SELECTOR: &str = "all";

// ============================================================================
// Query
// ============================================================================

/// Raw query parameters. Empty values count as absent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportParams {
    pub format: Option<String>,
    pub project: Option<String>,
    pub incident_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
    /// Fallback for any other requested format
    Json,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "csv" => Self::Csv,
            "pdf" => Self::Pdf,
            _ => Self::Json,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }
}

/// Query after defaulting, before date parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportQuery {
    pub format: ExportFormat,
    pub filters: AppliedFilters,
}

impl ExportParams {
    /// Collect known keys from decoded query pairs. The first occurrence of a
    /// repeated key wins and unknown keys are ignored, so parsing never
    /// rejects a request.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "format" => &mut params.format,
                "project" => &mut params.project,
                "type" => &mut params.incident_type,
                "from" => &mut params.from,
                "to" => &mut params.to,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    pub fn resolve(self) -> ExportQuery {
        let format = present(self.format).unwrap_or_else(|| DEFAULT_FORMAT.to_string());
        ExportQuery {
            format: ExportFormat::parse(&format),
            filters: AppliedFilters {
                project: present(self.project).unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
                incident_type: present(self.incident_type)
                    .unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
                from: present(self.from),
                to: present(self.to),
            },
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl ExportQuery {
    /// Build the filter. Any supplied boundary must parse, even a `to`
    /// given without `from`.
    pub fn incident_filter(&self) -> Result<IncidentFilter, ExportError> {
        let invalid = |param: &'static str| {
            move |source: DateParseError| ExportError::InvalidDate { param, source }
        };

        let from = self
            .filters
            .from
            .as_deref()
            .map(obras_core::parse_boundary)
            .transpose()
            .map_err(invalid("from"))?;
        let to = self
            .filters
            .to
            .as_deref()
            .map(obras_core::parse_boundary)
            .transpose()
            .map_err(invalid("to"))?;

        let mut filter = IncidentFilter::all()
            .with_project(&self.filters.project)
            .with_type(&self.filters.incident_type);
        if let Some(from) = from {
            filter = filter.with_range(DateRange::new(from, to));
        }
        Ok(filter)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("invalid '{param}' parameter: {source}")]
    InvalidDate {
        param: &'static str,
        #[source]
        source: DateParseError,
    },

    #[error("pdf renderer unavailable: {0}")]
    RendererUnavailable(#[from] RenderError),

    #[error("csv export failed: {0}")]
    Csv(#[from] CsvExportError),

    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        match &self {
            ExportError::Unauthorized(e) => {
                tracing::warn!(error = %e, "export rejected");
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            ExportError::InvalidDate { param, source } => {
                tracing::warn!(param, value = %source.value, "export rejected: bad date");
                (
                    StatusCode::BAD_REQUEST,
                    format!(
                        "Invalid '{}' date '{}': expected YYYY-MM-DD or an RFC 3339 timestamp",
                        param, source.value
                    ),
                )
                    .into_response()
            }
            ExportError::RendererUnavailable(e) => {
                tracing::warn!(error = %e, "PDF export unavailable");
                (StatusCode::NOT_IMPLEMENTED, PDF_UNAVAILABLE_MESSAGE).into_response()
            }
            ExportError::Csv(e) => internal_error(e),
            ExportError::Serialize(e) => internal_error(e),
        }
    }
}

fn internal_error(e: &dyn std::error::Error) -> Response {
    tracing::error!(error = %e, "Error in export route");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

// ============================================================================
// Handler
// ============================================================================

/// GET /api/reportes/export
pub async fn export_reports(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ExportError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("export", request_id = %request_id);
    let query = ExportParams::from_pairs(pairs).resolve();
    run_export(state, headers, query, request_id)
        .instrument(span)
        .await
}

async fn run_export(
    state: SharedState,
    headers: HeaderMap,
    query: ExportQuery,
    request_id: String,
) -> Result<Response, ExportError> {
    let auth = state.authorizer.authorize(&headers).await?;
    let filter = query.incident_filter()?;
    let rows = filter_incidents(state.catalog.incidents(), &filter);

    tracing::info!(
        format = query.format.as_str(),
        project = %query.filters.project,
        incident_type = %query.filters.incident_type,
        rows = rows.len(),
        "export requested"
    );

    let (content_type, disposition, body) = match query.format {
        ExportFormat::Pdf => {
            let html = render_report_html(&rows, &query.filters, Utc::now())?;
            let pdf = state.pdf.render(&html).await?;
            (PDF_CONTENT_TYPE, PDF_DISPOSITION, pdf)
        }
        ExportFormat::Csv => {
            let csv = to_csv(&rows, REPORT_COLUMNS)?;
            (CSV_CONTENT_TYPE, CSV_DISPOSITION, csv.into_bytes())
        }
        ExportFormat::Json => return Ok(Json(rows).into_response()),
    };

    state
        .audit
        .append(&AuditEntry {
            request_id,
            auth,
            action: ACTION_EXPORT,
            format: query.format.as_str(),
            filters: query.filters.clone(),
            count: rows.len(),
        })
        .await;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ExportParams {
        ExportParams::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn test_defaults() {
        let query = ExportParams::default().resolve();
        assert_eq!(query.format, ExportFormat::Csv);
        assert_eq!(query.filters.project, "all");
        assert_eq!(query.filters.incident_type, "all");
        assert_eq!(query.filters.from, None);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let query = params(&[("format", ""), ("project", ""), ("from", "")]).resolve();
        assert_eq!(query.format, ExportFormat::Csv);
        assert_eq!(query.filters.project, "all");
        assert_eq!(query.filters.from, None);
    }

    #[test]
    fn test_repeated_keys_keep_first_value() {
        let p = params(&[("format", "csv"), ("format", "pdf"), ("project", "Bridge"), ("x", "1")]);
        assert_eq!(p.format.as_deref(), Some("csv"));
        assert_eq!(p.project.as_deref(), Some("Bridge"));
        assert_eq!(p.incident_type, None);
    }

    #[test]
    fn test_unknown_format_is_json() {
        assert_eq!(ExportFormat::parse("xml"), ExportFormat::Json);
        assert_eq!(ExportFormat::parse("json"), ExportFormat::Json);
        assert_eq!(ExportFormat::parse("CSV"), ExportFormat::Json);
        assert_eq!(ExportFormat::parse("pdf"), ExportFormat::Pdf);
    }

    #[test]
    fn test_filter_with_single_day() {
        let query = params(&[("project", "Bridge"), ("from", "2024-03-15")]).resolve();
        let filter = query.incident_filter().unwrap();
        assert_eq!(filter.project.as_deref(), Some("Bridge"));
        assert_eq!(filter.incident_type, None);
        let range = filter.range.unwrap();
        assert_eq!(range.from, range.to);
    }

    #[test]
    fn test_invalid_from_is_rejected() {
        let query = params(&[("from", "yesterday")]).resolve();
        let err = query.incident_filter().unwrap_err();
        assert!(matches!(err, ExportError::InvalidDate { param: "from", .. }));
    }

    #[test]
    fn test_invalid_to_is_rejected_even_without_from() {
        let query = params(&[("to", "2024-02-30")]).resolve();
        let err = query.incident_filter().unwrap_err();
        assert!(matches!(err, ExportError::InvalidDate { param: "to", .. }));
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let source = serde_json::from_str::<u8>("\"not a number\"").unwrap_err();
        let response = ExportError::Serialize(source).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[test]
    fn test_to_without_from_does_not_filter() {
        let query = params(&[("to", "2024-03-15")]).resolve();
        assert_eq!(query.incident_filter().unwrap().range, None);
    }
}
