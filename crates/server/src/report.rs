//! PDF report generation
//!
//! The incident table is laid out as a static HTML page and printed to PDF by
//! a headless Chromium process:
//! - one browser process per render, never shared between requests
//! - the child is spawned with `kill_on_drop`, so it is torn down on every
//!   exit path, timeouts and cancelled requests included
//! - the page and its output live in a temp dir removed on drop
//!
//! Whether a browser exists is decided once at startup (`PdfCapability`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use obras_core::Incident;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::audit::AppliedFilters;
use crate::csv_export::{field_text, REPORT_COLUMNS};

/// Browser executables probed on `PATH`, in order.
const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "headless_shell",
];

/// Virtual time the page gets to settle before printing.
const SETTLE_BUDGET_MS: u64 = 5_000;

const PDF_MAGIC: &[u8] = b"%PDF-";

pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF renderer unavailable: {0}")]
    Unavailable(String),

    #[error("failed to start browser {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser did not finish within {0:?}")]
    Timeout(Duration),

    #[error("browser exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("browser produced no valid PDF ({0} bytes)")]
    InvalidOutput(usize),
}

// ============================================================================
// Engine seam
// ============================================================================

#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

/// PDF support as resolved at startup.
#[derive(Clone)]
pub enum PdfCapability {
    Available(Arc<dyn PdfEngine>),
    Unavailable { reason: String },
}

impl PdfCapability {
    /// Probe for a browser. An explicit binary must exist; otherwise `PATH`
    /// is searched.
    pub fn detect(chrome_bin: Option<&Path>, timeout: Duration) -> Self {
        let binary = match chrome_bin {
            Some(path) if path.is_file() => Some(path.to_path_buf()),
            Some(path) => {
                return Self::Unavailable {
                    reason: format!("configured browser {} does not exist", path.display()),
                };
            }
            None => find_on_path(BROWSER_CANDIDATES),
        };

        match binary {
            Some(binary) => {
                tracing::info!(browser = %binary.display(), "PDF export enabled");
                Self::Available(Arc::new(ChromiumPdf::new(binary).with_timeout(timeout)))
            }
            None => Self::Unavailable {
                reason: format!("none of {:?} found on PATH", BROWSER_CANDIDATES),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }

    pub async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        match self {
            Self::Available(engine) => engine.render_pdf(html).await,
            Self::Unavailable { reason } => Err(RenderError::Unavailable(reason.clone())),
        }
    }
}

fn find_on_path(candidates: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        candidates
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

// ============================================================================
// Chromium
// ============================================================================

pub struct ChromiumPdf {
    binary: PathBuf,
    timeout: Duration,
}

impl ChromiumPdf {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PdfEngine for ChromiumPdf {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let workdir = tempfile::Builder::new().prefix("obras-pdf-").tempdir()?;
        let input = workdir.path().join("report.html");
        let output = workdir.path().join("report.pdf");
        tokio::fs::write(&input, html).await?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .arg("--no-pdf-header-footer")
            .arg(format!(
                "--user-data-dir={}",
                workdir.path().join("profile").display()
            ))
            .arg(format!("--virtual-time-budget={}", SETTLE_BUDGET_MS))
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(file_url(&input)?)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| RenderError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let finished = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(RenderError::Failed {
                status: finished.status.to_string(),
                stderr: stderr.lines().last().unwrap_or_default().to_string(),
            });
        }

        let bytes = match tokio::fs::read(&output).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::InvalidOutput(0));
            }
            Err(e) => return Err(e.into()),
        };
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(RenderError::InvalidOutput(bytes.len()));
        }

        tracing::debug!(size_bytes = bytes.len(), "PDF rendered");
        Ok(bytes)
    }
}

/// Percent-encoded `file://` URL for an absolute path.
fn file_url(path: &Path) -> Result<String, RenderError> {
    reqwest::Url::from_file_path(path)
        .map(String::from)
        .map_err(|_| {
            RenderError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot express {} as a file URL", path.display()),
            ))
        })
}

// ============================================================================
// HTML layout
// ============================================================================

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Static HTML page with the filtered incident table (A4, landscape).
pub fn render_report_html(
    rows: &[&Incident],
    filters: &AppliedFilters,
    generated_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    let mut html = String::with_capacity(2048 + rows.len() * 512);

    html.push_str(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>Reporte de Incidentes</title>
<style>
@page { size: A4 landscape; margin: 12mm; }
body { font-family: "Liberation Sans", Arial, sans-serif; font-size: 10pt; color: #1f2937; }
h1 { font-size: 16pt; margin: 0 0 4px 0; }
.meta { color: #6b7280; margin-bottom: 12px; }
table { width: 100%; border-collapse: collapse; }
th, td { border: 1px solid #d1d5db; padding: 4px 6px; text-align: left; vertical-align: top; }
th { background: #f3f4f6; }
tr { page-break-inside: avoid; }
</style>
</head>
<body>
<h1>Reporte de Incidentes</h1>
"#,
    );

    let _ = writeln!(
        html,
        r#"<div class="meta">Generado: {} &middot; Obra: {} &middot; Tipo: {}{} &middot; Registros: {}</div>"#,
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        escape_html(&filters.project),
        escape_html(&filters.incident_type),
        date_window(filters),
        rows.len()
    );

    html.push_str("<table>\n<thead><tr>");
    for column in REPORT_COLUMNS {
        let _ = write!(html, "<th>{}</th>", escape_html(column.label));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for incident in rows {
        let value = serde_json::to_value(incident)?;
        html.push_str("<tr>");
        for column in REPORT_COLUMNS {
            let _ = write!(
                html,
                "<td>{}</td>",
                escape_html(&field_text(value.get(column.key)))
            );
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    Ok(html)
}

fn date_window(filters: &AppliedFilters) -> String {
    match (&filters.from, &filters.to) {
        (Some(from), Some(to)) => {
            format!(" &middot; Fechas: {} a {}", escape_html(from), escape_html(to))
        }
        (Some(from), None) => format!(" &middot; Fecha: {}", escape_html(from)),
        _ => String::new(),
    }
}
