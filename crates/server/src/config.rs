//! Server configuration
//!
//! Every flag can also be supplied through the environment, which is how the
//! dashboard deployment passes its secrets.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "obras-server", version, about = "Incident report export API")]
pub struct Config {
    /// Listen port
    #[arg(short, long, env = "OBRAS_SERVER_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "OBRAS_SERVER_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Directory holding the export audit log
    #[arg(long, env = "REPORTS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// JSON file with the incident catalog (embedded seed when absent)
    #[arg(long, env = "REPORTS_INCIDENTS_FILE")]
    pub incidents_file: Option<PathBuf>,

    /// Shared secret accepted in the `x-api-key` header
    #[arg(long, env = "REPORTS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Service-account JSON used to initialize the identity provider
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT", hide_env_values = true)]
    pub firebase_service_account: Option<String>,

    /// Project id when no service account is supplied
    #[arg(long, env = "FIREBASE_PROJECT_ID")]
    pub firebase_project_id: Option<String>,

    /// Upper bound on bearer token verification
    #[arg(long, env = "REPORTS_AUTH_TIMEOUT_SECS", default_value_t = 5)]
    pub auth_timeout_secs: u64,

    /// Headless browser used for PDF export (searched on PATH when absent)
    #[arg(long, env = "REPORTS_CHROME_BIN")]
    pub chrome_bin: Option<PathBuf>,

    /// Upper bound on a single PDF render
    #[arg(long, env = "REPORTS_PDF_TIMEOUT_SECS", default_value_t = 30)]
    pub pdf_timeout_secs: u64,

    #[arg(long, env = "OBRAS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// The configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn pdf_timeout(&self) -> Duration {
        Duration::from_secs(self.pdf_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
