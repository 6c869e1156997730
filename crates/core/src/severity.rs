use serde::{Deserialize, Serialize};
use std::fmt;

/// Incident severity. Serialized with the dashboard's Spanish labels; the
/// English names are accepted on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    #[serde(rename = "Alto", alias = "High")]
    High,
    #[serde(rename = "Medio", alias = "Medium")]
    Medium,
    #[serde(rename = "Bajo", alias = "Low")]
    Low,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "Alto",
            Severity::Medium => "Medio",
            Severity::Low => "Bajo",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
