//! Obras core: incident data model and the report filter engine.

pub mod date;
pub mod filter;
pub mod incident;
pub mod severity;

pub use date::{parse_boundary, DateParseError, DateRange};
pub use filter::{filter_incidents, IncidentFilter};
pub use incident::{Incident, IncidentStatus};
pub use severity::Severity;
