use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::date::start_of_day;
use super::Severity;

/// A reported risk or safety event on a construction project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,

    /// Free-text category, e.g. "Deslizamiento", "Inundación"
    #[serde(rename = "type")]
    pub incident_type: String,

    pub severity: Severity,

    /// Report date (`YYYY-MM-DD` on the wire)
    pub date: NaiveDate,

    pub description: String,

    pub status: IncidentStatus,

    /// Owning project name (denormalized, not a foreign key)
    pub project: String,
}

impl Incident {
    /// Instant used for date-range matching: midnight UTC of the report date.
    pub fn reported_at(&self) -> DateTime<Utc> {
        start_of_day(self.date)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IncidentStatus {
    #[serde(rename = "Reportado", alias = "Reported")]
    Reported,
    #[serde(rename = "En revisión", alias = "Under Review")]
    UnderReview,
    #[serde(rename = "Mitigado", alias = "Mitigated")]
    Mitigated,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 3] = [
        IncidentStatus::Reported,
        IncidentStatus::UnderReview,
        IncidentStatus::Mitigated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Reported => "Reportado",
            IncidentStatus::UnderReview => "En revisión",
            IncidentStatus::Mitigated => "Mitigado",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_incident_json_shape() {
        let raw = json!({
            "id": "INC-003",
            "type": "Inundación",
            "severity": "Bajo",
            "date": "2024-03-15",
            "description": "Acumulación de agua en zona de excavación.",
            "status": "Mitigado",
            "project": "Metro de Bogotá"
        });

        let incident: Incident = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(incident.incident_type, "Inundación");
        assert_eq!(incident.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(incident.status, IncidentStatus::Mitigated);

        // Serializes back to the dashboard's field names and labels
        assert_eq!(serde_json::to_value(&incident).unwrap(), raw);
    }

    #[test]
    fn test_incident_accepts_english_enums() {
        let incident: Incident = serde_json::from_value(json!({
            "id": "INC-1",
            "type": "Flood",
            "severity": "Low",
            "date": "2024-03-15",
            "description": "minor pooling",
            "status": "Under Review",
            "project": "Bridge"
        }))
        .unwrap();

        assert_eq!(incident.severity, Severity::Low);
        assert_eq!(incident.status, IncidentStatus::UnderReview);
    }

    #[test]
    fn test_incident_rejects_bad_date() {
        let result = serde_json::from_value::<Incident>(json!({
            "id": "INC-1",
            "type": "Flood",
            "severity": "Bajo",
            "date": "15/03/2024",
            "description": "",
            "status": "Mitigado",
            "project": "Bridge"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_reported_at_is_midnight_utc() {
        let incident = Incident {
            id: "INC-9".to_string(),
            incident_type: "Otro".to_string(),
            severity: Severity::Medium,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            description: String::new(),
            status: IncidentStatus::Reported,
            project: "Túnel de Oriente".to_string(),
        };
        assert_eq!(incident.reported_at().to_rfc3339(), "2024-06-01T00:00:00+00:00");
    }
}
