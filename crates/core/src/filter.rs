//! Report filter engine.
//!
//! Selection is a stable subset of the input: rows are borrowed, never
//! copied or reordered.

use super::{DateRange, Incident};

/// Wildcard accepted by the project and type selectors.
pub const ALL: &str = "all";

/// Criteria applied to an incident collection. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    pub project: Option<String>,
    pub incident_type: Option<String>,
    pub range: Option<DateRange>,
}

impl IncidentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one project. `"all"` and empty values clear the selector.
    pub fn with_project(mut self, project: &str) -> Self {
        self.project = selector(project);
        self
    }

    /// Restrict to one incident type. `"all"` and empty values clear the selector.
    pub fn with_type(mut self, incident_type: &str) -> Self {
        self.incident_type = selector(incident_type);
        self
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        if let Some(project) = &self.project {
            if incident.project != *project {
                return false;
            }
        }

        if let Some(incident_type) = &self.incident_type {
            if incident.incident_type != *incident_type {
                return false;
            }
        }

        match &self.range {
            Some(range) => range.contains(incident.reported_at()),
            None => true,
        }
    }
}

fn selector(value: &str) -> Option<String> {
    if value.is_empty() || value == ALL {
        None
    } else {
        Some(value.to_string())
    }
}

/// Return the incidents matching `filter`, in input order.
pub fn filter_incidents<'a>(incidents: &'a [Incident], filter: &IncidentFilter) -> Vec<&'a Incident> {
    incidents.iter().filter(|i| filter.matches(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IncidentStatus, Severity};
    use chrono::NaiveDate;

    fn incident(id: &str, project: &str, kind: &str, date: (i32, u32, u32)) -> Incident {
        Incident {
            id: id.to_string(),
            incident_type: kind.to_string(),
            severity: Severity::High,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description: format!("{} description", id),
            status: IncidentStatus::Reported,
            project: project.to_string(),
        }
    }

    fn fixture() -> Vec<Incident> {
        vec![
            incident("INC-001", "Viaducto del Suroeste", "Deslizamiento", (2024, 5, 10)),
            incident("INC-002", "Autopista al Mar 2", "Falla Estructural", (2024, 4, 22)),
            incident("INC-003", "Metro de Bogotá", "Inundación", (2024, 3, 15)),
            incident("INC-004", "Hidroeléctrica Ituango", "Deslizamiento", (2024, 6, 1)),
        ]
    }

    fn ids(rows: &[&Incident]) -> Vec<String> {
        rows.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_no_filter_returns_everything() {
        let rows = fixture();
        let result = filter_incidents(&rows, &IncidentFilter::all());
        assert_eq!(ids(&result), vec!["INC-001", "INC-002", "INC-003", "INC-004"]);
    }

    #[test]
    fn test_all_keyword_is_wildcard() {
        let rows = fixture();
        let filter = IncidentFilter::all().with_project("all").with_type("");
        assert_eq!(filter, IncidentFilter::all());
        assert_eq!(filter_incidents(&rows, &filter).len(), 4);
    }

    #[test]
    fn test_project_exact_match() {
        let rows = fixture();
        let filter = IncidentFilter::all().with_project("Metro de Bogotá");
        assert_eq!(ids(&filter_incidents(&rows, &filter)), vec!["INC-003"]);

        // No substring or case-insensitive matching
        let filter = IncidentFilter::all().with_project("metro de bogotá");
        assert!(filter_incidents(&rows, &filter).is_empty());
        let filter = IncidentFilter::all().with_project("Metro");
        assert!(filter_incidents(&rows, &filter).is_empty());
    }

    #[test]
    fn test_type_filter_preserves_order() {
        let rows = fixture();
        let filter = IncidentFilter::all().with_type("Deslizamiento");
        assert_eq!(ids(&filter_incidents(&rows, &filter)), vec!["INC-001", "INC-004"]);
    }

    #[test]
    fn test_single_day_range() {
        let rows = fixture();
        let filter =
            IncidentFilter::all().with_range(DateRange::parse("2024-04-22", None).unwrap());
        assert_eq!(ids(&filter_incidents(&rows, &filter)), vec!["INC-002"]);
    }

    #[test]
    fn test_inclusive_range_combined_with_type() {
        let rows = fixture();
        let filter = IncidentFilter::all()
            .with_type("Deslizamiento")
            .with_range(DateRange::parse("2024-05-10", Some("2024-06-01")).unwrap());
        assert_eq!(ids(&filter_incidents(&rows, &filter)), vec!["INC-001", "INC-004"]);
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let rows = fixture();
        let filter = IncidentFilter::all()
            .with_range(DateRange::parse("2024-06-01", Some("2024-05-01")).unwrap());
        assert!(filter_incidents(&rows, &filter).is_empty());
    }

    #[test]
    fn test_range_with_time_component() {
        let rows = fixture();
        // Midnight of 2024-03-15 is before 10:00 the same day
        let filter = IncidentFilter::all()
            .with_range(DateRange::parse("2024-03-15T10:00:00Z", Some("2024-03-31")).unwrap());
        assert!(filter_incidents(&rows, &filter).is_empty());
    }
}
