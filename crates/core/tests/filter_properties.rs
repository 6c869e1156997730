//! Property tests for the report filter engine
//!
//! - output is a subsequence of the input (no fabricated rows, order kept)
//! - wildcard filters return the input unchanged
//! - every returned row satisfies the filter

use chrono::NaiveDate;
use obras_core::{filter_incidents, DateRange, Incident, IncidentFilter, IncidentStatus, Severity};
use proptest::prelude::*;

const PROJECTS: &[&str] = &["Viaducto del Suroeste", "Metro de Bogotá", "Túnel de Oriente"];
const TYPES: &[&str] = &["Deslizamiento", "Inundación", "Falla Estructural", "Otro"];

fn arb_incident() -> impl Strategy<Value = Incident> {
    (
        0u32..10_000,
        prop::sample::select(PROJECTS),
        prop::sample::select(TYPES),
        prop::sample::select(Severity::ALL.to_vec()),
        prop::sample::select(IncidentStatus::ALL.to_vec()),
        0i64..365,
        ".{0,40}",
    )
        .prop_map(|(n, project, kind, severity, status, day, description)| Incident {
            id: format!("INC-{:04}", n),
            incident_type: kind.to_string(),
            severity,
            date: base_date() + chrono::Duration::days(day),
            description,
            status,
            project: project.to_string(),
        })
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn arb_filter() -> impl Strategy<Value = IncidentFilter> {
    (
        prop::option::of(prop::sample::select(PROJECTS)),
        prop::option::of(prop::sample::select(TYPES)),
        prop::option::of((0i64..365, prop::option::of(0i64..365))),
    )
        .prop_map(|(project, kind, range)| {
            let mut filter = IncidentFilter::all();
            if let Some(project) = project {
                filter = filter.with_project(project);
            }
            if let Some(kind) = kind {
                filter = filter.with_type(kind);
            }
            if let Some((from, to)) = range {
                let from = obras_core::date::start_of_day(base_date() + chrono::Duration::days(from));
                let to = to.map(|d| {
                    obras_core::date::start_of_day(base_date() + chrono::Duration::days(d))
                });
                filter = filter.with_range(DateRange::new(from, to));
            }
            filter
        })
}

/// True when `sub` appears in `full` in the same relative order, by identity.
fn is_subsequence(sub: &[&Incident], full: &[Incident]) -> bool {
    let mut cursor = full.iter();
    sub.iter()
        .all(|wanted| cursor.any(|candidate| std::ptr::eq(candidate, *wanted)))
}

proptest! {
    #[test]
    fn filtered_rows_are_an_ordered_subset(
        incidents in prop::collection::vec(arb_incident(), 0..40),
        filter in arb_filter(),
    ) {
        let result = filter_incidents(&incidents, &filter);
        prop_assert!(result.len() <= incidents.len());
        prop_assert!(is_subsequence(&result, &incidents));
    }

    #[test]
    fn every_returned_row_matches(
        incidents in prop::collection::vec(arb_incident(), 0..40),
        filter in arb_filter(),
    ) {
        let result = filter_incidents(&incidents, &filter);
        for row in &result {
            prop_assert!(filter.matches(row));
        }
        let rejected = incidents.iter().filter(|i| !filter.matches(i)).count();
        prop_assert_eq!(result.len() + rejected, incidents.len());
    }

    #[test]
    fn wildcard_filter_is_identity(incidents in prop::collection::vec(arb_incident(), 0..40)) {
        let filter = IncidentFilter::all().with_project("all").with_type("all");
        let result: Vec<Incident> = filter_incidents(&incidents, &filter)
            .into_iter()
            .cloned()
            .collect();
        prop_assert_eq!(result, incidents);
    }
}
