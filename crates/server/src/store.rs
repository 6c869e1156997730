//! Incident catalog
//!
//! The export path is read-only: the catalog is loaded once at startup and
//! shared between requests without locking.

use obras_core::Incident;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SEED_INCIDENTS: &str = include_str!("../data/incidents.seed.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read incident file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid incident data in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate incident id {id} in {origin}")]
    DuplicateId { id: String, origin: String },
}

#[derive(Debug, Clone, Default)]
pub struct IncidentCatalog {
    incidents: Vec<Incident>,
}

impl IncidentCatalog {
    pub fn new(incidents: Vec<Incident>) -> Self {
        Self { incidents }
    }

    /// The dashboard's built-in sample incidents.
    pub fn seed() -> Result<Self, CatalogError> {
        Self::from_json(SEED_INCIDENTS, "embedded seed")
    }

    /// Load from a JSON array on disk, or fall back to the seed.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&raw, &path.display().to_string())
            }
            None => Self::seed(),
        }
    }

    pub fn from_json(raw: &str, origin: &str) -> Result<Self, CatalogError> {
        let incidents: Vec<Incident> =
            serde_json::from_str(raw).map_err(|source| CatalogError::Parse {
                origin: origin.to_string(),
                source,
            })?;

        let mut seen = std::collections::HashSet::new();
        for incident in &incidents {
            if !seen.insert(incident.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    id: incident.id.clone(),
                    origin: origin.to_string(),
                });
            }
        }

        Ok(Self { incidents })
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}
