use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One bookable sport and its portal-side activity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sport {
    pub name: String,
    pub activity_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SportsFile {
    pub sports: Vec<Sport>,
}

/// The catalog of sports the venue offers, keyed by display name.
///
/// Sport names arrive from operator requests and scraped data with varying
/// case, so all lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct SportCatalog {
    sports: Vec<Sport>,
}

impl SportCatalog {
    #[must_use]
    pub fn new(sports: Vec<Sport>) -> Self {
        Self { sports }
    }

    #[must_use]
    pub fn sports(&self) -> &[Sport] {
        &self.sports
    }

    /// Look up the portal activity id for a sport by name (case-insensitive).
    #[must_use]
    pub fn activity_id(&self, name: &str) -> Option<i64> {
        self.sports
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.activity_id)
    }

    /// Restrict the catalog to the named sports (case-insensitive).
    ///
    /// A filter that matches nothing falls back to the full catalog — a
    /// misspelled filter should widen collection, never silently disable it.
    #[must_use]
    pub fn filtered(&self, names: Option<&[String]>) -> Vec<Sport> {
        let Some(names) = names else {
            return self.sports.clone();
        };
        let matched: Vec<Sport> = self
            .sports
            .iter()
            .filter(|s| names.iter().any(|n| n.eq_ignore_ascii_case(&s.name)))
            .cloned()
            .collect();
        if matched.is_empty() {
            self.sports.clone()
        } else {
            matched
        }
    }
}

impl Default for SportCatalog {
    /// The venue's current offering; overridable via a YAML file.
    fn default() -> Self {
        Self::new(vec![
            Sport {
                name: "Badminton Synthetic".to_string(),
                activity_id: 16214,
            },
            Sport {
                name: "Badminton Premium Hybrid".to_string(),
                activity_id: 16215,
            },
            Sport {
                name: "Football 7 a side".to_string(),
                activity_id: 16216,
            },
            Sport {
                name: "Box Cricket 7 a side".to_string(),
                activity_id: 16217,
            },
            Sport {
                name: "Snooker".to_string(),
                activity_id: 16221,
            },
            Sport {
                name: "Pool 8 Ball".to_string(),
                activity_id: 16224,
            },
            Sport {
                name: "Snooker Pro".to_string(),
                activity_id: 16225,
            },
        ])
    }
}

/// Load and validate the sport catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sports(path: &Path) -> Result<SportCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SportsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: SportsFile = serde_yaml::from_str(&content)?;
    validate_sports(&file)?;

    Ok(SportCatalog::new(file.sports))
}

fn validate_sports(file: &SportsFile) -> Result<(), ConfigError> {
    if file.sports.is_empty() {
        return Err(ConfigError::Validation(
            "sports file must list at least one sport".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for sport in &file.sports {
        if sport.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sport name must be non-empty".to_string(),
            ));
        }
        if sport.activity_id <= 0 {
            return Err(ConfigError::Validation(format!(
                "sport '{}' has non-positive activity_id {}",
                sport.name, sport.activity_id
            )));
        }
        if !seen.insert(sport.name.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate sport name: {}",
                sport.name
            )));
        }
    }
    Ok(())
}
