use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Vaccination,
    Deaths,
    Hospitalizations,
    Indicators,
}

/// Report settings. Every field has a default so a config file may set any subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// CSV with one row per (location, date)
    pub source: PathBuf,

    /// Location shown when none is requested
    pub default_location: String,

    /// Shown in place of a missing vaccination percentage
    pub percentage_fallback: String,

    /// Shown in place of a missing case or death count
    pub count_fallback: String,

    /// Shown instead of the hospitalization chart when there is no data
    pub hospitalization_notice: String,

    /// Page sections, top to bottom
    pub sections: Vec<SectionKind>,

    /// Decorative picture embedded above the indicators, if it can be read
    pub image: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("owid-covid-chile.csv"),
            default_location: "Chile".to_string(),
            percentage_fallback: "--.--%".to_string(),
            count_fallback: "N/A".to_string(),
            hospitalization_notice: "No hospitalization data available for this location."
                .to_string(),
            sections: vec![
                SectionKind::Vaccination,
                SectionKind::Deaths,
                SectionKind::Hospitalizations,
                SectionKind::Indicators,
            ],
            image: Some(PathBuf::from("covid_virus.png")),
        }
    }
}

impl ReportConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Defaults, or the file's settings when a path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
