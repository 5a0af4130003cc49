use chrono::NaiveDate;
use serde::Serialize;

/// One (location, date) row of the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub location: String,
    pub date: NaiveDate,
    pub total_cases: Option<u64>,
    pub total_deaths: Option<u64>,
    pub people_fully_vaccinated_per_hundred: Option<f64>,
    pub hosp_patients: Option<u64>,
}

/// Every observation read from the source, in file order. Never mutated after load.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Observation>,
}

impl Dataset {
    pub fn new(records: Vec<Observation>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Observation] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A filtered subsequence of a [`Dataset`] that borrows its rows.
#[derive(Debug, Clone)]
pub struct View<'a> {
    pub(crate) label: String,
    pub(crate) rows: Vec<&'a Observation>,
}

impl<'a> View<'a> {
    pub fn rows(&self) -> &[&'a Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Location the view was selected for.
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    VaccinatedPercent,
    TotalDeaths,
    HospPatients,
}

impl Field {
    pub fn value(self, observation: &Observation) -> Option<f64> {
        match self {
            Field::VaccinatedPercent => observation.people_fully_vaccinated_per_hundred,
            Field::TotalDeaths => observation.total_deaths.map(|v| v as f64),
            Field::HospPatients => observation.hosp_patients.map(|v| v as f64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub display: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Chart { heading: String, chart: ChartSeries },
    Notice { heading: String, message: String },
    Indicators { heading: String, metrics: Vec<Metric> },
}

/// Everything the presentation layer needs to draw one location's page.
#[derive(Debug, Clone, Serialize)]
pub struct CountryReport {
    pub location: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub image: Option<String>,
    pub sections: Vec<Section>,
}
