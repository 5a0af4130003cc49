use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::models::{Dataset, Field, Observation, View};

/// Distinct locations, ascending.
pub fn list_locations(ds: &Dataset) -> Vec<String> {
    ds.records()
        .iter()
        .map(|r| r.location.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn select_location<'a>(ds: &'a Dataset, location: &str) -> View<'a> {
    let rows: Vec<&Observation> = ds
        .records()
        .iter()
        .filter(|r| r.location == location)
        .collect();
    debug!(location, rows = rows.len(), "selected location");
    View {
        label: location.to_string(),
        rows,
    }
}

pub fn date_range(view: &View<'_>) -> Result<(NaiveDate, NaiveDate)> {
    let mut dates = view.rows().iter().map(|r| r.date);
    let first = dates.next().ok_or_else(|| empty(view))?;
    Ok(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// The record with the maximum date. Two records on that date is a data error.
pub fn latest<'a>(view: &View<'a>) -> Result<&'a Observation> {
    let (_, max_date) = date_range(view)?;
    let mut at_max = view.rows().iter().copied().filter(|r| r.date == max_date);
    let found = at_max.next().ok_or_else(|| empty(view))?;
    let extra = at_max.count();
    if extra > 0 {
        return Err(ReportError::DuplicateLatestDate {
            location: view.label().to_string(),
            date: max_date,
            count: extra + 1,
        });
    }
    Ok(found)
}

pub fn has_hospitalization_data(view: &View<'_>) -> bool {
    view.rows().iter().any(|r| r.hosp_patients.is_some())
}

/// Chart points in view order. Missing values stay missing.
pub fn series(view: &View<'_>, field: Field) -> Vec<(NaiveDate, Option<f64>)> {
    view.rows()
        .iter()
        .map(|r| (r.date, field.value(r)))
        .collect()
}

fn empty(view: &View<'_>) -> ReportError {
    ReportError::EmptyView {
        location: view.label().to_string(),
    }
}
