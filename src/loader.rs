use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::models::{Dataset, Observation};

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    location: String,
    date: String,
    #[serde(default)]
    total_cases: Option<String>,
    #[serde(default)]
    total_deaths: Option<String>,
    #[serde(default)]
    people_fully_vaccinated_per_hundred: Option<String>,
    #[serde(default)]
    hosp_patients: Option<String>,
}

/// Read the whole source table. Any bad row fails the load.
pub fn load(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path).map_err(|source| ReportError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read source");

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|err| csv_error(err, 1))?
        .clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let raw = result.map_err(|err| csv_error(err, 0))?;
        let line = raw.position().map(|p| p.line()).unwrap_or(0);
        let row: CsvRow = raw
            .deserialize(Some(&headers))
            .map_err(|err| malformed(line, err.to_string()))?;
        records.push(to_observation(row, line)?);
    }

    let dataset = Dataset::new(records);
    info!(path = %path.display(), records = dataset.len(), "loaded dataset");
    Ok(dataset)
}

fn to_observation(row: CsvRow, line: u64) -> Result<Observation> {
    let location = row.location.trim();
    if location.is_empty() {
        return Err(malformed(line, "empty location".to_string()));
    }
    let date = parse_date(&row.date)
        .ok_or_else(|| malformed(line, format!("unparseable date {:?}", row.date)))?;

    Ok(Observation {
        location: location.to_string(),
        date,
        total_cases: parse_count(row.total_cases.as_deref(), "total_cases", line)?,
        total_deaths: parse_count(row.total_deaths.as_deref(), "total_deaths", line)?,
        people_fully_vaccinated_per_hundred: parse_percentage(
            row.people_fully_vaccinated_per_hundred.as_deref(),
            line,
        )?,
        hosp_patients: parse_count(row.hosp_patients.as_deref(), "hosp_patients", line)?,
    })
}

/// Accepts `YYYY-MM-DD`, a naive ISO timestamp, or RFC 3339. Time of day is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

// Largest whole number an f64 holds exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

// Counters are often written as floats ("1234.0"). Those are only taken when exact.
fn parse_count(raw: Option<&str>, column: &str, line: u64) -> Result<Option<u64>> {
    let Some(s) = present(raw) else {
        return Ok(None);
    };
    if let Ok(value) = s.parse::<u64>() {
        return Ok(Some(value));
    }
    let value: f64 = s
        .parse()
        .map_err(|_| malformed(line, format!("{column} is not a number: {s:?}")))?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > MAX_EXACT_FLOAT {
        return Err(malformed(
            line,
            format!("{column} must be a non-negative whole number, got {s:?}"),
        ));
    }
    Ok(Some(value as u64))
}

fn parse_percentage(raw: Option<&str>, line: u64) -> Result<Option<f64>> {
    let Some(s) = present(raw) else {
        return Ok(None);
    };
    match s.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
        _ => Err(malformed(
            line,
            format!("people_fully_vaccinated_per_hundred is not a valid percentage: {s:?}"),
        )),
    }
}

fn malformed(line: u64, reason: String) -> ReportError {
    ReportError::MalformedRecord { line, reason }
}

fn csv_error(err: csv::Error, fallback_line: u64) -> ReportError {
    let line = err
        .position()
        .map(|p| p.line())
        .unwrap_or(fallback_line);
    malformed(line, err.to_string())
}

/// Loads the source at most once; later calls share the same dataset.
/// A failed load leaves the cache empty so the next call retries the read.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    cell: OnceCell<Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_or_load(&self) -> Result<Arc<Dataset>> {
        self.cell
            .get_or_try_init(|| load(&self.path).map(Arc::new))
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_source(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write source");
        file
    }

    const HEADER: &str =
        "iso_code,location,date,total_cases,total_deaths,people_fully_vaccinated_per_hundred,hosp_patients\n";

    #[test]
    fn loads_rows_with_missing_values() {
        let file = write_source(&format!(
            "{HEADER}CHL,Chile,2021-01-01,1000.0,10.0,,\n\
             CHL,Chile,2021-01-02,1100,12,5.5,300\n"
        ));

        let ds = load(file.path()).unwrap();
        assert_eq!(ds.len(), 2);
        let first = &ds.records()[0];
        assert_eq!(first.location, "Chile");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(first.total_cases, Some(1000));
        assert_eq!(first.people_fully_vaccinated_per_hundred, None);
        assert_eq!(first.hosp_patients, None);
        assert_eq!(ds.records()[1].hosp_patients, Some(300));
    }

    #[test]
    fn absent_optional_column_reads_as_missing() {
        let file = write_source(
            "location,date,total_cases,total_deaths,people_fully_vaccinated_per_hundred\n\
             Narnia,2021-03-01,5,0,1.25\n",
        );

        let ds = load(file.path()).unwrap();
        assert_eq!(ds.records()[0].hosp_patients, None);
        assert_eq!(ds.records()[0].people_fully_vaccinated_per_hundred, Some(1.25));
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ReportError::SourceUnavailable { .. }));
    }

    #[test]
    fn bad_date_fails_whole_load() {
        let file = write_source(&format!(
            "{HEADER}CHL,Chile,2021-01-01,1,0,,\n\
             CHL,Chile,yesterday,2,0,,\n"
        ));

        match load(file.path()).unwrap_err() {
            ReportError::MalformedRecord { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("yesterday"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_count_is_malformed() {
        let file = write_source(&format!("{HEADER}CHL,Chile,2021-01-01,-4,0,,\n"));
        assert!(matches!(
            load(file.path()).unwrap_err(),
            ReportError::MalformedRecord { .. }
        ));
    }

    #[test]
    fn large_counts_are_exact_or_rejected() {
        let file = write_source(&format!(
            "{HEADER}CHL,Chile,2021-01-01,9007199254740993,0,,\n"
        ));
        let ds = load(file.path()).unwrap();
        assert_eq!(ds.records()[0].total_cases, Some(9_007_199_254_740_993));

        let file = write_source(&format!("{HEADER}CHL,Chile,2021-01-01,1e30,0,,\n"));
        assert!(matches!(
            load(file.path()).unwrap_err(),
            ReportError::MalformedRecord { line: 2, .. }
        ));

        let file = write_source(&format!(
            "{HEADER}CHL,Chile,2021-01-01,9007199254740994.0,0,,\n"
        ));
        assert!(matches!(
            load(file.path()).unwrap_err(),
            ReportError::MalformedRecord { .. }
        ));
    }

    #[test]
    fn empty_location_is_malformed() {
        let file = write_source(&format!(
            "{HEADER}CHL,Chile,2021-01-01,1,0,,\n\
             ,  ,2021-01-03,1,0,,\n"
        ));
        match load(file.path()).unwrap_err() {
            ReportError::MalformedRecord { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("location"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn location_is_trimmed() {
        let file = write_source(&format!("{HEADER}CHL, Chile ,2021-01-01,1,0,,\n"));
        assert_eq!(load(file.path()).unwrap().records()[0].location, "Chile");
    }

    #[test]
    fn parses_iso_variants() {
        let expected = NaiveDate::from_ymd_opt(2022, 5, 17);
        assert_eq!(parse_date("2022-05-17"), expected);
        assert_eq!(parse_date(" 2022-05-17T08:30:00 "), expected);
        assert_eq!(parse_date("2022-05-17 23:59:59"), expected);
        assert_eq!(parse_date("2022-05-17T08:30:00+02:00"), expected);
        assert_eq!(parse_date("17/05/2022"), None);
    }

    #[test]
    fn cache_reads_source_once() {
        let file = write_source(&format!("{HEADER}CHL,Chile,2021-01-01,1,0,,\n"));
        let path = file.path().to_path_buf();
        let cache = DatasetCache::new(&path);

        let first = cache.get_or_load().unwrap();
        drop(file);
        assert!(!path.exists());

        let second = cache.get_or_load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_does_not_keep_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.csv");
        let cache = DatasetCache::new(&path);
        assert!(cache.get_or_load().is_err());

        std::fs::write(&path, format!("{HEADER}CHL,Chile,2021-01-01,1,0,,\n")).unwrap();
        assert_eq!(cache.get_or_load().unwrap().len(), 1);
    }
}
