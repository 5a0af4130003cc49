use std::path::PathBuf;

use chrono::NaiveDate;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// Backing file is missing or unreadable.
    #[error("source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row could not be turned into an observation. Fails the whole load.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("no records for {location}")]
    EmptyView { location: String },

    /// More than one record carries the latest date for a location.
    #[error("{count} records share the latest date {date} for {location}")]
    DuplicateLatestDate {
        location: String,
        date: NaiveDate,
        count: usize,
    },
}

pub type Result<T> = std::result::Result<T, ReportError>;
