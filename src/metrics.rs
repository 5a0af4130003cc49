use crate::config::ReportConfig;
use crate::error::Result;
use crate::models::{Metric, View};
use crate::query;

pub fn format_percentage(value: Option<f64>, fallback: &str) -> String {
    match value {
        Some(v) => format!("{v:.2}%"),
        None => fallback.to_string(),
    }
}

/// Whole number with comma thousands separators, e.g. `1,234,567`.
pub fn format_count(value: Option<u64>, fallback: &str) -> String {
    let Some(v) = value else {
        return fallback.to_string();
    };
    let digits = v.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Headline figures taken from the most recent record of the view.
pub fn indicators(view: &View<'_>, config: &ReportConfig) -> Result<Vec<Metric>> {
    let last = query::latest(view)?;
    Ok(vec![
        Metric {
            label: "Total cases".to_string(),
            display: format_count(last.total_cases, &config.count_fallback),
        },
        Metric {
            label: "Total deaths".to_string(),
            display: format_count(last.total_deaths, &config.count_fallback),
        },
        Metric {
            label: "Fully vaccinated (%)".to_string(),
            display: format_percentage(
                last.people_fully_vaccinated_per_hundred,
                &config.percentage_fallback,
            ),
        },
    ])
}
