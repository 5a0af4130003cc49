use std::fmt::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::config::{ReportConfig, SectionKind};
use crate::error::Result;
use crate::metrics;
use crate::models::{ChartSeries, CountryReport, Field, Section, View};
use crate::query;

const X_LABEL: &str = "Date";

fn chart(view: &View<'_>, field: Field, title: &str, y_label: &str) -> ChartSeries {
    ChartSeries {
        title: title.to_string(),
        x_label: X_LABEL.to_string(),
        y_label: y_label.to_string(),
        points: query::series(view, field),
    }
}

fn build_section(
    kind: SectionKind,
    view: &View<'_>,
    config: &ReportConfig,
) -> Result<Section> {
    let section = match kind {
        SectionKind::Vaccination => Section::Chart {
            heading: "Full vaccination".to_string(),
            chart: chart(
                view,
                Field::VaccinatedPercent,
                "Full vaccination over time",
                "% of population fully vaccinated",
            ),
        },
        SectionKind::Deaths => Section::Chart {
            heading: "Cumulative deaths".to_string(),
            chart: chart(
                view,
                Field::TotalDeaths,
                "Cumulative COVID-19 deaths",
                "Cumulative deaths",
            ),
        },
        SectionKind::Hospitalizations if query::has_hospitalization_data(view) => {
            Section::Chart {
                heading: "Hospitalizations".to_string(),
                chart: chart(
                    view,
                    Field::HospPatients,
                    "COVID-19 hospitalizations",
                    "Hospitalized patients",
                ),
            }
        }
        SectionKind::Hospitalizations => Section::Notice {
            heading: "Hospitalizations".to_string(),
            message: config.hospitalization_notice.clone(),
        },
        SectionKind::Indicators => Section::Indicators {
            heading: "Key indicators".to_string(),
            metrics: metrics::indicators(view, config)?,
        },
    };
    Ok(section)
}

fn readable_image(path: Option<&Path>) -> Option<String> {
    let path = path?;
    match std::fs::File::open(path).and_then(|file| file.metadata()) {
        Ok(meta) if meta.is_file() => Some(path.display().to_string()),
        Ok(_) => {
            warn!(path = %path.display(), "image is not a regular file, omitting");
            None
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "image not loadable, omitting");
            None
        }
    }
}

/// Assemble the page for one location. Fails on an empty view.
pub fn build_report(view: &View<'_>, config: &ReportConfig) -> Result<CountryReport> {
    let (first_date, last_date) = query::date_range(view)?;
    let sections = config
        .sections
        .iter()
        .map(|kind| build_section(*kind, view, config))
        .collect::<Result<Vec<_>>>()?;

    info!(
        location = view.label(),
        rows = view.len(),
        sections = sections.len(),
        "built report"
    );

    Ok(CountryReport {
        location: view.label().to_string(),
        first_date,
        last_date,
        image: readable_image(config.image.as_deref()),
        sections,
    })
}

fn format_point(value: f64) -> String {
    if value.fract() == 0.0 && value >= 0.0 {
        metrics::format_count(Some(value as u64), "")
    } else {
        format!("{value:.2}")
    }
}

pub fn render_markdown(report: &CountryReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# COVID-19 analysis: {}", report.location);
    let _ = writeln!(
        output,
        "Data from {} to {}",
        report.first_date, report.last_date
    );

    let has_indicators = report
        .sections
        .iter()
        .any(|s| matches!(s, Section::Indicators { .. }));
    if let (Some(image), false) = (&report.image, has_indicators) {
        let _ = writeln!(output);
        let _ = writeln!(output, "![COVID-19]({image})");
    }

    for section in report.sections.iter() {
        let _ = writeln!(output);
        match section {
            Section::Chart { heading, chart } => {
                let _ = writeln!(output, "## {heading}");
                let _ = writeln!(output, "*{}* ({} vs {})", chart.title, chart.y_label, chart.x_label);
                let present = chart.points.iter().filter(|(_, v)| v.is_some()).count();
                let _ = writeln!(
                    output,
                    "- {} points, {} with values",
                    chart.points.len(),
                    present
                );
                let last = chart
                    .points
                    .iter()
                    .rev()
                    .find_map(|(date, v)| v.map(|v| (date, v)));
                match last {
                    Some((date, value)) => {
                        let _ = writeln!(output, "- latest value {} on {}", format_point(value), date);
                    }
                    None => {
                        let _ = writeln!(output, "- no values recorded");
                    }
                }
            }
            Section::Notice { heading, message } => {
                let _ = writeln!(output, "## {heading}");
                let _ = writeln!(output, "> {message}");
            }
            Section::Indicators { heading, metrics } => {
                if let Some(image) = &report.image {
                    let _ = writeln!(output, "![COVID-19]({image})");
                    let _ = writeln!(output);
                }
                let _ = writeln!(output, "## {heading}");
                for metric in metrics.iter() {
                    let _ = writeln!(output, "- {}: {}", metric.label, metric.display);
                }
            }
        }
    }

    output
}

pub fn render_json(report: &CountryReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
