//! Solve outcomes and their pretty, CSV and JSON renderings.

use std::fmt;

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled, settings::Style};

use crate::error::ModelError;
use crate::ilp::Termination;
use crate::models::{ProblemKind, Rendered, display_value};

/// Outcome of one solve as reported to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// A solution was found but CBC stopped on a time or gap limit before
    /// proving it optimal.
    Feasible,
    Infeasible,
    Unbounded,
    Stopped,
    InvalidInstance,
    Error,
}

impl SolveStatus {
    pub fn from_termination(termination: Termination) -> Self {
        if termination.is_optimal() {
            SolveStatus::Optimal
        } else {
            SolveStatus::Feasible
        }
    }

    pub fn from_error(err: &ModelError) -> Self {
        match err {
            ModelError::InvalidInstance(_)
            | ModelError::CyclicPrecedence(_)
            | ModelError::Unreadable(_) => SolveStatus::InvalidInstance,
            ModelError::Infeasible => SolveStatus::Infeasible,
            ModelError::Unbounded => SolveStatus::Unbounded,
            ModelError::Stopped(_) => SolveStatus::Stopped,
            ModelError::Solver(_) | ModelError::Readout(_) => SolveStatus::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Stopped => "stopped",
            SolveStatus::InvalidInstance => "invalid instance",
            SolveStatus::Error => "error",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn format_kind(kind: &Option<ProblemKind>) -> String {
    kind.map_or_else(|| "-".to_string(), |kind| kind.to_string())
}

fn format_objective(objective: &Option<f64>) -> String {
    objective.map(display_value).unwrap_or_else(|| "-".to_string())
}

fn format_seconds(seconds: &f64) -> String {
    format!("{seconds:.3}s")
}

/// One row of a summary: which instance, what happened, how big it was.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Tabled)]
pub struct Report {
    /// `None` when the instance file could not be read.
    #[tabled(rename = "Kind", display_with = "format_kind")]
    pub kind: Option<ProblemKind>,
    #[tabled(rename = "Instance")]
    pub label: String,
    #[tabled(rename = "Status")]
    pub status: SolveStatus,
    #[tabled(rename = "Objective", display_with = "format_objective")]
    pub objective: Option<f64>,
    #[tabled(rename = "Variables")]
    pub variables: usize,
    #[tabled(rename = "Constraints")]
    pub constraints: usize,
    #[tabled(rename = "Time", display_with = "format_seconds")]
    pub seconds: f64,
    #[tabled(skip)]
    pub solution: String,
    #[tabled(skip)]
    pub error: Option<String>,
}

impl Report {
    pub fn from_result<S: Rendered>(
        kind: ProblemKind,
        label: String,
        result: Result<S, ModelError>,
    ) -> Self {
        match result {
            Ok(solution) => {
                let stats = solution.stats();
                Report {
                    kind: Some(kind),
                    label,
                    status: SolveStatus::from_termination(stats.termination),
                    objective: Some(solution.objective()),
                    variables: stats.variables,
                    constraints: stats.constraints,
                    seconds: stats.time.as_secs_f64(),
                    solution: solution.render(),
                    error: None,
                }
            }
            Err(err) => Report::failed(Some(kind), label, err),
        }
    }

    /// A row for an instance that produced no solution.
    pub fn failed(kind: Option<ProblemKind>, label: String, err: ModelError) -> Self {
        let status = SolveStatus::from_error(&err);
        let solution = match status {
            SolveStatus::Infeasible => "No feasible solution\n".to_string(),
            _ => String::new(),
        };
        tracing::info!(kind = ?kind, %label, error = %err, "Instance not solved");
        Report {
            kind,
            label,
            status,
            objective: None,
            variables: 0,
            constraints: 0,
            seconds: 0.0,
            solution,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Solution listings followed by a summary table.
    #[default]
    Pretty,
    /// Summary rows as CSV.
    Csv,
    /// Full reports as a JSON array.
    Json,
}

/// Pretty formatter: per-instance listings and a rounded summary table.
pub struct PrettyFormatter;

impl PrettyFormatter {
    pub fn format(reports: &[Report]) -> String {
        if reports.is_empty() {
            return String::new();
        }

        let mut buffer = String::new();
        for report in reports {
            let heading = format!("=== {} ({}) ===", report.label, format_kind(&report.kind));
            let heading = if report.status.is_success() {
                heading.green().bold()
            } else {
                heading.red().bold()
            };
            buffer.push_str(&format!("{heading}\n"));
            buffer.push_str(&report.solution);
            if let Some(error) = &report.error {
                buffer.push_str(&format!("{}\n", error.yellow()));
            }
            buffer.push('\n');
        }

        let mut table = Table::new(reports);
        table.with(Style::rounded());
        buffer.push_str(&table.to_string());
        buffer.push('\n');
        buffer
    }
}

/// CSV formatter over the summary columns.
pub struct CsvFormatter;

#[derive(Serialize)]
struct CsvRow<'a> {
    kind: &'static str,
    instance: &'a str,
    status: &'static str,
    objective: Option<f64>,
    variables: usize,
    constraints: usize,
    seconds: f64,
    error: Option<&'a str>,
}

impl CsvFormatter {
    pub fn format(reports: &[Report]) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for report in reports {
            writer.serialize(CsvRow {
                kind: report.kind.map_or("", ProblemKind::as_str),
                instance: &report.label,
                status: report.status.as_str(),
                objective: report.objective,
                variables: report.variables,
                constraints: report.constraints,
                seconds: report.seconds,
                error: report.error.as_deref(),
            })?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub fn format_reports(reports: &[Report], format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Pretty => PrettyFormatter::format(reports),
        OutputFormat::Csv => CsvFormatter::format(reports)?,
        OutputFormat::Json => serde_json::to_string_pretty(reports)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solved() -> Report {
        Report {
            kind: Some(ProblemKind::Fleet),
            label: "demo".to_string(),
            status: SolveStatus::Optimal,
            objective: Some(85.0),
            variables: 35,
            constraints: 60,
            seconds: 0.25,
            solution: "Total Distance: 85\n".to_string(),
            error: None,
        }
    }

    #[test]
    fn status_from_error() {
        assert_eq!(SolveStatus::from_error(&ModelError::Infeasible), SolveStatus::Infeasible);
        assert_eq!(
            SolveStatus::from_error(&ModelError::CyclicPrecedence(0)),
            SolveStatus::InvalidInstance
        );
        assert_eq!(
            SolveStatus::from_error(&ModelError::Readout("x".into())),
            SolveStatus::Error
        );
    }

    #[test]
    fn limit_stop_is_feasible_not_optimal() {
        assert_eq!(SolveStatus::from_termination(Termination::Optimal), SolveStatus::Optimal);
        assert_eq!(SolveStatus::from_termination(Termination::TimeLimit), SolveStatus::Feasible);
        assert_eq!(SolveStatus::from_termination(Termination::GapLimit), SolveStatus::Feasible);
        assert!(!SolveStatus::Feasible.is_success());
    }

    #[test]
    fn report_takes_status_from_termination() {
        let solution = crate::models::FleetSolution {
            total_distance: 90.0,
            routes: vec![vec![0, 1, 0], vec![0, 3, 2, 0]],
            stats: crate::ilp::SolveStats {
                termination: Termination::TimeLimit,
                ..Default::default()
            },
        };
        let report = Report::from_result(ProblemKind::Fleet, "limited".to_string(), Ok(solution));
        assert_eq!(report.status, SolveStatus::Feasible);
        assert_eq!(report.objective, Some(90.0));
    }

    #[test]
    fn unreadable_file_row_has_no_kind() {
        colored::control::set_override(false);
        let report = Report::failed(
            None,
            "missing".to_string(),
            ModelError::Unreadable("no such file".into()),
        );
        assert_eq!(report.status, SolveStatus::InvalidInstance);
        let csv = CsvFormatter::format(std::slice::from_ref(&report)).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with(",missing,invalid instance,"));
        assert!(PrettyFormatter::format(&[report]).contains("=== missing (-) ==="));
    }

    #[test]
    fn infeasible_report_says_so() {
        let report = Report::from_result::<crate::models::FleetSolution>(
            ProblemKind::Schedule,
            "demo".to_string(),
            Err(ModelError::Infeasible),
        );
        assert_eq!(report.status, SolveStatus::Infeasible);
        assert_eq!(report.solution, "No feasible solution\n");
        assert!(report.error.is_some());
    }

    #[test]
    fn csv_has_header_and_row() {
        let csv = CsvFormatter::format(&[solved()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("kind,instance,status,objective,variables,constraints,seconds,error")
        );
        assert_eq!(lines.next(), Some("fleet,demo,optimal,85.0,35,60,0.25,"));
    }

    #[test]
    fn pretty_contains_listing_and_table() {
        colored::control::set_override(false);
        let text = PrettyFormatter::format(&[solved()]);
        assert!(text.contains("=== demo (fleet) ==="));
        assert!(text.contains("Total Distance: 85"));
        assert!(text.contains("Objective"));
        assert!(text.contains("0.250s"));
    }

    #[test]
    fn json_is_an_array() {
        let json = format_reports(&[solved()], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["kind"], "fleet");
        assert_eq!(value[0]["objective"], 85.0);
    }

    #[test]
    fn empty_pretty_is_empty() {
        assert!(PrettyFormatter::format(&[]).is_empty());
    }
}
