//! The four optimization models and the surface they share.

pub mod fleet;
pub mod product;
pub mod schedule;
pub mod staff;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::ModelError;
use crate::ilp::SolveStats;
use crate::report::Report;

pub use self::fleet::{FleetRouting, FleetSolution};
pub use self::product::{ProductMix, ProductSolution};
pub use self::schedule::{ScheduleSolution, ScheduledTask, TaskScheduling};
pub use self::staff::{StaffRouting, StaffSolution};

/// An instance that can be formulated as a MILP and solved.
pub trait Problem {
    type Solution: Rendered;

    fn name(&self) -> &'static str;

    /// Rejects malformed data before any variable is created.
    fn validate(&self) -> Result<(), ModelError>;

    /// Validates the instance, builds the model, solves it with CBC and
    /// reads the solution back.
    fn solve(&self, config: &SolverConfig) -> Result<Self::Solution, ModelError>;

    /// Re-checks a solution against the instance data, independently of the
    /// model rows. Returns one message per violated condition.
    fn check(&self, solution: &Self::Solution) -> Vec<String>;
}

/// A solved instance that can print itself.
pub trait Rendered {
    fn objective(&self) -> f64;

    fn stats(&self) -> &SolveStats;

    /// Plain text listing in the classic line-by-line format.
    fn render(&self) -> String;
}

/// Solves and checks `problem`.
///
/// After a proven optimum, check violations are only logged so the answer can
/// still be inspected. After a time or gap stop they mean CBC had no
/// incumbent, and the solve fails with [`ModelError::Stopped`].
pub fn run<P: Problem>(problem: &P, config: &SolverConfig) -> Result<P::Solution, ModelError> {
    let solution = problem.solve(config)?;
    let violations = problem.check(&solution);
    let termination = solution.stats().termination;
    if !termination.is_optimal() {
        if let Some(first) = violations.first() {
            tracing::warn!(
                model = problem.name(),
                termination = termination.as_str(),
                violations = violations.len(),
                "Stopped without a feasible solution"
            );
            return Err(ModelError::Stopped(format!(
                "{} reached without a feasible solution ({first})",
                termination.as_str()
            )));
        }
    }
    for violation in violations {
        tracing::warn!(model = problem.name(), %violation, "Solution check failed");
    }
    Ok(solution)
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Fleet,
    Staff,
    Product,
    Schedule,
}

impl ProblemKind {
    pub const ALL: [ProblemKind; 4] = [
        ProblemKind::Fleet,
        ProblemKind::Staff,
        ProblemKind::Product,
        ProblemKind::Schedule,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProblemKind::Fleet => "fleet",
            ProblemKind::Staff => "staff",
            ProblemKind::Product => "product",
            ProblemKind::Schedule => "schedule",
        }
    }

    /// The built-in example instance of this kind.
    pub fn demo(self) -> Instance {
        match self {
            ProblemKind::Fleet => Instance::Fleet(FleetRouting::demo()),
            ProblemKind::Staff => Instance::Staff(StaffRouting::demo()),
            ProblemKind::Product => Instance::Product(ProductMix::demo()),
            ProblemKind::Schedule => Instance::Schedule(TaskScheduling::demo()),
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any instance, as stored in a JSON file tagged by `"kind"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instance {
    Fleet(FleetRouting),
    Staff(StaffRouting),
    Product(ProductMix),
    Schedule(TaskScheduling),
}

impl Instance {
    pub fn kind(&self) -> ProblemKind {
        match self {
            Instance::Fleet(_) => ProblemKind::Fleet,
            Instance::Staff(_) => ProblemKind::Staff,
            Instance::Product(_) => ProblemKind::Product,
            Instance::Schedule(_) => ProblemKind::Schedule,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Instance::Fleet(p) => p.validate(),
            Instance::Staff(p) => p.validate(),
            Instance::Product(p) => p.validate(),
            Instance::Schedule(p) => p.validate(),
        }
    }

    /// Solves the instance and summarises the outcome, successful or not.
    pub fn solve(&self, label: impl Into<String>, config: &SolverConfig) -> Report {
        let label = label.into();
        let kind = self.kind();
        match self {
            Instance::Fleet(p) => Report::from_result(kind, label, run(p, config)),
            Instance::Staff(p) => Report::from_result(kind, label, run(p, config)),
            Instance::Product(p) => Report::from_result(kind, label, run(p, config)),
            Instance::Schedule(p) => Report::from_result(kind, label, run(p, config)),
        }
    }
}

/// Formats a solver value, hiding floating point noise below 1e-6.
pub fn display_value(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        // avoid "-0"
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}
