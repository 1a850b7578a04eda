//! Integer Linear Programming (ILP) plumbing.
//!
//! Every model in [`crate::models`] collects its variables, rows and objective
//! in a [`Formulation`] and hands it to CBC through the `good_lp` library.

use std::time::{Duration, Instant};

use good_lp::solvers::coin_cbc::{CoinCbcProblem, CoinCbcSolution};
use good_lp::{
    Constraint, Expression, ProblemVariables, Solution, SolutionStatus, SolverModel, Variable,
    VariableDefinition, WithMipGap, WithTimeLimit, coin_cbc,
};
use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::ModelError;

/// Threshold above which a relaxed binary is read back as set.
pub const BINARY_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Minimise,
    Maximise,
}

/// Why CBC stopped searching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The returned point is proven optimal.
    #[default]
    Optimal,
    /// The time limit ran out. The point may be any incumbent, or none.
    TimeLimit,
    /// The incumbent is within the configured MIP gap.
    GapLimit,
}

impl Termination {
    pub fn is_optimal(self) -> bool {
        self == Termination::Optimal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Optimal => "optimal",
            Termination::TimeLimit => "time limit",
            Termination::GapLimit => "gap limit",
        }
    }
}

impl From<SolutionStatus> for Termination {
    fn from(status: SolutionStatus) -> Self {
        match status {
            SolutionStatus::Optimal => Termination::Optimal,
            SolutionStatus::GapLimit => Termination::GapLimit,
            SolutionStatus::TimeLimit => Termination::TimeLimit,
        }
    }
}

/// Size, timing and outcome of one solver run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    pub variables: usize,
    pub constraints: usize,
    #[serde(with = "duration_secs")]
    pub time: Duration,
    #[serde(default)]
    pub termination: Termination,
}

/// A model under construction: variables, rows and the objective.
pub struct Formulation {
    name: &'static str,
    sense: Sense,
    vars: ProblemVariables,
    constraints: Vec<Constraint>,
    objective: Expression,
    variable_count: usize,
}

/// The solver's answer with the objective evaluated at it.
pub struct Solved {
    pub solution: CoinCbcSolution,
    pub objective: f64,
    pub stats: SolveStats,
}

impl Formulation {
    pub fn new(name: &'static str, sense: Sense) -> Self {
        Self {
            name,
            sense,
            vars: ProblemVariables::new(),
            constraints: Vec::new(),
            objective: Expression::from(0),
            variable_count: 0,
        }
    }

    /// Adds a single decision variable.
    pub fn add(&mut self, definition: VariableDefinition) -> Variable {
        self.variable_count += 1;
        self.vars.add(definition)
    }

    /// Adds a row. Rows are applied in insertion order.
    pub fn constrain(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, objective: Expression) {
        self.objective = objective;
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Builds the CBC problem with every row attached and the configured
    /// limits applied.
    fn into_problem(
        self,
        config: &SolverConfig,
    ) -> Result<(CoinCbcProblem, Expression), ModelError> {
        let objective = self.objective.clone();
        let mut problem = match self.sense {
            Sense::Minimise => self.vars.minimise(self.objective).using(coin_cbc),
            Sense::Maximise => self.vars.maximise(self.objective).using(coin_cbc),
        };

        for (key, value) in config.cbc_parameters() {
            problem.set_parameter(key, &value);
        }
        if let Some(seconds) = config.time_limit {
            problem = problem.with_time_limit(seconds);
        }
        if let Some(gap) = config.mip_gap {
            problem = problem
                .with_mip_gap(gap as f32)
                .map_err(|err| ModelError::Solver(format!("invalid MIP gap {gap}: {err}")))?;
        }

        for constraint in self.constraints {
            problem = problem.with(constraint);
        }

        Ok((problem, objective))
    }

    /// Solves the model and evaluates the objective at the returned point.
    pub fn solve(self, config: &SolverConfig) -> Result<Solved, ModelError> {
        let name = self.name;
        let variables = self.variable_count;
        let constraints = self.constraints.len();
        tracing::debug!(
            model = name,
            variables,
            constraints,
            sense = ?self.sense,
            "Submitting model to CBC"
        );

        let (problem, objective_expr) = self.into_problem(config)?;

        let start = Instant::now();
        let result = problem.solve();
        let time = start.elapsed();

        let solution = result.map_err(|err| {
            tracing::info!(model = name, error = %err, ?time, "Solve failed");
            ModelError::from(err)
        })?;
        let termination = Termination::from(solution.status());
        let objective = objective_expr.eval_with(&solution);
        tracing::info!(
            model = name,
            objective,
            termination = termination.as_str(),
            ?time,
            "Solve finished"
        );

        Ok(Solved {
            solution,
            objective,
            stats: SolveStats {
                variables,
                constraints,
                time,
                termination,
            },
        })
    }
}

impl Solved {
    pub fn termination(&self) -> Termination {
        self.stats.termination
    }

    /// Error for a point that does not decode into a solution. After an
    /// early stop this means CBC had no incumbent, which is reported as a
    /// stop rather than a readout failure.
    pub fn readout_error(&self, err: ModelError) -> ModelError {
        match (self.termination(), err) {
            (Termination::Optimal, err) => err,
            (termination, ModelError::Readout(msg)) => ModelError::Stopped(format!(
                "{} reached without a usable solution ({msg})",
                termination.as_str()
            )),
            (_, err) => err,
        }
    }

    pub fn value(&self, variable: Variable) -> f64 {
        self.solution.value(variable)
    }

    pub fn is_set(&self, variable: Variable) -> bool {
        self.solution.value(variable) >= BINARY_THRESHOLD
    }
}

/// Adds `count` variables built by `definition`, returned in order.
pub fn add_vector<F>(formulation: &mut Formulation, count: usize, definition: F) -> Vec<Variable>
where
    F: Fn(usize) -> VariableDefinition,
{
    (0..count).map(|i| formulation.add(definition(i))).collect()
}

/// Adds a `rows x cols` grid of variables built by `definition`.
pub fn add_matrix<F>(
    formulation: &mut Formulation,
    rows: usize,
    cols: usize,
    definition: F,
) -> Vec<Vec<Variable>>
where
    F: Fn(usize, usize) -> VariableDefinition,
{
    (0..rows)
        .map(|i| (0..cols).map(|j| formulation.add(definition(i, j))).collect())
        .collect()
}

/// Builds `Σ coeff * var`, skipping zero coefficients.
pub fn weighted_sum<I>(terms: I) -> Expression
where
    I: IntoIterator<Item = (Variable, f64)>,
{
    terms
        .into_iter()
        .filter(|(_, coeff)| *coeff != 0.0)
        .map(|(var, coeff)| coeff * var)
        .sum()
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
