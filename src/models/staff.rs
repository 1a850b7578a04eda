//! Staff routing: one staff member tours a subset of points, collecting
//! enough of every good while travelling as little as possible.

use good_lp::{Expression, Variable, constraint, variable};
use itertools::iproduct;
use serde::{Deserialize, Serialize};

use super::{Problem, display_value};
use crate::config::SolverConfig;
use crate::error::ModelError;
use crate::ilp::{Formulation, Sense, SolveStats, add_matrix, weighted_sum};
use crate::matrix::{DistanceMatrix, trace_route};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffRouting {
    /// Number of points, excluding the depot.
    pub points: usize,
    /// `available[t][j]`: amount of good `t` at point `j`. Column 0 is the
    /// depot and is never collected.
    pub available: Vec<Vec<f64>>,
    /// `required[t]`: amount of good `t` the staff must bring back.
    pub required: Vec<f64>,
    /// `(points + 1) x (points + 1)` matrix, row/column 0 is the depot.
    pub distances: Vec<Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffSolution {
    pub total_distance: f64,
    /// Visited nodes, starting and ending with depot `0`.
    pub route: Vec<usize>,
    /// Amount of each good collected along the route.
    pub collected: Vec<f64>,
    pub stats: SolveStats,
}

impl StaffRouting {
    /// Three points offering two kinds of goods.
    pub fn demo() -> Self {
        Self {
            points: 3,
            available: vec![vec![0.0, 1.0, 2.0, 0.0], vec![0.0, 2.0, 1.0, 1.0]],
            required: vec![2.0, 3.0],
            distances: vec![
                vec![0.0, 2.0, 4.0, 6.0],
                vec![2.0, 0.0, 2.0, 4.0],
                vec![4.0, 2.0, 0.0, 2.0],
                vec![6.0, 4.0, 2.0, 0.0],
            ],
        }
    }

    fn matrix(&self) -> Result<DistanceMatrix, ModelError> {
        DistanceMatrix::with_depot(&self.distances)
    }

    fn collected_along(&self, route: &[usize]) -> Vec<f64> {
        self.available
            .iter()
            .map(|goods| {
                route
                    .iter()
                    .filter(|&&node| node != 0)
                    .filter_map(|&node| goods.get(node))
                    .sum()
            })
            .collect()
    }
}

impl Problem for StaffRouting {
    type Solution = StaffSolution;

    fn name(&self) -> &'static str {
        "staff"
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.points == 0 {
            return Err(ModelError::invalid("staff routing needs at least one point"));
        }
        if self.distances.len() != self.points + 1 {
            return Err(ModelError::invalid(format!(
                "expected a {0}x{0} distance matrix, got {1} rows",
                self.points + 1,
                self.distances.len()
            )));
        }
        if self.available.len() != self.required.len() {
            return Err(ModelError::invalid(format!(
                "{} goods rows but {} requirements",
                self.available.len(),
                self.required.len()
            )));
        }
        for (t, row) in self.available.iter().enumerate() {
            if row.len() != self.points + 1 {
                return Err(ModelError::invalid(format!(
                    "goods row {} has {} entries, expected {}",
                    t + 1,
                    row.len(),
                    self.points + 1
                )));
            }
            let invalid = |v: &f64| !v.is_finite() || *v < 0.0;
            if row.iter().any(invalid) || invalid(&self.required[t]) {
                return Err(ModelError::invalid(format!(
                    "good {} has a negative or non-finite amount",
                    t + 1
                )));
            }
        }
        self.matrix().map(|_| ())
    }

    fn solve(&self, config: &SolverConfig) -> Result<StaffSolution, ModelError> {
        self.validate()?;
        let d = self.matrix()?;
        let m = self.points;
        let size = d.size();
        let end = d.closing_depot();

        let mut model = Formulation::new(self.name(), Sense::Minimise);

        // x[i][j] = 1: staff walks from i to j
        let x = add_matrix(&mut model, size, size, |_, _| variable().binary());

        // Every point is entered and left at most once
        for j in 1..=m {
            let entered: Expression = (0..=m).map(|i| x[i][j]).sum();
            model.constrain(constraint!(entered <= 1));
        }
        for i in 1..=m {
            let left: Expression = (1..=end).map(|j| x[i][j]).sum();
            model.constrain(constraint!(left <= 1));
        }

        // The tour starts at 0 and ends at the depot copy
        let start: Expression = (1..=m).map(|j| x[0][j]).sum();
        let finish: Expression = (1..=m).map(|i| x[i][end]).sum();
        model.constrain(constraint!(start == 1));
        model.constrain(constraint!(finish == 1));

        let into_start: Expression = (0..size).map(|i| x[i][0]).sum();
        let out_of_end: Expression = (0..size).map(|j| x[end][j]).sum();
        model.constrain(constraint!(into_start == 0));
        model.constrain(constraint!(out_of_end == 0));
        model.constrain(constraint!(x[0][end] == 0));

        for i in 0..size {
            model.constrain(constraint!(x[i][i] == 0));
        }

        // A visited point is left again
        for j in 1..=m {
            let inflow: Expression = (0..=m).map(|i| x[i][j]).sum();
            let outflow: Expression = (1..=end).map(|l| x[j][l]).sum();
            model.constrain(constraint!(inflow - outflow == 0));
        }

        // Enough of every good is collected at the visited points
        for (goods, &required) in self.available.iter().zip(&self.required) {
            let collected = weighted_sum(iproduct!(0..=m, 1..=m).map(|(i, j)| (x[i][j], goods[j])));
            model.constrain(constraint!(collected >= required));
        }

        if config.subtour_elimination && m > 1 {
            let order: Vec<Variable> = (0..m)
                .map(|_| model.add(variable().min(1).max(m as f64)))
                .collect();
            let big = m as f64;
            for (i, j) in iproduct!(1..=m, 1..=m) {
                if i != j {
                    model.constrain(constraint!(
                        order[i - 1] - order[j - 1] + big * x[i][j] <= big - 1.0
                    ));
                }
            }
        }

        model.set_objective(weighted_sum(
            iproduct!(0..size, 0..size)
                .filter(|(i, j)| i != j)
                .map(|(i, j)| (x[i][j], d.get(i, j))),
        ));

        let solved = model.solve(config)?;

        let route: Vec<usize> = trace_route(size, 0, end, |i, j| solved.is_set(x[i][j]))
            .map_err(|err| solved.readout_error(err))?
            .into_iter()
            .map(|node| if node == end { 0 } else { node })
            .collect();
        let collected = self.collected_along(&route);

        Ok(StaffSolution {
            total_distance: solved.objective,
            route,
            collected,
            stats: solved.stats,
        })
    }

    fn check(&self, solution: &StaffSolution) -> Vec<String> {
        let mut violations = Vec::new();
        let Ok(d) = self.matrix() else {
            return vec!["instance has an invalid distance matrix".to_string()];
        };
        let route = &solution.route;

        if route.len() < 3 || route.first() != Some(&0) || route.last() != Some(&0) {
            violations.push(format!("route {route:?} is not a depot tour"));
            return violations;
        }

        let inner = &route[1..route.len() - 1];
        let mut seen = vec![false; self.points + 1];
        for &point in inner {
            if point == 0 || point > self.points {
                violations.push(format!("route visits invalid node {point}"));
            } else if std::mem::replace(&mut seen[point], true) {
                violations.push(format!("point {point} visited more than once"));
            }
        }

        let collected = self.collected_along(route);
        for (t, (&got, &need)) in collected.iter().zip(&self.required).enumerate() {
            if got + 1e-6 < need {
                violations.push(format!("good {} collected {} < {}", t + 1, got, need));
            }
        }

        let mut path = route.clone();
        if let Some(last) = path.last_mut() {
            *last = d.closing_depot();
        }
        let length = d.path_length(&path);
        if (length - solution.total_distance).abs() > 1e-6 * length.max(1.0) {
            violations.push(format!(
                "route measures {} but objective is {}",
                length, solution.total_distance
            ));
        }

        violations
    }
}

impl super::Rendered for StaffSolution {
    fn objective(&self) -> f64 {
        self.total_distance
    }

    fn stats(&self) -> &SolveStats {
        &self.stats
    }

    fn render(&self) -> String {
        let stops: Vec<String> = self.route.iter().map(ToString::to_string).collect();
        let mut out = format!(
            "Total Distance: {}\n{}\n",
            display_value(self.total_distance),
            stops.join(", ")
        );
        for (t, amount) in self.collected.iter().enumerate() {
            out.push_str(&format!("Good {}: {}\n", t + 1, display_value(*amount)));
        }
        out
    }
}
