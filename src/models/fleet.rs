//! Vehicle routing with a fleet.
//!
//! `K` vehicles leave the depot, every point is served by exactly one of them,
//! and the total travelled distance is minimised. Node `N + 1` is a copy of
//! the depot so that every route is a path `0 -> ... -> N + 1`.

use good_lp::{Expression, Variable, constraint, variable};
use itertools::iproduct;
use serde::{Deserialize, Serialize};

use super::{Problem, display_value};
use crate::config::SolverConfig;
use crate::error::ModelError;
use crate::ilp::{Formulation, Sense, SolveStats, weighted_sum};
use crate::matrix::{DistanceMatrix, trace_route};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FleetRouting {
    /// Number of points to visit, excluding the depot.
    pub points: usize,
    pub vehicles: usize,
    /// `(points + 1) x (points + 1)` matrix, row/column 0 is the depot.
    pub distances: Vec<Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FleetSolution {
    pub total_distance: f64,
    /// One route per vehicle, starting and ending with depot `0`.
    pub routes: Vec<Vec<usize>>,
    pub stats: SolveStats,
}

impl FleetRouting {
    /// Three points served by two vehicles.
    pub fn demo() -> Self {
        Self {
            points: 3,
            vehicles: 2,
            distances: vec![
                vec![0.0, 10.0, 20.0, 30.0],
                vec![10.0, 0.0, 25.0, 35.0],
                vec![20.0, 25.0, 0.0, 15.0],
                vec![30.0, 35.0, 15.0, 0.0],
            ],
        }
    }

    fn matrix(&self) -> Result<DistanceMatrix, ModelError> {
        DistanceMatrix::with_depot(&self.distances)
    }
}

impl Problem for FleetRouting {
    type Solution = FleetSolution;

    fn name(&self) -> &'static str {
        "fleet"
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.points == 0 {
            return Err(ModelError::invalid("fleet routing needs at least one point"));
        }
        if self.vehicles == 0 {
            return Err(ModelError::invalid("fleet routing needs at least one vehicle"));
        }
        if self.distances.len() != self.points + 1 {
            return Err(ModelError::invalid(format!(
                "expected a {0}x{0} distance matrix, got {1} rows",
                self.points + 1,
                self.distances.len()
            )));
        }
        self.matrix().map(|_| ())
    }

    fn solve(&self, config: &SolverConfig) -> Result<FleetSolution, ModelError> {
        self.validate()?;
        let d = self.matrix()?;
        let n = self.points;
        let k_count = self.vehicles;
        let size = d.size();
        let end = d.closing_depot();

        let mut model = Formulation::new(self.name(), Sense::Minimise);

        // x[i][j][k] = 1: vehicle k drives from i to j
        let x: Vec<Vec<Vec<Variable>>> = (0..size)
            .map(|_| {
                (0..size)
                    .map(|_| (0..k_count).map(|_| model.add(variable().binary())).collect())
                    .collect()
            })
            .collect();

        // Every point is entered exactly once
        for j in 1..=n {
            let entered: Expression = iproduct!(0..=n, 0..k_count).map(|(i, k)| x[i][j][k]).sum();
            model.constrain(constraint!(entered == 1));
        }

        // Every point is left exactly once
        for i in 1..=n {
            let left: Expression = iproduct!(1..=end, 0..k_count).map(|(j, k)| x[i][j][k]).sum();
            model.constrain(constraint!(left == 1));
        }

        for k in 0..k_count {
            // Each vehicle starts at 0 and ends at the depot copy
            let start: Expression = (1..=n).map(|j| x[0][j][k]).sum();
            let finish: Expression = (1..=n).map(|i| x[i][end][k]).sum();
            model.constrain(constraint!(start == 1));
            model.constrain(constraint!(finish == 1));

            let into_start: Expression = (0..size).map(|i| x[i][0][k]).sum();
            let out_of_end: Expression = (0..size).map(|j| x[end][j][k]).sum();
            model.constrain(constraint!(into_start == 0));
            model.constrain(constraint!(out_of_end == 0));
            model.constrain(constraint!(x[0][end][k] == 0));

            // A vehicle that enters a point leaves it again
            for j in 1..=n {
                let inflow: Expression = (0..=n).map(|i| x[i][j][k]).sum();
                let outflow: Expression = (1..=end).map(|l| x[j][l][k]).sum();
                model.constrain(constraint!(inflow - outflow == 0));
            }
        }

        for (i, k) in iproduct!(0..size, 0..k_count) {
            model.constrain(constraint!(x[i][i][k] == 0));
        }

        if config.subtour_elimination && n > 1 {
            let order: Vec<Variable> = (0..n)
                .map(|_| model.add(variable().min(1).max(n as f64)))
                .collect();
            let big = n as f64;
            for (i, j) in iproduct!(1..=n, 1..=n) {
                if i == j {
                    continue;
                }
                let used = weighted_sum((0..k_count).map(|k| (x[i][j][k], big)));
                model.constrain(constraint!(order[i - 1] - order[j - 1] + used <= big - 1.0));
            }
        }

        model.set_objective(weighted_sum(
            iproduct!(0..size, 0..size, 0..k_count)
                .filter(|(i, j, _)| i != j)
                .map(|(i, j, k)| (x[i][j][k], d.get(i, j))),
        ));

        let solved = model.solve(config)?;

        let routes = (0..k_count)
            .map(|k| {
                trace_route(size, 0, end, |i, j| solved.is_set(x[i][j][k])).map(|route| {
                    route
                        .into_iter()
                        .map(|node| if node == end { 0 } else { node })
                        .collect()
                })
            })
            .collect::<Result<Vec<Vec<usize>>, ModelError>>()
            .map_err(|err| solved.readout_error(err))?;

        Ok(FleetSolution {
            total_distance: solved.objective,
            routes,
            stats: solved.stats,
        })
    }

    fn check(&self, solution: &FleetSolution) -> Vec<String> {
        let mut violations = Vec::new();
        let Ok(d) = self.matrix() else {
            return vec!["instance has an invalid distance matrix".to_string()];
        };

        if solution.routes.len() != self.vehicles {
            violations.push(format!(
                "{} routes for {} vehicles",
                solution.routes.len(),
                self.vehicles
            ));
        }

        let mut visits = vec![0usize; self.points + 1];
        let mut length = 0.0;
        for (k, route) in solution.routes.iter().enumerate() {
            if route.len() < 3 || route.first() != Some(&0) || route.last() != Some(&0) {
                violations.push(format!("vehicle {} route {:?} is not a depot tour", k + 1, route));
                continue;
            }
            for &point in &route[1..route.len() - 1] {
                match visits.get_mut(point) {
                    Some(count) if point != 0 => *count += 1,
                    _ => violations.push(format!(
                        "vehicle {} visits invalid node {}",
                        k + 1,
                        point
                    )),
                }
            }
            let mut path = route.clone();
            if let Some(last) = path.last_mut() {
                *last = d.closing_depot();
            }
            length += d.path_length(&path);
        }

        for (point, &count) in visits.iter().enumerate().skip(1) {
            if count != 1 {
                violations.push(format!("point {point} visited {count} times"));
            }
        }

        if (length - solution.total_distance).abs() > 1e-6 * length.max(1.0) {
            violations.push(format!(
                "routes measure {} but objective is {}",
                length, solution.total_distance
            ));
        }

        violations
    }
}

impl super::Rendered for FleetSolution {
    fn objective(&self) -> f64 {
        self.total_distance
    }

    fn stats(&self) -> &SolveStats {
        &self.stats
    }

    fn render(&self) -> String {
        let mut out = format!("Total Distance: {}\n", display_value(self.total_distance));
        for (k, route) in self.routes.iter().enumerate() {
            out.push_str(&format!("Vehicle {}:\n", k + 1));
            let stops: Vec<String> = route.iter().map(ToString::to_string).collect();
            out.push_str(&stops.join(", "));
            out.push('\n');
        }
        out
    }
}
