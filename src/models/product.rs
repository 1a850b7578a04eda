//! Product-mix profit maximisation under capital and floor-space limits.

use good_lp::{Variable, constraint, variable};
use serde::{Deserialize, Serialize};

use super::{Problem, display_value};
use crate::config::SolverConfig;
use crate::error::ModelError;
use crate::ilp::{Formulation, Sense, SolveStats, add_vector, weighted_sum};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductMix {
    /// Capital consumed per unit of each product.
    pub cost: Vec<f64>,
    /// Floor space consumed per unit of each product.
    pub area: Vec<f64>,
    /// Profit per unit of each product.
    pub profit: Vec<f64>,
    /// Minimum quantity of each product.
    pub minimum: Vec<f64>,
    pub total_area: f64,
    pub capital: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSolution {
    pub profit: f64,
    pub quantities: Vec<f64>,
    pub capital_used: f64,
    pub area_used: f64,
    pub stats: SolveStats,
}

impl ProductMix {
    /// Ten products sharing 1000 units of capital and 100 units of space.
    pub fn demo() -> Self {
        Self {
            cost: vec![20.0, 30.0, 15.0, 25.0, 10.0, 50.0, 40.0, 45.0, 35.0, 60.0],
            area: vec![3.0, 2.0, 4.0, 1.0, 5.0, 2.0, 3.0, 4.0, 5.0, 2.0],
            profit: vec![40.0, 35.0, 50.0, 45.0, 60.0, 55.0, 65.0, 70.0, 75.0, 80.0],
            minimum: vec![2.0, 1.0, 3.0, 2.0, 1.0, 4.0, 3.0, 2.0, 1.0, 5.0],
            total_area: 100.0,
            capital: 1000.0,
        }
    }

    pub fn products(&self) -> usize {
        self.cost.len()
    }

    fn dot(weights: &[f64], quantities: &[f64]) -> f64 {
        weights.iter().zip(quantities).map(|(w, q)| w * q).sum()
    }
}

impl Problem for ProductMix {
    type Solution = ProductSolution;

    fn name(&self) -> &'static str {
        "product"
    }

    fn validate(&self) -> Result<(), ModelError> {
        let n = self.products();
        if n == 0 {
            return Err(ModelError::invalid("product mix needs at least one product"));
        }
        for (label, column) in [
            ("area", &self.area),
            ("profit", &self.profit),
            ("minimum", &self.minimum),
        ] {
            if column.len() != n {
                return Err(ModelError::invalid(format!(
                    "{} has {} entries for {} products",
                    label,
                    column.len(),
                    n
                )));
            }
        }
        let values = self
            .cost
            .iter()
            .chain(&self.area)
            .chain(&self.profit)
            .chain(&self.minimum)
            .chain([&self.total_area, &self.capital]);
        if values.into_iter().any(|v| !v.is_finite()) {
            return Err(ModelError::invalid("product data contains a non-finite value"));
        }
        if self.minimum.iter().any(|m| *m < 0.0) {
            return Err(ModelError::invalid("minimum quantities must be non-negative"));
        }
        Ok(())
    }

    fn solve(&self, config: &SolverConfig) -> Result<ProductSolution, ModelError> {
        self.validate()?;
        let n = self.products();
        let mut model = Formulation::new(self.name(), Sense::Maximise);

        let integer = config.integer_quantities;
        let x: Vec<Variable> = add_vector(&mut model, n, |_| {
            let definition = variable().min(0);
            if integer { definition.integer() } else { definition }
        });

        // Limited capital
        let spent = weighted_sum(x.iter().copied().zip(self.cost.iter().copied()));
        model.constrain(constraint!(spent <= self.capital));

        // Limited space
        let occupied = weighted_sum(x.iter().copied().zip(self.area.iter().copied()));
        model.constrain(constraint!(occupied <= self.total_area));

        // Produce at least the minimum of each product
        for (&quantity, &minimum) in x.iter().zip(&self.minimum) {
            model.constrain(constraint!(quantity >= minimum));
        }

        model.set_objective(weighted_sum(x.iter().copied().zip(self.profit.iter().copied())));

        let solved = model.solve(config)?;
        let quantities: Vec<f64> = x.iter().map(|&v| solved.value(v)).collect();

        Ok(ProductSolution {
            profit: solved.objective,
            capital_used: Self::dot(&self.cost, &quantities),
            area_used: Self::dot(&self.area, &quantities),
            quantities,
            stats: solved.stats,
        })
    }

    fn check(&self, solution: &ProductSolution) -> Vec<String> {
        const EPS: f64 = 1e-6;
        let mut violations = Vec::new();

        if solution.quantities.len() != self.products() {
            violations.push(format!(
                "{} quantities for {} products",
                solution.quantities.len(),
                self.products()
            ));
            return violations;
        }

        let capital = Self::dot(&self.cost, &solution.quantities);
        if capital > self.capital + EPS * self.capital.abs().max(1.0) {
            violations.push(format!("capital {} exceeds {}", capital, self.capital));
        }
        let area = Self::dot(&self.area, &solution.quantities);
        if area > self.total_area + EPS * self.total_area.abs().max(1.0) {
            violations.push(format!("area {} exceeds {}", area, self.total_area));
        }
        for (i, (&q, &m)) in solution.quantities.iter().zip(&self.minimum).enumerate() {
            if q + EPS < m {
                violations.push(format!("product {} quantity {} below minimum {}", i + 1, q, m));
            }
        }

        violations
    }
}

impl super::Rendered for ProductSolution {
    fn objective(&self) -> f64 {
        self.profit
    }

    fn stats(&self) -> &SolveStats {
        &self.stats
    }

    fn render(&self) -> String {
        let mut out = format!("profit: {}\n", display_value(self.profit));
        for (i, q) in self.quantities.iter().enumerate() {
            out.push_str(&format!("Product {}: {}\n", i + 1, display_value(*q)));
        }
        out.push_str(&format!(
            "capital used: {}\narea used: {}\n",
            display_value(self.capital_used),
            display_value(self.area_used)
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rendered;

    #[test]
    fn demo_lp_optimum() {
        let problem = ProductMix::demo();
        problem.validate().unwrap();
        let solution = problem.solve(&SolverConfig::default()).unwrap();

        // Minimums earn 1445 and leave 80 capital / 33 area; the best use of
        // the remainder mixes products 5 and 4 until both limits bind.
        let extra5 = 745.0 / 115.0;
        let extra4 = 33.0 - 5.0 * extra5;
        let expected = 1445.0 + 60.0 * extra5 + 45.0 * extra4;

        assert!((solution.profit - expected).abs() < 1e-4, "profit {}", solution.profit);
        assert!((solution.quantities[4] - (1.0 + extra5)).abs() < 1e-4);
        assert!((solution.quantities[3] - (2.0 + extra4)).abs() < 1e-4);
        assert!((solution.capital_used - 1000.0).abs() < 1e-4);
        assert!((solution.area_used - 100.0).abs() < 1e-4);
        assert!(problem.check(&solution).is_empty());
    }

    #[test]
    fn integer_quantities_are_whole() {
        let problem = ProductMix::demo();
        let config = SolverConfig::default().with_integer_quantities(true);
        let solution = problem.solve(&config).unwrap();

        assert!(solution.quantities.iter().all(|q| (q - q.round()).abs() < 1e-6));
        assert!(solution.profit <= 1861.1);
        assert!(solution.profit >= 1445.0);
        assert!(problem.check(&solution).is_empty());
    }

    #[test]
    fn minimums_over_budget_are_infeasible() {
        let problem = ProductMix {
            capital: 500.0,
            ..ProductMix::demo()
        };
        let err = problem.solve(&SolverConfig::default()).unwrap_err();
        assert!(err.code().starts_with("SOLVER_"), "unexpected error {err}");
    }

    #[test]
    fn validate_rejects_column_mismatch() {
        let mut problem = ProductMix::demo();
        problem.profit.pop();
        assert_eq!(problem.validate().unwrap_err().code(), "INSTANCE_INVALID");
        let err = problem.solve(&SolverConfig::default()).unwrap_err();
        assert_eq!(err.code(), "INSTANCE_INVALID");
    }

    #[test]
    fn render_is_one_based() {
        let solution = ProductSolution {
            profit: 100.0,
            quantities: vec![2.0, 0.5],
            capital_used: 10.0,
            area_used: 3.0,
            stats: SolveStats::default(),
        };
        assert_eq!(
            solution.render(),
            "profit: 100\nProduct 1: 2\nProduct 2: 0.5\ncapital used: 10\narea used: 3\n"
        );
    }
}
