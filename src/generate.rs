//! Random instance generation.
//!
//! Generated instances are always feasible: routing demands never exceed what
//! the points offer, product minimums fit the budget, and the scheduling
//! deadline leaves room to run every task on a single processor.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::graph::PrecedenceEdge;
use crate::models::{
    FleetRouting, Instance, ProblemKind, ProductMix, StaffRouting, TaskScheduling,
};

/// Sizes of a generated instance.
#[derive(Clone, Copy, Debug)]
pub struct GenerationConfig {
    /// Points, products or tasks.
    pub size: usize,
    /// Vehicles, goods types or processors. Ignored for product mix.
    pub secondary: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            size: 5,
            secondary: 2,
        }
    }
}

pub fn generate_instance(
    kind: ProblemKind,
    config: &GenerationConfig,
    rng: &mut impl Rng,
) -> Instance {
    let size = config.size.max(1);
    let secondary = config.secondary.max(1);
    match kind {
        ProblemKind::Fleet => Instance::Fleet(generate_fleet(size, secondary.min(size), rng)),
        ProblemKind::Staff => Instance::Staff(generate_staff(size, secondary, rng)),
        ProblemKind::Product => Instance::Product(generate_product(size, rng)),
        ProblemKind::Schedule => Instance::Schedule(generate_schedule(size, secondary, rng)),
    }
}

/// Euclidean distances between the depot and `points` random locations on a
/// 100 x 100 grid, rounded to whole units.
fn random_distances(points: usize, rng: &mut impl Rng) -> Vec<Vec<f64>> {
    let coords: Vec<(f64, f64)> = (0..=points)
        .map(|_| (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
        .collect();
    coords
        .iter()
        .map(|&(ax, ay)| {
            coords
                .iter()
                .map(|&(bx, by)| ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt().round())
                .collect()
        })
        .collect()
}

pub fn generate_fleet(points: usize, vehicles: usize, rng: &mut impl Rng) -> FleetRouting {
    FleetRouting {
        points,
        vehicles,
        distances: random_distances(points, rng),
    }
}

pub fn generate_staff(points: usize, goods: usize, rng: &mut impl Rng) -> StaffRouting {
    let available: Vec<Vec<f64>> = (0..goods)
        .map(|_| {
            std::iter::once(0.0)
                .chain((0..points).map(|_| rng.gen_range(0..=5) as f64))
                .collect()
        })
        .collect();
    let required = available
        .iter()
        .map(|row| (row.iter().sum::<f64>() / 2.0).floor())
        .collect();
    StaffRouting {
        points,
        available,
        required,
        distances: random_distances(points, rng),
    }
}

pub fn generate_product(products: usize, rng: &mut impl Rng) -> ProductMix {
    let cost: Vec<f64> = (0..products).map(|_| rng.gen_range(10..=60) as f64).collect();
    let area: Vec<f64> = (0..products).map(|_| rng.gen_range(1..=5) as f64).collect();
    let profit: Vec<f64> = cost
        .iter()
        .map(|c| (c * rng.gen_range(1.0..2.5)).round())
        .collect();
    let minimum: Vec<f64> = (0..products).map(|_| rng.gen_range(0..=5) as f64).collect();

    let min_capital: f64 = cost.iter().zip(&minimum).map(|(c, m)| c * m).sum();
    let min_area: f64 = area.iter().zip(&minimum).map(|(a, m)| a * m).sum();

    ProductMix {
        capital: (min_capital * rng.gen_range(1.1..1.5)).ceil().max(100.0),
        total_area: (min_area * rng.gen_range(1.1..1.5)).ceil().max(10.0),
        cost,
        area,
        profit,
        minimum,
    }
}

/// Edges only go from lower to higher task index in a random topological
/// relabelling, so the graph is acyclic.
pub fn generate_schedule(tasks: usize, processors: usize, rng: &mut impl Rng) -> TaskScheduling {
    let mut labels: Vec<usize> = (0..tasks).collect();
    labels.shuffle(rng);

    let mut edges = Vec::new();
    for a in 0..tasks {
        for b in (a + 1)..tasks {
            if rng.gen_bool(0.3) {
                edges.push(PrecedenceEdge {
                    from: labels[a],
                    to: labels[b],
                    weight: rng.gen_range(1..=5) as f64,
                });
            }
        }
    }

    let exec_times: Vec<Vec<f64>> = (0..processors)
        .map(|_| (0..tasks).map(|_| rng.gen_range(1..=7) as f64).collect())
        .collect();
    let deadline = exec_times
        .iter()
        .map(|row| row.iter().sum::<f64>())
        .fold(0.0, f64::max);

    TaskScheduling {
        tasks,
        processors,
        edges,
        exec_times,
        deadline,
        cost_rates: (0..processors).map(|_| rng.gen_range(1..=10) as f64).collect(),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn generated_instances_validate() {
        let mut rng = StdRng::seed_from_u64(7);
        for kind in ProblemKind::ALL {
            for size in 1..8 {
                let config = GenerationConfig { size, secondary: 3 };
                let instance = generate_instance(kind, &config, &mut rng);
                assert_eq!(instance.kind(), kind);
                instance.validate().unwrap();
            }
        }
    }

    #[test]
    fn same_seed_same_instance() {
        let config = GenerationConfig::default();
        let a = generate_instance(ProblemKind::Schedule, &config, &mut StdRng::seed_from_u64(1));
        let b = generate_instance(ProblemKind::Schedule, &config, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn fleet_never_has_more_vehicles_than_points() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = GenerationConfig { size: 2, secondary: 5 };
        let Instance::Fleet(fleet) = generate_instance(ProblemKind::Fleet, &config, &mut rng) else {
            panic!("expected a fleet instance");
        };
        assert_eq!(fleet.vehicles, 2);
        assert_eq!(fleet.distances.len(), 3);
    }

    #[test]
    fn staff_demand_is_reachable() {
        let mut rng = StdRng::seed_from_u64(11);
        let staff = generate_staff(6, 3, &mut rng);
        for (row, need) in staff.available.iter().zip(&staff.required) {
            assert!(row.iter().sum::<f64>() >= *need);
            assert_eq!(row[0], 0.0);
        }
    }

    #[test]
    fn small_generated_schedule_solves() {
        use crate::config::SolverConfig;
        use crate::models::Problem;

        let mut rng = StdRng::seed_from_u64(5);
        let problem = generate_schedule(4, 2, &mut rng);
        let solution = problem.solve(&SolverConfig::default()).unwrap();
        assert!(problem.check(&solution).is_empty());
    }
}
