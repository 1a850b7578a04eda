//! Multi-processor task scheduling with communication delays.
//!
//! Tasks are assigned to processors and given start/finish times within a
//! deadline. A precedence edge `i -> j` makes `j` wait for `i`, plus the edge's
//! transfer time when the two tasks run on different processors. Two tasks on
//! the same processor never overlap. The objective is the total execution cost
//! `Σ cost[n] * W[n][i]` of the chosen assignment.

use std::collections::HashMap;

use good_lp::{Expression, Variable, constraint, variable};
use itertools::{Itertools, iproduct};
use serde::{Deserialize, Serialize};

use super::{Problem, display_value};
use crate::config::SolverConfig;
use crate::error::ModelError;
use crate::graph::{PrecedenceEdge, PrecedenceGraph};
use crate::ilp::{Formulation, Sense, SolveStats, add_matrix, add_vector, weighted_sum};

const EPS: f64 = 1e-5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskScheduling {
    pub tasks: usize,
    pub processors: usize,
    pub edges: Vec<PrecedenceEdge>,
    /// `exec_times[n][i]`: time processor `n` needs for task `i`.
    pub exec_times: Vec<Vec<f64>>,
    pub deadline: f64,
    /// Cost per time unit of each processor.
    pub cost_rates: Vec<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task: usize,
    pub processor: usize,
    pub start: f64,
    pub finish: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSolution {
    pub execution_cost: f64,
    /// Processor count of the instance, idle ones included.
    pub processors: usize,
    /// One entry per task, indexed by task.
    pub assignments: Vec<ScheduledTask>,
    pub stats: SolveStats,
}

impl TaskScheduling {
    /// Eight tasks on three processors with an 18 time unit deadline.
    pub fn demo() -> Self {
        let edge = |from, to, weight| PrecedenceEdge { from, to, weight };
        Self {
            tasks: 8,
            processors: 3,
            edges: vec![
                edge(0, 1, 2.0),
                edge(0, 2, 3.0),
                edge(0, 5, 3.0),
                edge(1, 3, 1.0),
                edge(1, 4, 4.0),
                edge(1, 6, 5.0),
                edge(2, 4, 3.0),
                edge(2, 6, 7.0),
                edge(3, 5, 2.0),
                edge(3, 7, 5.0),
                edge(4, 5, 1.0),
                edge(4, 6, 3.0),
            ],
            exec_times: vec![
                vec![4.0, 1.0, 3.0, 2.0, 4.0, 3.0, 5.0, 5.0],
                vec![3.0, 1.0, 3.0, 3.0, 2.0, 1.0, 2.0, 6.0],
                vec![3.0, 4.0, 2.0, 2.0, 3.0, 3.0, 7.0, 6.0],
            ],
            deadline: 18.0,
            cost_rates: vec![6.0, 8.0, 5.0],
        }
    }

    pub fn graph(&self) -> Result<PrecedenceGraph, ModelError> {
        PrecedenceGraph::new(self.tasks, &self.edges)
    }

    /// Big-M large enough to switch off any gated row: start and finish
    /// times live in `[0, deadline]`.
    fn big_m(&self, graph: &PrecedenceGraph, config: &SolverConfig) -> f64 {
        config
            .big_m
            .unwrap_or_else(|| self.deadline + graph.max_weight() + 1.0)
    }

    /// Tasks of `processor` ordered by start time.
    pub fn processor_tasks<'a>(
        solution: &'a ScheduleSolution,
        processor: usize,
    ) -> Vec<&'a ScheduledTask> {
        solution
            .assignments
            .iter()
            .filter(|a| a.processor == processor)
            .sorted_by(|a, b| a.start.total_cmp(&b.start).then(a.task.cmp(&b.task)))
            .collect()
    }
}

impl Problem for TaskScheduling {
    type Solution = ScheduleSolution;

    fn name(&self) -> &'static str {
        "schedule"
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.tasks == 0 || self.processors == 0 {
            return Err(ModelError::invalid(
                "scheduling needs at least one task and one processor",
            ));
        }
        if self.exec_times.len() != self.processors || self.cost_rates.len() != self.processors {
            return Err(ModelError::invalid(format!(
                "{} processors but {} execution time rows and {} cost rates",
                self.processors,
                self.exec_times.len(),
                self.cost_rates.len()
            )));
        }
        if let Some((n, row)) = self
            .exec_times
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.tasks)
        {
            return Err(ModelError::invalid(format!(
                "processor {} has {} execution times for {} tasks",
                n + 1,
                row.len(),
                self.tasks
            )));
        }
        let invalid = |v: &f64| !v.is_finite() || *v < 0.0;
        if self.exec_times.iter().flatten().any(invalid)
            || self.cost_rates.iter().any(invalid)
            || invalid(&self.deadline)
        {
            return Err(ModelError::invalid(
                "execution times, cost rates and deadline must be non-negative",
            ));
        }
        self.graph().map(|_| ())
    }

    fn solve(&self, config: &SolverConfig) -> Result<ScheduleSolution, ModelError> {
        self.validate()?;
        let graph = self.graph()?;
        let m = self.tasks;
        let n_count = self.processors;
        let big_m = self.big_m(&graph, config);
        let w = &self.exec_times;

        let mut model = Formulation::new(self.name(), Sense::Minimise);

        // x[i][n] = 1: processor n runs task i
        let x = add_matrix(&mut model, m, n_count, |_, _| variable().binary());
        let st = add_vector(&mut model, m, |_| variable().min(0).max(self.deadline));
        let ft = add_vector(&mut model, m, |_| variable().min(0).max(self.deadline));

        // same[(i, j)] = 1: tasks i < j share a processor
        // order[(i, j)] selects which of the pair runs first when they do
        let mut same: HashMap<(usize, usize), Variable> = HashMap::new();
        let mut order: HashMap<(usize, usize), Variable> = HashMap::new();
        for (i, j) in (0..m).tuple_combinations() {
            same.insert((i, j), model.add(variable().binary()));
            order.insert((i, j), model.add(variable().binary()));
        }
        let same_of = |a: usize, b: usize| same[&(a.min(b), a.max(b))];

        // Each task runs exactly once
        for row in &x {
            let assigned: Expression = row.iter().copied().sum();
            model.constrain(constraint!(assigned == 1));
        }

        for ((i, j), n) in (0..m).tuple_combinations().cartesian_product(0..n_count) {
            let s = same_of(i, j);
            model.constrain(constraint!(s - x[i][n] - x[j][n] >= -1));
            model.constrain(constraint!(s + x[i][n] - x[j][n] <= 1));
            model.constrain(constraint!(s + x[j][n] - x[i][n] <= 1));
        }

        // Task duration on the chosen processor
        for (i, n) in iproduct!(0..m, 0..n_count) {
            model.constrain(constraint!(ft[i] - st[i] - w[n][i] * x[i][n] >= 0));
        }

        for edge in graph.edges() {
            let (i, j) = (edge.from, edge.to);
            let s = same_of(i, j);
            // Same processor: j starts after i finishes
            model.constrain(constraint!(st[j] - ft[i] - big_m * s >= -big_m));
            // Different processors: transfer time comes first
            model.constrain(constraint!(st[j] - ft[i] + big_m * s >= edge.weight));
        }

        // No overlap on a shared processor
        for (i, j) in (0..m).tuple_combinations() {
            let s = same_of(i, j);
            let b = order[&(i, j)];
            model.constrain(constraint!(st[j] - ft[i] + big_m * b - big_m * s >= -big_m));
            model.constrain(constraint!(st[i] - ft[j] - big_m * b - big_m * s >= -2.0 * big_m));
        }

        model.set_objective(weighted_sum(
            iproduct!(0..m, 0..n_count).map(|(i, n)| (x[i][n], self.cost_rates[n] * w[n][i])),
        ));

        let solved = model.solve(config)?;

        let assignments = (0..m)
            .map(|i| {
                let processor = (0..n_count)
                    .find(|&n| solved.is_set(x[i][n]))
                    .ok_or_else(|| ModelError::Readout(format!("task {} is unassigned", i + 1)))?;
                Ok(ScheduledTask {
                    task: i,
                    processor,
                    start: solved.value(st[i]),
                    finish: solved.value(ft[i]),
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()
            .map_err(|err| solved.readout_error(err))?;

        Ok(ScheduleSolution {
            execution_cost: solved.objective,
            processors: n_count,
            assignments,
            stats: solved.stats,
        })
    }

    fn check(&self, solution: &ScheduleSolution) -> Vec<String> {
        let mut violations = Vec::new();
        let tasks = &solution.assignments;

        if tasks.len() != self.tasks {
            violations.push(format!("{} assignments for {} tasks", tasks.len(), self.tasks));
            return violations;
        }

        for a in tasks {
            let Some(duration) = self.exec_times.get(a.processor).and_then(|row| row.get(a.task))
            else {
                violations.push(format!(
                    "task {} on unknown processor {}",
                    a.task + 1,
                    a.processor + 1
                ));
                continue;
            };
            if a.start < -EPS || a.finish > self.deadline + EPS {
                violations.push(format!("task {} runs outside [0, {}]", a.task + 1, self.deadline));
            }
            if a.finish - a.start + EPS < *duration {
                violations.push(format!(
                    "task {} runs {} but needs {}",
                    a.task + 1,
                    a.finish - a.start,
                    duration
                ));
            }
        }

        for edge in &self.edges {
            let (Some(from), Some(to)) = (tasks.get(edge.from), tasks.get(edge.to)) else {
                continue;
            };
            let delay = if from.processor == to.processor { 0.0 } else { edge.weight };
            if to.start + EPS < from.finish + delay {
                violations.push(format!(
                    "task {} starts at {} before task {} result arrives at {}",
                    to.task + 1,
                    to.start,
                    from.task + 1,
                    from.finish + delay
                ));
            }
        }

        for (a, b) in tasks.iter().tuple_combinations() {
            if a.processor == b.processor && a.start + EPS < b.finish && b.start + EPS < a.finish {
                violations.push(format!(
                    "tasks {} and {} overlap on processor {}",
                    a.task + 1,
                    b.task + 1,
                    a.processor + 1
                ));
            }
        }

        violations
    }
}

impl super::Rendered for ScheduleSolution {
    fn objective(&self) -> f64 {
        self.execution_cost
    }

    fn stats(&self) -> &SolveStats {
        &self.stats
    }

    fn render(&self) -> String {
        let mut out = format!("Execution cost: {}\n", display_value(self.execution_cost));
        for processor in 0..self.processors {
            out.push_str(&format!("processor {}:\n", processor + 1));
            for a in TaskScheduling::processor_tasks(self, processor) {
                out.push_str(&format!(
                    "task {}: {} -> {}\n",
                    a.task + 1,
                    display_value(a.start),
                    display_value(a.finish)
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rendered;

    fn two_tasks(
        edges: Vec<PrecedenceEdge>,
        exec_times: Vec<Vec<f64>>,
        deadline: f64,
    ) -> TaskScheduling {
        TaskScheduling {
            tasks: 2,
            processors: exec_times.len(),
            cost_rates: vec![1.0; exec_times.len()],
            edges,
            exec_times,
            deadline,
        }
    }

    fn solve_checked(problem: &TaskScheduling) -> ScheduleSolution {
        problem.validate().unwrap();
        let solution = problem.solve(&SolverConfig::default()).unwrap();
        assert_eq!(problem.check(&solution), Vec::<String>::new());
        solution
    }

    #[test]
    fn chain_on_one_processor() {
        let problem = two_tasks(
            vec![PrecedenceEdge { from: 0, to: 1, weight: 5.0 }],
            vec![vec![2.0, 3.0]],
            10.0,
        );
        let solution = solve_checked(&problem);
        assert!((solution.execution_cost - 5.0).abs() < 1e-6);
        assert!(solution.assignments[1].start >= solution.assignments[0].finish - 1e-6);
    }

    #[test]
    fn independent_tasks_share_cheap_processor_when_time_allows() {
        let problem = two_tasks(vec![], vec![vec![2.0, 2.0], vec![3.0, 3.0]], 10.0);
        let solution = solve_checked(&problem);
        assert!((solution.execution_cost - 4.0).abs() < 1e-6);
        assert!(solution.assignments.iter().all(|a| a.processor == 0));
    }

    #[test]
    fn tight_deadline_splits_independent_tasks() {
        // Both on processor 1 would need 4 time units.
        let problem = two_tasks(vec![], vec![vec![2.0, 2.0], vec![3.0, 3.0]], 3.0);
        let solution = solve_checked(&problem);
        assert!((solution.execution_cost - 5.0).abs() < 1e-6);
        assert_ne!(solution.assignments[0].processor, solution.assignments[1].processor);
    }

    #[test]
    fn transfer_time_keeps_chain_together() {
        let edges = vec![PrecedenceEdge { from: 0, to: 1, weight: 10.0 }];
        let exec_times = vec![vec![1.0, 3.0], vec![3.0, 1.0]];

        let relaxed = solve_checked(&two_tasks(edges.clone(), exec_times.clone(), 20.0));
        assert!((relaxed.execution_cost - 2.0).abs() < 1e-6);

        let tight = solve_checked(&two_tasks(edges, exec_times, 5.0));
        assert!((tight.execution_cost - 4.0).abs() < 1e-6);
        assert_eq!(tight.assignments[0].processor, tight.assignments[1].processor);
    }

    #[test]
    fn demo_graph_with_loose_deadline_reaches_cheapest_assignment() {
        let problem = TaskScheduling {
            deadline: 40.0,
            ..TaskScheduling::demo()
        };
        let solution = solve_checked(&problem);
        // Cheapest processor per task: 15 + 6 + 10 + 10 + 15 + 8 + 16 + 30
        assert!((solution.execution_cost - 110.0).abs() < 1e-6);
    }

    #[test]
    fn demo_moves_task_five_to_fit_deadline() {
        let problem = TaskScheduling::demo();
        let solution = solve_checked(&problem);

        // The 110 assignment needs 19 time units: task 8 either overlaps task 5
        // on processor 3 or waits 5 units for task 4's result on processor 1.
        // Moving task 5 to processor 2 (+1) frees processor 3 for task 8.
        assert!((solution.execution_cost - 111.0).abs() < 1e-6);
        let processors: Vec<usize> = solution.assignments.iter().map(|a| a.processor).collect();
        assert_eq!(processors, vec![2, 0, 2, 2, 1, 1, 1, 2]);
        assert_eq!(solution.processors, 3);
    }

    #[test]
    fn validate_rejects_cycle() {
        let mut problem = TaskScheduling::demo();
        problem.edges.push(PrecedenceEdge { from: 6, to: 0, weight: 1.0 });
        assert_eq!(problem.validate().unwrap_err().code(), "INSTANCE_CYCLIC");
    }

    #[test]
    fn validate_rejects_short_exec_row() {
        let mut problem = TaskScheduling::demo();
        problem.exec_times[2].pop();
        assert_eq!(problem.validate().unwrap_err().code(), "INSTANCE_INVALID");
        let err = problem.solve(&SolverConfig::default()).unwrap_err();
        assert_eq!(err.code(), "INSTANCE_INVALID");
    }

    #[test]
    fn check_flags_overlap() {
        let problem = two_tasks(vec![], vec![vec![2.0, 2.0]], 10.0);
        let solution = ScheduleSolution {
            execution_cost: 4.0,
            processors: 1,
            assignments: vec![
                ScheduledTask { task: 0, processor: 0, start: 0.0, finish: 2.0 },
                ScheduledTask { task: 1, processor: 0, start: 1.0, finish: 3.0 },
            ],
            stats: SolveStats::default(),
        };
        let violations = problem.check(&solution);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("overlap"));
    }

    #[test]
    fn render_sorts_by_start() {
        let solution = ScheduleSolution {
            execution_cost: 7.0,
            processors: 2,
            assignments: vec![
                ScheduledTask { task: 0, processor: 0, start: 4.0, finish: 6.0 },
                ScheduledTask { task: 1, processor: 0, start: 0.0, finish: 2.0 },
                ScheduledTask { task: 2, processor: 1, start: 1.5, finish: 3.0 },
            ],
            stats: SolveStats::default(),
        };
        assert_eq!(
            solution.render(),
            "Execution cost: 7\nprocessor 1:\ntask 2: 0 -> 2\ntask 1: 4 -> 6\n\
             processor 2:\ntask 3: 1.5 -> 3\n"
        );
    }

    #[test]
    fn render_lists_idle_processors() {
        let problem = two_tasks(vec![], vec![vec![2.0, 2.0], vec![3.0, 3.0]], 10.0);
        let solution = solve_checked(&problem);
        assert!(solution.assignments.iter().all(|a| a.processor == 0));

        let text = solution.render();
        assert!(text.starts_with("Execution cost: 4\nprocessor 1:\n"));
        assert!(text.ends_with("processor 2:\n"), "{text}");
    }
}
