//! Task precedence graph with a communication weight on every edge.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::graph::{Graph, VertexId};

/// `to` may only start once `from` has finished; if the two tasks run on
/// different processors, `weight` time units of data transfer come first.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrecedenceEdge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: f64,
}

/// A validated, acyclic precedence graph over `tasks` tasks.
#[derive(Clone, Debug, PartialEq)]
pub struct PrecedenceGraph {
    graph: Graph,
    edges: Vec<PrecedenceEdge>,
}

impl PrecedenceGraph {
    /// Builds the graph, rejecting out-of-range endpoints, self-loops,
    /// negative or non-finite weights, and cycles.
    pub fn new(tasks: usize, edges: &[PrecedenceEdge]) -> Result<Self, ModelError> {
        let mut graph = Graph::with_vertices(tasks);

        for edge in edges {
            if edge.from == edge.to {
                return Err(ModelError::invalid(format!(
                    "task {} cannot precede itself",
                    edge.from + 1
                )));
            }
            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(ModelError::invalid(format!(
                    "edge {} -> {} has invalid weight {}",
                    edge.from + 1,
                    edge.to + 1,
                    edge.weight
                )));
            }
            if !graph.add_edge(edge.from, edge.to) {
                return Err(ModelError::invalid(format!(
                    "edge {} -> {} references a task outside 1..={}",
                    edge.from + 1,
                    edge.to + 1,
                    tasks
                )));
            }
        }

        graph
            .topological_order()
            .map_err(ModelError::CyclicPrecedence)?;

        Ok(Self {
            graph,
            edges: edges.to_vec(),
        })
    }

    pub fn tasks(&self) -> usize {
        self.graph.num_vertices()
    }

    pub fn edges(&self) -> &[PrecedenceEdge] {
        &self.edges
    }

    pub fn max_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).fold(0.0, f64::max)
    }

    /// DOT rendering with 1-based task labels and weights on the edges.
    pub fn dot(&self) -> String {
        let mut dot = String::from("digraph tasks {\n");
        for task in 0..self.tasks() {
            dot.push_str(&format!("    {};\n", task + 1));
        }
        for edge in &self.edges {
            dot.push_str(&format!(
                "    {} -> {} [label=\"{}\"];\n",
                edge.from + 1,
                edge.to + 1,
                edge.weight
            ));
        }
        dot.push('}');
        dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: VertexId, to: VertexId, weight: f64) -> PrecedenceEdge {
        PrecedenceEdge { from, to, weight }
    }

    #[test]
    fn accepts_dag() {
        let graph =
            PrecedenceGraph::new(4, &[edge(0, 1, 2.0), edge(0, 2, 3.0), edge(1, 3, 1.0)]).unwrap();
        assert_eq!(graph.tasks(), 4);
        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.max_weight(), 3.0);
    }

    #[test]
    fn rejects_cycle() {
        let err = PrecedenceGraph::new(3, &[edge(0, 1, 1.0), edge(1, 2, 1.0), edge(2, 0, 1.0)])
            .unwrap_err();
        assert_eq!(err.code(), "INSTANCE_CYCLIC");
    }

    #[test]
    fn rejects_unknown_task() {
        let err = PrecedenceGraph::new(2, &[edge(0, 4, 1.0)]).unwrap_err();
        assert_eq!(err.code(), "INSTANCE_INVALID");
    }

    #[test]
    fn rejects_self_loop_and_bad_weight() {
        assert!(PrecedenceGraph::new(2, &[edge(1, 1, 1.0)]).is_err());
        assert!(PrecedenceGraph::new(2, &[edge(0, 1, -2.0)]).is_err());
    }

    #[test]
    fn dot_is_one_based() {
        let graph = PrecedenceGraph::new(2, &[edge(0, 1, 2.0)]).unwrap();
        assert!(graph.dot().contains("1 -> 2 [label=\"2\"];"));
    }
}
