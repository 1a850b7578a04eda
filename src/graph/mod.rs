//! A module for representing directed graphs.

pub type VertexId = usize;

/// A simple sparse directed graph using an adjacency list.
#[derive(Clone, PartialEq, Debug)]
pub struct Graph {
    adjacency: Vec<Vec<VertexId>>,
    rev_adjacency: Vec<Vec<VertexId>>,
}

impl Graph {
    /// Creates a graph with `vertices` isolated vertices.
    pub fn with_vertices(vertices: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); vertices],
            rev_adjacency: vec![Vec::new(); vertices],
        }
    }

    /// Adds a directed edge from `from` to `to`.
    ///
    /// Returns `false` and leaves the graph untouched if either end is out of
    /// bounds.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId) -> bool {
        if from < self.adjacency.len() && to < self.adjacency.len() {
            self.adjacency[from].push(to);
            self.rev_adjacency[to].push(from);
            true
        } else {
            false
        }
    }

    /// Returns the number of vertices in the graph.
    pub fn num_vertices(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns a slice of out-neighbors for a given vertex.
    pub fn out_neighbors(&self, vertex: VertexId) -> &[VertexId] {
        self.adjacency.get(vertex).map_or(&[], |v| v.as_slice())
    }

    /// Kahn's algorithm. On a cycle, returns `Err` with a vertex that lies on
    /// or behind it.
    pub fn topological_order(&self) -> Result<Vec<VertexId>, VertexId> {
        let mut in_degree: Vec<usize> = self.rev_adjacency.iter().map(Vec::len).collect();
        let mut ready: Vec<VertexId> = (0..self.num_vertices())
            .filter(|&v| in_degree[v] == 0)
            .rev()
            .collect();
        let mut order = Vec::with_capacity(self.num_vertices());

        while let Some(vertex) = ready.pop() {
            order.push(vertex);
            for &next in self.out_neighbors(vertex) {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if order.len() == self.num_vertices() {
            Ok(order)
        } else {
            Err((0..self.num_vertices())
                .find(|&v| in_degree[v] > 0)
                .unwrap_or_default())
        }
    }
}

pub mod precedence;

pub use self::precedence::{PrecedenceEdge, PrecedenceGraph};
