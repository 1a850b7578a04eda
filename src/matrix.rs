//! Distance matrices for the routing models.
//!
//! Instances store distances as nested vectors; models work on a
//! [`DistanceMatrix`] that has already been extended with a closing depot.

use nalgebra::DMatrix;

use crate::error::ModelError;

/// A square distance matrix whose last row/column duplicates the depot.
///
/// With `n` original nodes (depot `0` plus `n - 1` points) the matrix is
/// `(n + 1) x (n + 1)`. Node `n` is the closing depot: routes leave node `0`
/// and arrive at node `n`.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix {
    inner: DMatrix<f64>,
}

impl DistanceMatrix {
    /// Validates `rows` as a square matrix of finite, non-negative entries
    /// and appends the depot copy.
    pub fn with_depot(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let n = rows.len();
        if n == 0 {
            return Err(ModelError::invalid("distance matrix is empty"));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ModelError::invalid(format!(
                    "distance matrix row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(value) = row.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(ModelError::invalid(format!(
                    "distance matrix row {i} contains invalid distance {value}"
                )));
            }
        }

        let depot = n;
        let inner = DMatrix::from_fn(n + 1, n + 1, |i, j| {
            let i = if i == depot { 0 } else { i };
            let j = if j == depot { 0 } else { j };
            if i == 0 && j == 0 { 0.0 } else { rows[i][j] }
        });

        Ok(Self { inner })
    }

    /// Number of nodes including the closing depot.
    pub fn size(&self) -> usize {
        self.inner.nrows()
    }

    /// Index of the closing depot.
    pub fn closing_depot(&self) -> usize {
        self.inner.nrows() - 1
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.inner[(from, to)]
    }

    /// Total length of a node sequence.
    pub fn path_length(&self, path: &[usize]) -> f64 {
        path.windows(2).map(|w| self.get(w[0], w[1])).sum()
    }
}

/// Follows set arcs from `start` until `end`, returning the visited nodes.
///
/// `next` answers whether the arc `(from, to)` is used. The walk is bounded
/// by the node count so a malformed arc set cannot loop forever.
pub fn trace_route<F>(
    size: usize,
    start: usize,
    end: usize,
    next: F,
) -> Result<Vec<usize>, ModelError>
where
    F: Fn(usize, usize) -> bool,
{
    let mut route = vec![start];
    let mut current = start;

    while current != end {
        if route.len() > size {
            return Err(ModelError::Readout(format!(
                "route from {start} does not reach {end} within {size} steps"
            )));
        }
        current = (0..size)
            .find(|&to| to != current && next(current, to))
            .ok_or_else(|| ModelError::Readout(format!("no outgoing arc from node {current}")))?;
        route.push(current);
    }

    Ok(route)
}
