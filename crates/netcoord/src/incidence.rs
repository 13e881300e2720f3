//! Symmetric node-adjacency indicator used to mask neighbor terms in the solver.

use crate::error::{Error, Result};
use crate::neighborhood::Neighborhoods;
use nalgebra::DMatrix;
use netcoord_topology::{ElementId, Topology};
use rustc_hash::FxHashMap;

/// Dense global ordering of nodes; row/column index of the incidence matrix.
#[derive(Debug, Clone, Default)]
pub struct GlobalIndex {
    order: Vec<ElementId>,
    index: FxHashMap<ElementId, usize>,
}

impl GlobalIndex {
    pub fn new(order: impl IntoIterator<Item = ElementId>) -> Self {
        let mut out = Self::default();
        for id in order {
            if !out.index.contains_key(&id) {
                out.index.insert(id, out.order.len());
                out.order.push(id);
            }
        }
        out
    }

    /// Indexes [`Topology::all_nodes`].
    pub fn from_topology<T: Topology + ?Sized>(topology: &T) -> Self {
        Self::new(topology.all_nodes())
    }

    pub fn get(&self, id: ElementId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn id(&self, idx: usize) -> Option<ElementId> {
        self.order.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceMatrix {
    matrix: DMatrix<f64>,
}

impl IncidenceMatrix {
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn is_symmetric(&self) -> bool {
        self.matrix == self.matrix.transpose()
    }

    /// Number of distinct unordered pairs that are set (self pairs count once).
    pub fn pair_count(&self) -> usize {
        let n = self.len();
        (0..n)
            .flat_map(|i| (i..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.matrix[(i, j)] != 0.0)
            .count()
    }
}

/// Sets `C[i][j]` and `C[j][i]` for every node and each of its neighbors.
pub fn build_incidence(
    index: &GlobalIndex,
    neighborhoods: &Neighborhoods,
    nodes: &[ElementId],
) -> Result<IncidenceMatrix> {
    let n = index.len();
    let mut matrix = DMatrix::<f64>::zeros(n, n);
    for &node in nodes {
        let i = index.get(node).ok_or(Error::UnknownNode(node))?;
        for &peer in neighborhoods.get(node) {
            let j = index.get(peer).ok_or(Error::UnknownNode(peer))?;
            matrix[(i, j)] = 1.0;
            matrix[(j, i)] = 1.0;
        }
    }
    Ok(IncidenceMatrix { matrix })
}
