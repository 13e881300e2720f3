//! Accelerated projected-gradient solver for network coordinates.
//!
//! Every non-anchor node is pulled towards positions whose distance to each neighbor, and to
//! every anchor, matches the scaled measured round-trip time. Each iteration:
//!
//! 1. extrapolates `w = x[k-1] + (iter-2)/(iter+1) * (x[k-1] - x[k-2])`,
//! 2. evaluates the neighbor term `g` and the anchor term `h` at `w`,
//! 3. writes `x[k] = w - (g + h) / Lf`.
//!
//! All nodes read the same frozen `w` and write into a separate history slot. There is no
//! convergence test; the loop runs for the configured number of iterations.

mod history;

pub use history::History;

use crate::error::Result;
use crate::geom::{Point, Region, project_onto_ball};
use crate::incidence::{GlobalIndex, build_incidence};
use crate::neighborhood::Neighborhoods;
use crate::rng::XorShift64Star;
use indexmap::IndexMap;
use netcoord_topology::{ElementId, Topology};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Which anchors contribute to a node's anchor term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorScope {
    /// Every anchor constrains every node.
    #[default]
    All,
    /// Only anchors listed in the node's neighborhood.
    Neighborhood,
}

/// When the distance tables are read from the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceRefresh {
    /// Captured once before the first iteration.
    #[default]
    Once,
    /// Re-queried at the start of every iteration; follows a topology whose latencies change.
    PerIteration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Multiplier applied to every round-trip time before it is used as a target distance.
    pub rtt_scale: f64,
    /// `Lf = lipschitz_factor * delta_max + max_anchor_degree`.
    pub lipschitz_factor: f64,
    /// Bounds for random initial positions and for anchors without a known coordinate.
    pub region: Region,
    pub anchor_scope: AnchorScope,
    pub distances: DistanceRefresh,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            rtt_scale: 10.0,
            lipschitz_factor: 2.0,
            region: Region::default(),
            anchor_scope: AnchorScope::default(),
            distances: DistanceRefresh::default(),
        }
    }
}

/// A reference node; without a position one is drawn from the region once per solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub node: ElementId,
    pub position: Option<Point>,
}

impl Anchor {
    pub fn fixed(node: ElementId, x: f64, y: f64) -> Self {
        Self {
            node,
            position: Some(Point::new(x, y)),
        }
    }

    pub fn floating(node: ElementId) -> Self {
        Self {
            node,
            position: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    pub delta_max: usize,
    pub max_anchor_degree: usize,
    /// Step-size denominator.
    pub lipschitz: f64,
    /// Ball projections that hit a zero-length displacement.
    pub degenerate_projections: usize,
}

/// Final coordinates of nodes and anchors.
#[derive(Debug, Clone)]
pub struct Embedding {
    positions: IndexMap<ElementId, Point>,
    rtt_scale: f64,
    stats: SolveStats,
}

impl Embedding {
    pub fn position(&self, id: ElementId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    /// Coordinate distance, in scaled units.
    pub fn distance(&self, a: ElementId, b: ElementId) -> Option<f64> {
        Some((self.position(a)? - self.position(b)?).norm())
    }

    /// Round-trip time predicted from the coordinates, in the topology's units.
    pub fn estimated_rtt(&self, a: ElementId, b: ElementId) -> Option<f64> {
        let d = self.distance(a, b)?;
        if self.rtt_scale == 0.0 {
            return Some(d);
        }
        Some(d / self.rtt_scale)
    }

    pub fn positions(&self) -> &IndexMap<ElementId, Point> {
        &self.positions
    }

    pub fn into_positions(self) -> IndexMap<ElementId, Point> {
        self.positions
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Solves from uniformly random starting positions.
pub fn execute<T: Topology + ?Sized>(
    topology: &T,
    anchors: &[Anchor],
    nodes: &[ElementId],
    neighborhoods: &Neighborhoods,
    opts: &SolverOptions,
    rng: &mut XorShift64Star,
) -> Result<Embedding> {
    solve(topology, anchors, nodes, neighborhoods, opts, None, rng)
}

/// Solves starting from `initial`; nodes missing from it start at a random position.
pub fn execute_warm<T: Topology + ?Sized>(
    topology: &T,
    anchors: &[Anchor],
    nodes: &[ElementId],
    neighborhoods: &Neighborhoods,
    opts: &SolverOptions,
    initial: &IndexMap<ElementId, Point>,
    rng: &mut XorShift64Star,
) -> Result<Embedding> {
    solve(topology, anchors, nodes, neighborhoods, opts, Some(initial), rng)
}

#[derive(Debug, Clone, Copy)]
struct PeerTerm {
    peer: usize,
    node: ElementId,
    mask: f64,
    target: f64,
}

#[derive(Debug, Clone, Copy)]
struct AnchorTerm {
    anchor: usize,
    target: f64,
}

/// Per-node constraint lists with their target distances (`dij` and `rij`).
#[derive(Debug, Clone)]
struct Terms {
    peers: Vec<Vec<PeerTerm>>,
    anchors: Vec<Vec<AnchorTerm>>,
}

impl Terms {
    fn new<T: Topology + ?Sized>(
        topology: &T,
        anchors: &[Anchor],
        nodes: &[ElementId],
        neighborhoods: &Neighborhoods,
        scope: AnchorScope,
    ) -> Result<Self> {
        let local: FxHashMap<ElementId, usize> =
            nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let anchor_slot: FxHashMap<ElementId, usize> = anchors
            .iter()
            .enumerate()
            .map(|(i, a)| (a.node, i))
            .collect();

        let index = GlobalIndex::new(
            topology
                .all_nodes()
                .into_iter()
                .chain(nodes.iter().copied())
                .chain(anchors.iter().map(|a| a.node)),
        );
        let incidence = build_incidence(&index, neighborhoods, nodes)?;

        let mut peers: Vec<Vec<PeerTerm>> = Vec::with_capacity(nodes.len());
        let mut anchor_terms: Vec<Vec<AnchorTerm>> = Vec::with_capacity(nodes.len());
        for (i, &node) in nodes.iter().enumerate() {
            let gi = index.get(node).unwrap_or_default();
            let mut row: Vec<PeerTerm> = Vec::new();
            for &peer in neighborhoods.get(node) {
                let Some(&j) = local.get(&peer) else {
                    continue;
                };
                if j == i || row.iter().any(|t| t.peer == j) {
                    continue;
                }
                let gj = index.get(peer).unwrap_or_default();
                row.push(PeerTerm {
                    peer: j,
                    node: peer,
                    mask: incidence.get(gi, gj),
                    target: 0.0,
                });
            }
            peers.push(row);

            let row: Vec<AnchorTerm> = match scope {
                AnchorScope::All => (0..anchors.len())
                    .map(|anchor| AnchorTerm {
                        anchor,
                        target: 0.0,
                    })
                    .collect(),
                AnchorScope::Neighborhood => {
                    let mut row: Vec<AnchorTerm> = Vec::new();
                    for peer in neighborhoods.get(node) {
                        if let Some(&anchor) = anchor_slot.get(peer) {
                            if !row.iter().any(|t| t.anchor == anchor) {
                                row.push(AnchorTerm {
                                    anchor,
                                    target: 0.0,
                                });
                            }
                        }
                    }
                    row
                }
            };
            anchor_terms.push(row);
        }

        Ok(Self {
            peers,
            anchors: anchor_terms,
        })
    }

    /// Re-reads every target distance from the topology.
    fn refresh<T: Topology + ?Sized>(
        &mut self,
        topology: &T,
        anchors: &[Anchor],
        nodes: &[ElementId],
        scale: f64,
    ) -> Result<()> {
        for (i, &node) in nodes.iter().enumerate() {
            for term in &mut self.peers[i] {
                term.target = topology.route(node, term.node)?.rtt * scale;
            }
            for term in &mut self.anchors[i] {
                term.target = topology.route(node, anchors[term.anchor].node)?.rtt * scale;
            }
        }
        Ok(())
    }

    fn delta_max(&self) -> usize {
        let degree = self.peers.iter().map(Vec::len).max().unwrap_or(0);
        degree.max(self.max_anchor_degree())
    }

    fn max_anchor_degree(&self) -> usize {
        self.anchors.iter().map(Vec::len).max().unwrap_or(0)
    }
}

fn solve<T: Topology + ?Sized>(
    topology: &T,
    anchors: &[Anchor],
    nodes: &[ElementId],
    neighborhoods: &Neighborhoods,
    opts: &SolverOptions,
    initial: Option<&IndexMap<ElementId, Point>>,
    rng: &mut XorShift64Star,
) -> Result<Embedding> {
    let region = opts.region;
    let anchor_at: Vec<Point> = anchors
        .iter()
        .map(|a| {
            a.position
                .or_else(|| initial.and_then(|m| m.get(&a.node).copied()))
                .unwrap_or_else(|| region.sample(rng))
        })
        .collect();

    let mut stats = SolveStats::default();
    if nodes.is_empty() {
        return Ok(finish(nodes, Vec::new(), anchors, &anchor_at, opts, stats));
    }

    let mut terms = Terms::new(topology, anchors, nodes, neighborhoods, opts.anchor_scope)?;
    terms.refresh(topology, anchors, nodes, opts.rtt_scale)?;

    stats.delta_max = terms.delta_max();
    stats.max_anchor_degree = terms.max_anchor_degree();
    let lf = opts.lipschitz_factor * stats.delta_max as f64 + stats.max_anchor_degree as f64;
    stats.lipschitz = if lf > 0.0 { lf } else { 1.0 };

    let start: Vec<Point> = nodes
        .iter()
        .map(|id| {
            initial
                .and_then(|m| m.get(id).copied())
                .unwrap_or_else(|| region.sample(rng))
        })
        .collect();
    let mut history = History::new(start);

    for iter in 1..opts.max_iterations {
        if opts.distances == DistanceRefresh::PerIteration && iter > 1 {
            terms.refresh(topology, anchors, nodes, opts.rtt_scale)?;
        }

        history.rotate();
        let momentum = (iter as f64 - 2.0) / (iter as f64 + 1.0);
        let w: Vec<Point> = history
            .previous()
            .iter()
            .zip(history.before_previous())
            .map(|(last, before)| last + (last - before) * momentum)
            .collect();

        let next = history.current_mut();
        for (i, slot) in next.iter_mut().enumerate() {
            let g = neighbor_term(i, &w, &terms.peers[i], &mut stats);
            let h = anchor_term(&w[i], &terms.anchors[i], &anchor_at, &mut stats);
            *slot = w[i] - (g + h) / stats.lipschitz;
        }
        stats.iterations += 1;
    }

    tracing::debug!(
        nodes = nodes.len(),
        anchors = anchors.len(),
        iterations = stats.iterations,
        lipschitz = stats.lipschitz,
        degenerate = stats.degenerate_projections,
        "coordinate solve finished"
    );

    let solved = history.into_current();
    Ok(finish(nodes, solved, anchors, &anchor_at, opts, stats))
}

/// `delta_i * w_i - sum_j w_j - sum_j C_ij * P(w_i - w_j, d_ij)`, the gradient of the squared
/// distances from each displacement to its target sphere.
fn neighbor_term(i: usize, w: &[Point], peers: &[PeerTerm], stats: &mut SolveStats) -> Point {
    let wi = w[i];
    let mut sum_w = Point::zeros();
    let mut sum_proj = Point::zeros();
    for term in peers {
        let wj = w[term.peer];
        sum_w += wj;
        let proj = project_onto_ball(&(wi - wj), term.target);
        if proj.degenerate {
            stats.degenerate_projections += 1;
        }
        sum_proj += proj.point * term.mask;
    }
    wi * peers.len() as f64 - sum_w - sum_proj
}

/// `sum_a (w_i - a) - P(w_i - a, r_ia)`.
fn anchor_term(
    wi: &Point,
    terms: &[AnchorTerm],
    anchor_at: &[Point],
    stats: &mut SolveStats,
) -> Point {
    let mut h = Point::zeros();
    for term in terms {
        let offset = wi - anchor_at[term.anchor];
        let proj = project_onto_ball(&offset, term.target);
        if proj.degenerate {
            stats.degenerate_projections += 1;
        }
        h += offset - proj.point;
    }
    h
}

fn finish(
    nodes: &[ElementId],
    solved: Vec<Point>,
    anchors: &[Anchor],
    anchor_at: &[Point],
    opts: &SolverOptions,
    stats: SolveStats,
) -> Embedding {
    let mut positions: IndexMap<ElementId, Point> =
        IndexMap::with_capacity(nodes.len() + anchors.len());
    for (id, p) in nodes.iter().zip(solved) {
        positions.insert(*id, p);
    }
    for (a, p) in anchors.iter().zip(anchor_at) {
        positions.insert(a.node, *p);
    }
    Embedding {
        positions,
        rtt_scale: opts.rtt_scale,
        stats,
    }
}
