//! In-memory [`Topology`](crate::Topology) implementation.

use crate::{ElementId, ElementKind, Role, Route, RouteError, Topology};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
struct ElementEntry {
    name: String,
    kind: ElementKind,
}

/// A topology built element by element.
///
/// Connections carry a one-way latency. [`Topology::route`] answers with a measured round-trip
/// time when one was recorded through [`Network::set_rtt`], and otherwise with twice the cheapest
/// one-way path latency.
#[derive(Debug, Clone, Default)]
pub struct Network {
    elements: Vec<ElementEntry>,
    name_index: FxHashMap<String, ElementId>,
    adjacency: Vec<Vec<ElementId>>,
    latency: FxHashMap<(ElementId, ElementId), f64>,
    measured: FxHashMap<(ElementId, ElementId), f64>,
    anchors: IndexMap<ElementId, Option<[f64; 2]>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or updates the role of an existing element with the same name.
    pub fn add_node(&mut self, name: impl Into<String>, role: Role) -> ElementId {
        self.upsert(name.into(), ElementKind::Node(role))
    }

    pub fn add_link(&mut self, name: impl Into<String>) -> ElementId {
        self.upsert(name.into(), ElementKind::Link)
    }

    fn upsert(&mut self, name: String, kind: ElementKind) -> ElementId {
        if let Some(&id) = self.name_index.get(&name) {
            self.elements[id.index()].kind = kind;
            return id;
        }
        let id = ElementId::new(self.elements.len());
        self.elements.push(ElementEntry {
            name: name.clone(),
            kind,
        });
        self.adjacency.push(Vec::new());
        self.name_index.insert(name, id);
        id
    }

    pub fn id(&self, name: &str) -> Option<ElementId> {
        self.name_index.get(name).copied()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Connects `a` and `b` in both directions.
    pub fn connect(&mut self, a: ElementId, b: ElementId, latency: f64) -> &mut Self {
        self.connect_one_way(a, b, latency);
        self.connect_one_way(b, a, latency);
        self
    }

    /// Makes `b` adjacent to `a` without the reverse entry.
    pub fn connect_one_way(&mut self, a: ElementId, b: ElementId, latency: f64) -> &mut Self {
        let Some(out) = self.adjacency.get_mut(a.index()) else {
            return self;
        };
        if b.index() >= self.elements.len() {
            return self;
        }
        if !out.contains(&b) {
            out.push(b);
        }
        self.latency.insert((a, b), latency);
        self
    }

    /// Records a measured round-trip time between two nodes (symmetric).
    pub fn set_rtt(&mut self, a: ElementId, b: ElementId, rtt: f64) -> &mut Self {
        self.measured.insert(pair_key(a, b), rtt);
        self
    }

    pub fn mark_anchor(&mut self, id: ElementId) -> &mut Self {
        self.anchors.entry(id).or_insert(None);
        self
    }

    pub fn mark_anchor_at(&mut self, id: ElementId, position: [f64; 2]) -> &mut Self {
        self.anchors.insert(id, Some(position));
        self
    }

    pub fn is_anchor(&self, id: ElementId) -> bool {
        self.anchors.contains_key(&id)
    }

    fn node_entry(&self, id: ElementId) -> Result<&ElementEntry, RouteError> {
        let entry = self
            .elements
            .get(id.index())
            .ok_or(RouteError::UnknownElement(id))?;
        if entry.kind.is_link() {
            return Err(RouteError::NotANode(id));
        }
        Ok(entry)
    }

    fn shortest_one_way(&self, src: ElementId, dst: ElementId) -> Option<f64> {
        let mut dist: Vec<f64> = vec![f64::INFINITY; self.elements.len()];
        let mut heap: BinaryHeap<Frontier> = BinaryHeap::new();
        dist[src.index()] = 0.0;
        heap.push(Frontier {
            cost: 0.0,
            id: src,
        });

        while let Some(Frontier { cost, id }) = heap.pop() {
            if id == dst {
                return Some(cost);
            }
            if cost > dist[id.index()] {
                continue;
            }
            for &next in &self.adjacency[id.index()] {
                let step = self.latency.get(&(id, next)).copied().unwrap_or(0.0);
                let candidate = cost + step;
                if candidate < dist[next.index()] {
                    dist[next.index()] = candidate;
                    heap.push(Frontier {
                        cost: candidate,
                        id: next,
                    });
                }
            }
        }
        None
    }
}

fn pair_key(a: ElementId, b: ElementId) -> (ElementId, ElementId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    id: ElementId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Min-heap on cost; ties broken by id for a stable pop order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl Topology for Network {
    fn nodes(&self) -> Vec<ElementId> {
        (0..self.elements.len())
            .map(ElementId::new)
            .filter(|id| self.elements[id.index()].kind.is_node() && !self.is_anchor(*id))
            .collect()
    }

    fn anchors(&self) -> Vec<ElementId> {
        self.anchors.keys().copied().collect()
    }

    fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.elements.get(id.index()).map(|e| e.kind)
    }

    fn name(&self, id: ElementId) -> Option<&str> {
        self.elements.get(id.index()).map(|e| e.name.as_str())
    }

    fn adjacent(&self, id: ElementId) -> Option<&[ElementId]> {
        self.adjacency.get(id.index()).map(Vec::as_slice)
    }

    fn route(&self, src: ElementId, dst: ElementId) -> Result<Route, RouteError> {
        self.node_entry(src)?;
        self.node_entry(dst)?;
        if let Some(&rtt) = self.measured.get(&pair_key(src, dst)) {
            return Ok(Route { rtt });
        }
        if src == dst {
            return Ok(Route { rtt: 0.0 });
        }
        self.shortest_one_way(src, dst)
            .map(|one_way| Route { rtt: 2.0 * one_way })
            .ok_or(RouteError::Unreachable { src, dst })
    }

    fn anchor_position(&self, id: ElementId) -> Option<[f64; 2]> {
        self.anchors.get(&id).copied().flatten()
    }
}
