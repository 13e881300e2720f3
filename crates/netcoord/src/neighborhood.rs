//! Per-node neighborhoods: the peers whose measured latency constrains a node's coordinate.
//!
//! Each node's adjacency is unrolled breadth-first. Links are never candidates themselves; they
//! only lead to further elements. Depth is counted per element layer, so with the usual
//! node-link-node alternation a budget of `2 * h` reaches nodes `h` hops away.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use netcoord_topology::{ElementId, ElementKind, Role, Topology};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Decides whether a discovered node may be paired with the node whose neighborhood is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingRule {
    /// Self pairs, and pairs where at least one side is a hub.
    #[default]
    HubOrSelf,
    /// [`PairingRule::HubOrSelf`] plus pairs of the same role (e.g. leaf with leaf).
    HubOrSameTier,
    /// Every discovered node.
    Any,
}

impl PairingRule {
    pub fn admits(self, candidate: Role, origin: Role, same_node: bool) -> bool {
        if same_node {
            return true;
        }
        let hub_side = candidate.is_hub() || origin.is_hub();
        match self {
            PairingRule::HubOrSelf => hub_side,
            PairingRule::HubOrSameTier => hub_side || candidate == origin,
            PairingRule::Any => true,
        }
    }
}

/// Which elements the breadth-first walk expands through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Expand only through links; discovered nodes end the walk along that path.
    #[default]
    LinksOnly,
    /// Expand through links and through discovered nodes.
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodOptions {
    /// Depth budget in element layers (links and nodes each count once).
    pub max_hops: usize,
    /// Make the cloudlet node (first node with [`Role::Cloudlet`]) a mutual neighbor of every node.
    pub has_cloudlet: bool,
    pub pairing: PairingRule,
    pub traversal: Traversal,
}

impl Default for NeighborhoodOptions {
    fn default() -> Self {
        Self {
            max_hops: 6,
            has_cloudlet: false,
            pairing: PairingRule::default(),
            traversal: Traversal::default(),
        }
    }
}

/// Ordered map from node to its ordered peer list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighborhoods {
    map: IndexMap<ElementId, Vec<ElementId>>,
}

impl Neighborhoods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peers of `node`; empty when the node has none or is not in the map.
    pub fn get(&self, node: ElementId) -> &[ElementId] {
        self.map.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, node: ElementId) -> usize {
        self.get(node).len()
    }

    pub fn contains(&self, node: ElementId, peer: ElementId) -> bool {
        self.get(node).contains(&peer)
    }

    pub fn has_entry(&self, node: ElementId) -> bool {
        self.map.contains_key(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &[ElementId])> {
        self.map.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Adds `peer` to the neighborhood of `node` unless already present.
    pub fn link(&mut self, node: ElementId, peer: ElementId) {
        let peers = self.map.entry(node).or_default();
        if !peers.contains(&peer) {
            peers.push(peer);
        }
    }
}

impl FromIterator<(ElementId, Vec<ElementId>)> for Neighborhoods {
    fn from_iter<I: IntoIterator<Item = (ElementId, Vec<ElementId>)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

pub fn build_neighborhoods<T: Topology + ?Sized>(
    topology: &T,
    nodes: &[ElementId],
    opts: &NeighborhoodOptions,
) -> Result<Neighborhoods> {
    let mut out = Neighborhoods::new();
    for &node in nodes {
        let peers = unroll(topology, node, opts)?;
        out.map.insert(node, peers);
    }

    if opts.has_cloudlet {
        let cloudlet = topology
            .all_nodes()
            .into_iter()
            .find(|id| topology.role(*id) == Some(Role::Cloudlet));
        match cloudlet {
            Some(cloudlet) => {
                for &node in nodes {
                    if node != cloudlet {
                        out.link(node, cloudlet);
                        out.link(cloudlet, node);
                    }
                }
            }
            None => tracing::warn!("cloudlet requested but the topology has no cloudlet node"),
        }
    }

    tracing::debug!(
        nodes = out.len(),
        pairs = out.map.values().map(Vec::len).sum::<usize>(),
        "built neighborhoods"
    );
    Ok(out)
}

fn unroll<T: Topology + ?Sized>(
    topology: &T,
    origin: ElementId,
    opts: &NeighborhoodOptions,
) -> Result<Vec<ElementId>> {
    let origin_role = topology.role(origin).ok_or(Error::UnknownNode(origin))?;
    let direct = topology
        .adjacent(origin)
        .ok_or(Error::MissingAdjacency(origin))?;

    let mut peers: Vec<ElementId> = Vec::new();
    let mut seen: FxHashSet<ElementId> = FxHashSet::default();
    seen.insert(origin);

    let mut queue: VecDeque<ElementId> = direct.iter().copied().collect();
    let mut level = 0usize;
    let mut level_size = queue.len();
    let mut popped = 0usize;

    while level <= opts.max_hops {
        let Some(element) = queue.pop_front() else {
            break;
        };
        popped += 1;

        if seen.insert(element) {
            let kind = topology.kind(element).ok_or(Error::UnknownNode(element))?;
            let expand = match kind {
                ElementKind::Node(role) => {
                    if opts.pairing.admits(role, origin_role, element == origin) {
                        peers.push(element);
                    }
                    opts.traversal == Traversal::All
                }
                ElementKind::Link => true,
            };
            if expand {
                let next = topology
                    .adjacent(element)
                    .ok_or(Error::MissingAdjacency(element))?;
                queue.extend(next.iter().copied().filter(|e| !seen.contains(e)));
            }
        }

        // Everything queued while draining a level forms the next level.
        if popped == level_size {
            level += 1;
            level_size = queue.len();
            popped = 0;
        }
    }

    Ok(peers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_only_pairs_through_hubs() {
        let rule = PairingRule::HubOrSelf;
        assert!(rule.admits(Role::Leaf, Role::Hub, false));
        assert!(rule.admits(Role::Hub, Role::Relay, false));
        assert!(!rule.admits(Role::Leaf, Role::Leaf, false));
        assert!(!rule.admits(Role::Relay, Role::Leaf, false));
        assert!(rule.admits(Role::Leaf, Role::Leaf, true));
    }

    #[test]
    fn same_tier_rule_adds_equal_roles() {
        let rule = PairingRule::HubOrSameTier;
        assert!(rule.admits(Role::Leaf, Role::Leaf, false));
        assert!(!rule.admits(Role::Relay, Role::Leaf, false));
        assert!(PairingRule::Any.admits(Role::Relay, Role::Leaf, false));
    }

    #[test]
    fn link_is_idempotent() {
        let a = ElementId::new(0);
        let b = ElementId::new(1);
        let mut n = Neighborhoods::new();
        n.link(a, b);
        n.link(a, b);
        assert_eq!(n.get(a), &[b]);
        assert!(n.get(b).is_empty());
        assert!(!n.has_entry(b));
    }
}
