#![forbid(unsafe_code)]

//! Topology adapter contract consumed by `netcoord`.
//!
//! A topology is a set of named elements. Elements are either nodes (hosts with a [`Role`]) or
//! links (connectors such as switches and uplinks). Adjacency may go through links, so callers
//! unroll links until they reach nodes. Latency between two nodes is answered by
//! [`Topology::route`].
//!
//! [`Network`] is an in-memory implementation of the contract.

use std::fmt;

mod network;

pub use network::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u32);

impl ElementId {
    /// # Panics
    ///
    /// Panics if `index` does not fit in a `u32`; a topology holds at most `u32::MAX + 1` elements.
    pub fn new(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) => Self(index),
            Err(_) => panic!("element index {index} exceeds the u32 id space"),
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Role a node plays in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Pure reference point.
    Anchor,
    /// Aggregation point; pairs with every other role.
    Hub,
    /// Intermediate node attached to a hub.
    Relay,
    /// Edge device.
    Leaf,
    /// Topology-central node adjacent to everything.
    Cloudlet,
}

impl Role {
    pub fn is_hub(self) -> bool {
        matches!(self, Role::Hub)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node(Role),
    Link,
}

impl ElementKind {
    pub fn is_node(self) -> bool {
        matches!(self, ElementKind::Node(_))
    }

    pub fn is_link(self) -> bool {
        matches!(self, ElementKind::Link)
    }

    pub fn role(self) -> Option<Role> {
        match self {
            ElementKind::Node(role) => Some(role),
            ElementKind::Link => None,
        }
    }
}

/// Answer to a point-to-point latency query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    pub rtt: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("element {0} is not part of the topology")]
    UnknownElement(ElementId),

    #[error("element {0} is a link, routes connect nodes")]
    NotANode(ElementId),

    #[error("no route from {src} to {dst}")]
    Unreachable { src: ElementId, dst: ElementId },
}

/// The adapter contract between a topology provider and the estimation core.
///
/// `nodes()` and `anchors()` are disjoint. `adjacent` may list nodes or links; links have their
/// own adjacency entries.
pub trait Topology {
    /// Non-anchor nodes in a stable order.
    fn nodes(&self) -> Vec<ElementId>;

    /// Anchor nodes in a stable order.
    fn anchors(&self) -> Vec<ElementId>;

    /// Global node ordering: every node followed by every anchor.
    fn all_nodes(&self) -> Vec<ElementId> {
        let mut out = self.nodes();
        out.extend(self.anchors());
        out
    }

    fn kind(&self, id: ElementId) -> Option<ElementKind>;

    fn role(&self, id: ElementId) -> Option<Role> {
        self.kind(id).and_then(ElementKind::role)
    }

    fn name(&self, id: ElementId) -> Option<&str>;

    fn adjacent(&self, id: ElementId) -> Option<&[ElementId]>;

    fn route(&self, src: ElementId, dst: ElementId) -> Result<Route, RouteError>;

    /// A priori coordinate of an anchor, if the provider knows one.
    fn anchor_position(&self, _id: ElementId) -> Option<[f64; 2]> {
        None
    }
}
