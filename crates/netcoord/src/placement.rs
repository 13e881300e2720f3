//! Role-aware starting coordinates used to warm-start the solver.
//!
//! Hubs take one quadrant each, relays sit close to their nearest hub, leaves are placed in pairs
//! inside their hub's quadrant, and the cloudlet gets a fixed point. Nodes that cannot be tied to
//! a hub fall back to the center of the region. This never fails.

use crate::geom::{NORM_FLOOR, Point, Region};
use crate::neighborhood::Neighborhoods;
use crate::rng::XorShift64Star;
use indexmap::IndexMap;
use netcoord_topology::{ElementId, Role, Topology};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

const MAX_RESAMPLES: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    pub region: Region,
    /// Half-side of the square a relay or a second leaf is drawn from.
    pub spread: f64,
    /// Cloudlet coordinate as a fraction of the region on each axis.
    pub cloudlet_at: [f64; 2],
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            region: Region::default(),
            spread: 5.0,
            cloudlet_at: [0.65, 0.65],
        }
    }
}

/// The hub in `node`'s neighborhood with the smallest round-trip time to it.
pub fn nearest_hub<T: Topology + ?Sized>(
    topology: &T,
    node: ElementId,
    neighborhoods: &Neighborhoods,
) -> Option<ElementId> {
    let mut best: Option<(ElementId, f64)> = None;
    for &peer in neighborhoods.get(node) {
        if topology.role(peer) != Some(Role::Hub) {
            continue;
        }
        let rtt = match topology.route(node, peer) {
            Ok(route) => route.rtt,
            Err(err) => {
                tracing::warn!(
                    %node,
                    hub = topology.name(peer).unwrap_or_default(),
                    %err,
                    "skipping hub without a route"
                );
                continue;
            }
        };
        if best.is_none_or(|(_, d)| rtt < d) {
            best = Some((peer, rtt));
        }
    }
    best.map(|(hub, _)| hub)
}

pub fn initial_placement<T: Topology + ?Sized>(
    topology: &T,
    nodes: &[ElementId],
    neighborhoods: &Neighborhoods,
    opts: &PlacementOptions,
    rng: &mut XorShift64Star,
) -> IndexMap<ElementId, Point> {
    let region = opts.region;
    let mut coords: IndexMap<ElementId, Point> = IndexMap::new();
    let mut hub_quadrant: FxHashMap<ElementId, usize> = FxHashMap::default();

    let by_role = |role: Role| -> Vec<ElementId> {
        nodes
            .iter()
            .copied()
            .filter(|id| topology.role(*id) == Some(role))
            .collect()
    };

    for (ordinal, hub) in by_role(Role::Hub).into_iter().enumerate() {
        // A hub with a known anchor coordinate keeps it; its quadrant follows the coordinate.
        let (quadrant, at) = match topology.anchor_position(hub).map(Point::from) {
            Some(p) => {
                let quadrant = (0..4)
                    .find(|q| region.quadrant(*q).contains(&p))
                    .unwrap_or(ordinal % 4);
                (quadrant, p)
            }
            None => (ordinal % 4, region.quadrant(ordinal).sample(rng)),
        };
        coords.insert(hub, at);
        hub_quadrant.insert(hub, quadrant);
    }

    for relay in by_role(Role::Relay) {
        let center = match nearest_hub(topology, relay, neighborhoods)
            .and_then(|hub| coords.get(&hub).copied())
        {
            Some(p) => p,
            None => {
                tracing::warn!(
                    node = %relay,
                    name = topology.name(relay).unwrap_or_default(),
                    "relay has no reachable hub, using region center"
                );
                region.center()
            }
        };
        coords.insert(relay, region.around(&center, opts.spread).sample(rng));
    }

    for pair in by_role(Role::Leaf).chunks(2) {
        let first = pair[0];
        let first_at = match nearest_hub(topology, first, neighborhoods)
            .and_then(|hub| hub_quadrant.get(&hub).copied())
        {
            Some(quadrant) => region.quadrant(quadrant).sample(rng),
            None => {
                tracing::warn!(
                    node = %first,
                    name = topology.name(first).unwrap_or_default(),
                    "leaf has no reachable hub, using region center"
                );
                region.center()
            }
        };
        coords.insert(first, first_at);

        if let Some(&second) = pair.get(1) {
            let second_at = distinct_near(&region, &first_at, opts.spread, rng);
            coords.insert(second, second_at);
        }
    }

    let cloudlet_at = region.fraction(opts.cloudlet_at[0], opts.cloudlet_at[1]);
    for cloudlet in by_role(Role::Cloudlet) {
        coords.insert(cloudlet, cloudlet_at);
    }

    for anchor in by_role(Role::Anchor) {
        let p = topology
            .anchor_position(anchor)
            .map(Point::from)
            .unwrap_or_else(|| region.sample(rng));
        coords.insert(anchor, p);
    }

    coords
}

/// A point within `spread` of `origin` that does not coincide with it.
fn distinct_near(
    region: &Region,
    origin: &Point,
    spread: f64,
    rng: &mut XorShift64Star,
) -> Point {
    let area = region.around(origin, spread);
    for _ in 0..MAX_RESAMPLES {
        let p = area.sample(rng);
        if p != *origin {
            return p;
        }
    }
    // Zero-area box: step off the origin by the smallest usable distance.
    let nudged = Point::new(origin.x + NORM_FLOOR, origin.y);
    if region.contains(&nudged) {
        nudged
    } else {
        Point::new(origin.x - NORM_FLOOR, origin.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_near_never_returns_the_origin() {
        let region = Region::default();
        let origin = Point::new(50.0, 50.0);
        let mut rng = XorShift64Star::new(11);
        for _ in 0..100 {
            let p = distinct_near(&region, &origin, 5.0, &mut rng);
            assert_ne!(p, origin);
            assert!((p.x - origin.x).abs() <= 5.0 && (p.y - origin.y).abs() <= 5.0);
        }
    }

    #[test]
    fn distinct_near_handles_a_zero_spread() {
        let region = Region::default();
        let origin = Point::new(100.0, 0.0);
        let mut rng = XorShift64Star::new(1);
        let p = distinct_near(&region, &origin, 0.0, &mut rng);
        assert_ne!(p, origin);
        assert!(region.contains(&p));
    }
}
