#![forbid(unsafe_code)]

//! Network coordinate estimation.
//!
//! Assigns every node of a topology a 2-D coordinate such that Euclidean distances approximate
//! measured round-trip times. The pipeline is:
//!
//! 1. [`neighborhood::build_neighborhoods`]: which peers constrain each node,
//! 2. [`placement::initial_placement`]: optional role-aware warm start,
//! 3. [`solver::execute`]: accelerated projected-gradient iteration against neighbors and anchors.
//!
//! [`localize`] runs all of it against a [`Topology`].

pub use netcoord_topology as topology;

pub mod error;
pub mod geom;
pub mod incidence;
pub mod neighborhood;
pub mod placement;
pub mod rng;
pub mod solver;

pub use error::{Error, Result};
pub use geom::{Point, Region};
pub use incidence::{GlobalIndex, IncidenceMatrix, build_incidence};
pub use neighborhood::{
    NeighborhoodOptions, Neighborhoods, PairingRule, Traversal, build_neighborhoods,
};
pub use placement::{PlacementOptions, initial_placement};
pub use rng::XorShift64Star;
pub use solver::{
    Anchor, AnchorScope, DistanceRefresh, Embedding, SolveStats, SolverOptions, execute,
    execute_warm,
};
pub use topology::{ElementId, ElementKind, Role, Topology};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizeOptions {
    pub random_seed: u64,
    /// Start the solver from [`initial_placement`] instead of uniformly random positions.
    pub warm_start: bool,
    pub neighborhood: NeighborhoodOptions,
    pub placement: PlacementOptions,
    pub solver: SolverOptions,
}

impl LocalizeOptions {
    /// Reads options from JSON; missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::InvalidConfig {
            message: err.to_string(),
        })
    }
}

/// Builds neighborhoods over every node and anchor, then solves for all coordinates.
pub fn localize<T: Topology + ?Sized>(topology: &T, opts: &LocalizeOptions) -> Result<Embedding> {
    let mut rng = XorShift64Star::new(opts.random_seed);

    let everyone = topology.all_nodes();
    let neighborhoods = build_neighborhoods(topology, &everyone, &opts.neighborhood)?;

    let nodes = topology.nodes();
    let anchors: Vec<Anchor> = topology
        .anchors()
        .into_iter()
        .map(|node| Anchor {
            node,
            position: topology.anchor_position(node).map(Point::from),
        })
        .collect();

    if opts.warm_start {
        let initial = initial_placement(
            topology,
            &everyone,
            &neighborhoods,
            &opts.placement,
            &mut rng,
        );
        return execute_warm(
            topology,
            &anchors,
            &nodes,
            &neighborhoods,
            &opts.solver,
            &initial,
            &mut rng,
        );
    }

    execute(
        topology,
        &anchors,
        &nodes,
        &neighborhoods,
        &opts.solver,
        &mut rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_options_fill_in_defaults() {
        let opts = LocalizeOptions::from_json_str(
            r#"{
                "random_seed": 9,
                "neighborhood": { "has_cloudlet": true, "pairing": "hub_or_same_tier" },
                "solver": { "max_iterations": 400, "distances": "per_iteration" }
            }"#,
        )
        .unwrap();
        assert_eq!(opts.random_seed, 9);
        assert!(!opts.warm_start);
        assert!(opts.neighborhood.has_cloudlet);
        assert_eq!(opts.neighborhood.max_hops, 6);
        assert_eq!(opts.neighborhood.pairing, PairingRule::HubOrSameTier);
        assert_eq!(opts.solver.max_iterations, 400);
        assert_eq!(opts.solver.rtt_scale, 10.0);
        assert_eq!(opts.solver.distances, DistanceRefresh::PerIteration);
        assert_eq!(opts.placement.spread, 5.0);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = LocalizeOptions::from_json_str("{ \"solver\": 3 }").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(!err.is_input_contract_violation());
    }
}
