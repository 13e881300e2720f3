use netcoord::topology::{ElementId, Network, Role, Topology};
use netcoord::{
    GlobalIndex, LocalizeOptions, NeighborhoodOptions, Point, build_incidence, build_neighborhoods,
    localize,
};

/// Urban-sensing style testbed: four hubs on a shared backbone, a relay per hub, two leaves per
/// hub and a cloudlet server on the backbone. The first two hubs are anchors.
fn testbed() -> Network {
    let mut net = Network::new();
    let backbone = net.add_link("backbone");
    let server = net.add_node("server", Role::Cloudlet);
    net.connect(server, backbone, 0.5);

    for h in 0..4 {
        let hub = net.add_node(format!("nuc-{h}"), Role::Hub);
        let sw = net.add_link(format!("switch-{h}"));
        net.connect(hub, sw, 0.2);
        net.connect(sw, backbone, 1.0 + h as f64);

        let relay = net.add_node(format!("tx2-{h}"), Role::Relay);
        net.connect(relay, sw, 0.3);
        for l in 0..2 {
            let leaf = net.add_node(format!("rpi-{h}-{l}"), Role::Leaf);
            net.connect(leaf, sw, 0.4 + 0.1 * l as f64);
        }
    }

    let hub0 = net.id("nuc-0").unwrap();
    let hub1 = net.id("nuc-1").unwrap();
    net.mark_anchor_at(hub0, [25.0, 25.0]);
    net.mark_anchor_at(hub1, [75.0, 25.0]);
    net
}

#[test]
fn every_node_and_anchor_is_localized() {
    let net = testbed();
    let opts = LocalizeOptions {
        random_seed: 3,
        warm_start: true,
        neighborhood: NeighborhoodOptions {
            has_cloudlet: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let e = localize(&net, &opts).unwrap();

    assert_eq!(e.len(), net.all_nodes().len());
    for id in net.all_nodes() {
        let p = e.position(id).unwrap();
        assert!(p.x.is_finite() && p.y.is_finite(), "{id}: {p:?}");
    }
    assert_eq!(
        e.position(net.id("nuc-0").unwrap()),
        Some(Point::new(25.0, 25.0))
    );
    assert_eq!(e.stats().iterations, opts.solver.max_iterations - 1);
}

#[test]
fn localize_is_deterministic_for_a_seed() {
    let net = testbed();
    let opts = LocalizeOptions {
        random_seed: 17,
        ..Default::default()
    };
    let a = localize(&net, &opts).unwrap().into_positions();
    let b = localize(&net, &opts).unwrap().into_positions();
    assert_eq!(a, b);
}

#[test]
fn trilateration_from_three_anchors() {
    // Truth is (30, 40); every anchor is 50 scaled units (5 RTT units) away.
    let mut net = Network::new();
    let node = net.add_node("rpi-0", Role::Leaf);
    for (i, at) in [[0.0, 0.0], [60.0, 0.0], [0.0, 80.0]].into_iter().enumerate() {
        let a = net.add_node(format!("ref-{i}"), Role::Anchor);
        net.mark_anchor_at(a, at);
        net.set_rtt(node, a, 5.0);
    }

    let mut opts = LocalizeOptions {
        warm_start: true,
        ..Default::default()
    };
    opts.solver.max_iterations = 2000;
    let e = localize(&net, &opts).unwrap();

    let p = e.position(node).unwrap();
    assert!((p - Point::new(30.0, 40.0)).norm() < 1.0, "ended at {p:?}");
    for a in net.anchors() {
        let rtt = e.estimated_rtt(node, a).unwrap();
        assert!((rtt - 5.0).abs() < 0.1, "{a}: {rtt}");
    }
}

#[test]
fn incidence_is_symmetric_on_a_bidirectional_testbed() {
    let net = testbed();
    let nodes = net.all_nodes();
    let opts = NeighborhoodOptions {
        has_cloudlet: true,
        ..Default::default()
    };
    let neighborhoods = build_neighborhoods(&net, &nodes, &opts).unwrap();
    let index = GlobalIndex::from_topology(&net);
    let c = build_incidence(&index, &neighborhoods, &nodes).unwrap();

    assert_eq!(c.len(), nodes.len());
    assert!(c.is_symmetric());
    for i in 0..c.len() {
        for j in 0..c.len() {
            assert_eq!(c.get(i, j), c.get(j, i));
        }
    }

    let server = index.get(net.id("server").unwrap()).unwrap();
    for (k, id) in nodes.iter().enumerate() {
        if *id != net.id("server").unwrap() {
            assert_eq!(c.get(server, k), 1.0, "server row misses {id}");
        }
    }
}

#[test]
fn estimated_rtt_is_available_for_unmeasured_pairs() {
    let net = testbed();
    let e = localize(&net, &LocalizeOptions::default()).unwrap();
    let a: ElementId = net.id("rpi-2-0").unwrap();
    let b: ElementId = net.id("rpi-3-1").unwrap();
    let rtt = e.estimated_rtt(a, b).unwrap();
    assert!(rtt.is_finite() && rtt >= 0.0);
}
