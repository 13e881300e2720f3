use netcoord_topology::{ElementKind, Network, Role, RouteError, Topology};

fn star() -> Network {
    let mut net = Network::new();
    let hub = net.add_node("nuc-0", Role::Hub);
    let sw = net.add_link("switch-0");
    let a = net.add_node("rpi-0", Role::Leaf);
    let b = net.add_node("rpi-1", Role::Leaf);
    net.connect(hub, sw, 1.0);
    net.connect(a, sw, 2.0);
    net.connect(b, sw, 3.0);
    net
}

#[test]
fn nodes_and_anchors_are_disjoint() {
    let mut net = star();
    let hub = net.id("nuc-0").unwrap();
    net.mark_anchor_at(hub, [10.0, 20.0]);

    let nodes = net.nodes();
    let anchors = net.anchors();
    assert_eq!(anchors, vec![hub]);
    assert!(!nodes.contains(&hub));
    assert_eq!(nodes.len(), 2);
    assert_eq!(net.all_nodes().last(), Some(&hub));
    assert_eq!(net.anchor_position(hub), Some([10.0, 20.0]));
}

#[test]
fn links_are_not_nodes() {
    let net = star();
    let sw = net.id("switch-0").unwrap();
    assert_eq!(net.kind(sw), Some(ElementKind::Link));
    assert!(!net.nodes().contains(&sw));
    assert_eq!(net.role(sw), None);
}

#[test]
fn route_doubles_shortest_one_way_latency() {
    let net = star();
    let a = net.id("rpi-0").unwrap();
    let b = net.id("rpi-1").unwrap();
    let rtt = net.route(a, b).unwrap().rtt;
    assert_eq!(rtt, 2.0 * (2.0 + 3.0));
    assert_eq!(net.route(b, a).unwrap().rtt, rtt);
    assert_eq!(net.route(a, a).unwrap().rtt, 0.0);
}

#[test]
fn measured_rtt_overrides_path_estimate() {
    let mut net = star();
    let a = net.id("rpi-0").unwrap();
    let hub = net.id("nuc-0").unwrap();
    net.set_rtt(hub, a, 0.5);
    assert_eq!(net.route(a, hub).unwrap().rtt, 0.5);
}

#[test]
fn route_reports_contract_violations() {
    let mut net = star();
    let a = net.id("rpi-0").unwrap();
    let sw = net.id("switch-0").unwrap();
    let lonely = net.add_node("rpi-9", Role::Leaf);
    let unknown = netcoord_topology::ElementId::new(99);

    assert_eq!(net.route(a, sw), Err(RouteError::NotANode(sw)));
    assert_eq!(net.route(a, unknown), Err(RouteError::UnknownElement(unknown)));
    assert_eq!(
        net.route(a, lonely),
        Err(RouteError::Unreachable { src: a, dst: lonely })
    );
}

#[test]
fn one_way_connections_are_directed() {
    let mut net = Network::new();
    let a = net.add_node("a", Role::Hub);
    let b = net.add_node("b", Role::Leaf);
    net.connect_one_way(a, b, 1.0);
    assert_eq!(net.adjacent(a), Some(&[b][..]));
    assert!(net.adjacent(b).unwrap().is_empty());
    assert!(net.route(b, a).is_err());
    assert_eq!(net.route(a, b).unwrap().rtt, 2.0);
}

#[test]
fn element_ids_cover_the_u32_range() {
    let last = netcoord_topology::ElementId::new(u32::MAX as usize);
    assert_eq!(last.index(), u32::MAX as usize);
}

#[cfg(target_pointer_width = "64")]
#[test]
#[should_panic(expected = "exceeds the u32 id space")]
fn element_id_rejects_indices_past_u32() {
    let _ = netcoord_topology::ElementId::new(u32::MAX as usize + 1);
}
