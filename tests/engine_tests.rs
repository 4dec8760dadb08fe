use std::sync::Arc;

use bgpsimulator::adapter::{Adapter, InMemoryAdapter, SeedRow};
use bgpsimulator::as_graph::{ASGraph, AS};
use bgpsimulator::engine::PropagationEngine;
use bgpsimulator::route_validator::RouteValidator;
use bgpsimulator::shared::Settings;
use bgpsimulator::Prefix;

fn diamond_topology() -> ASGraph {
    // 1 is the tier-1 provider of both 2 and 3, which peer with each other
    // and both provide transit to customer 4.
    let mut g = ASGraph::new();
    for asn in [1, 2, 3, 4] {
        g.insert(AS::new(asn));
    }
    g.add_provider_customer_edge(1, 2);
    g.add_provider_customer_edge(1, 3);
    g.add_peer_edge(2, 3);
    g.add_provider_customer_edge(2, 4);
    g.add_provider_customer_edge(3, 4);
    g.remove_stubs();
    g.condense();
    g.assign_as_propagation_rank();
    g
}

#[test]
fn customer_route_reaches_every_as_in_the_graph() {
    let graph = diamond_topology();
    let rv = Arc::new(RouteValidator::new());
    let mut engine = PropagationEngine::new(graph, Settings::BaseDefense, false, false, rv);

    let prefix: Prefix = "9.9.9.0/24".parse().unwrap();
    let rows = vec![SeedRow {
        prefix,
        origin: 4,
        as_path: vec![4],
        timestamp: 0,
    }];

    let results = engine.run_block(&rows);
    let asns: std::collections::HashSet<u32> = results.iter().map(|r| r.asn).collect();
    assert!(asns.contains(&1));
    assert!(asns.contains(&2));
    assert!(asns.contains(&3));
    assert!(asns.contains(&4));
}

#[test]
fn peer_learned_route_does_not_cross_to_the_other_peer() {
    // Seed a route only reachable from AS 2's provider; AS 3 must not learn
    // it via its peering link with AS 2 re-exporting a provider-learned route.
    let mut g = ASGraph::new();
    for asn in [1, 2, 3] {
        g.insert(AS::new(asn));
    }
    g.add_provider_customer_edge(1, 2);
    g.add_peer_edge(2, 3);
    g.assign_as_propagation_rank();

    let rv = Arc::new(RouteValidator::new());
    let mut engine = PropagationEngine::new(g, Settings::BaseDefense, false, false, rv);

    let prefix: Prefix = "5.5.5.0/24".parse().unwrap();
    let rows = vec![SeedRow {
        prefix,
        origin: 1,
        as_path: vec![1],
        timestamp: 0,
    }];

    let results = engine.run_block(&rows);
    let as3_has_route = results.iter().any(|r| r.asn == 3);
    assert!(!as3_has_route);
}

#[test]
fn full_run_through_adapter_produces_results_for_every_block() {
    let graph = diamond_topology();
    let rv = Arc::new(RouteValidator::new());
    let mut engine = PropagationEngine::new(graph, Settings::BaseDefense, false, false, rv);

    let mut adapter = InMemoryAdapter::new();
    adapter.seeds.push(SeedRow {
        prefix: "9.9.9.0/24".parse().unwrap(),
        origin: 4,
        as_path: vec![4],
        timestamp: 0,
    });

    let root: Prefix = "0.0.0.0/0".parse().unwrap();
    engine.run(&mut adapter, root, 100_000).unwrap();
    assert!(!adapter.results.is_empty());
    assert!(adapter.load_relationships().unwrap().is_empty());
}
