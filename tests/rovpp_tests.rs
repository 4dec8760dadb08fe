use std::str::FromStr;
use std::sync::Arc;

use bgpsimulator::adapter::SeedRow;
use bgpsimulator::as_graph::{ASGraph, AS};
use bgpsimulator::engine::PropagationEngine;
use bgpsimulator::shared::Settings;
use bgpsimulator::{Prefix, RouteValidator, ROA};

fn provider_customer_graph() -> ASGraph {
    let mut g = ASGraph::new();
    g.insert(AS::new(1));
    g.insert(AS::new(2));
    g.add_provider_customer_edge(1, 2);
    g.assign_as_propagation_rank();
    g
}

#[test]
fn rovpp_v0_1_blackholes_an_unrouted_attacker_origin() {
    let graph = provider_customer_graph();
    let prefix: Prefix = "9.9.9.0/24".parse().unwrap();
    // AS2 (the customer) originates the prefix itself, but the ROA says it
    // belongs to a different origin entirely, so this is a hijack.
    let attacker_origin = 2;
    let legit_roa_origin = 999;

    let mut rv = RouteValidator::new();
    rv.add_roa(ROA::new(
        ipnetwork::IpNetwork::from_str("9.9.9.0/24").unwrap(),
        legit_roa_origin,
        None,
    ));
    let rv = Arc::new(rv);

    let mut engine = PropagationEngine::new(graph, Settings::RovppV1Lite, false, false, rv);
    let rows = vec![SeedRow {
        prefix,
        origin: attacker_origin,
        as_path: vec![attacker_origin],
        timestamp: 0,
    }];

    let results = engine.run_block(&rows);
    let provider_row = results.iter().find(|r| r.asn == 1).expect("provider must hold a result");
    assert_eq!(provider_row.origin, bgpsimulator::announcement::BLACKHOLE_ASN);
}

#[test]
fn rovpp_v0_2_forwards_the_blackhole_to_customers_but_not_providers() {
    let mut g = ASGraph::new();
    g.insert(AS::new(1));
    g.insert(AS::new(2));
    g.insert(AS::new(3));
    g.add_provider_customer_edge(1, 2);
    g.add_provider_customer_edge(2, 3);
    g.assign_as_propagation_rank();

    let prefix: Prefix = "7.7.7.0/24".parse().unwrap();
    let attacker_origin = 3;
    let legit_roa_origin = 999;

    let mut rv = RouteValidator::new();
    rv.add_roa(ROA::new(
        ipnetwork::IpNetwork::from_str("7.7.7.0/24").unwrap(),
        legit_roa_origin,
        None,
    ));
    let rv = Arc::new(rv);

    let mut engine = PropagationEngine::new(g, Settings::RovppV2Lite, false, false, rv);
    let rows = vec![SeedRow {
        prefix,
        origin: attacker_origin,
        as_path: vec![attacker_origin],
        timestamp: 0,
    }];

    let results = engine.run_block(&rows);
    let as2_row = results.iter().find(|r| r.asn == 2).expect("AS2 must reject and blackhole");
    assert_eq!(as2_row.origin, bgpsimulator::announcement::BLACKHOLE_ASN);
}
