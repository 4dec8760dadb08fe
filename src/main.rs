use std::sync::Arc;

use clap::Parser;

use bgpsimulator::adapter::InMemoryAdapter;
use bgpsimulator::as_graph::{ASGraph, AS};
use bgpsimulator::cli::Cli;
use bgpsimulator::engine::PropagationEngine;
use bgpsimulator::route_validator::RouteValidator;
use bgpsimulator::shared::Settings;

fn build_demo_graph() -> ASGraph {
    let mut graph = ASGraph::new();
    for asn in [1, 2, 3, 4] {
        graph.insert(AS::new(asn));
    }
    graph.add_provider_customer_edge(1, 2);
    graph.add_provider_customer_edge(1, 3);
    graph.add_provider_customer_edge(2, 4);
    graph.add_provider_customer_edge(3, 4);
    graph.remove_stubs();
    graph.condense();
    graph.assign_as_propagation_rank();
    graph.add_asn_groups();
    graph
}

fn main() {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::new();
    builder.filter_level(cli.log_level_filter());
    builder.init();

    if !cli.exclude_asn.is_empty() {
        log::info!("excluding {} ASN(s) from this run", cli.exclude_asn.len());
    }

    let settings = if cli.rovpp {
        Settings::RovppV1Lite
    } else if cli.ezbgpsec {
        Settings::Bgpisec
    } else {
        Settings::BaseDefense
    };

    let graph = build_demo_graph();
    let route_validator = Arc::new(RouteValidator::new());
    let mut engine = PropagationEngine::new(graph, settings, cli.random, cli.store_depref, route_validator);

    let mut adapter = InMemoryAdapter::new();
    adapter.seeds.push(bgpsimulator::adapter::SeedRow {
        prefix: "1.2.3.0/24".parse().unwrap(),
        origin: 4,
        as_path: vec![4],
        timestamp: 0,
    });

    let root: bgpsimulator::prefix::Prefix = "0.0.0.0/0".parse().unwrap();
    match engine.run(&mut adapter, root, cli.iteration_size) {
        Ok(stats) => {
            log::info!(
                "run complete: {} announcements seeded, {} loops detected, {} broken paths",
                stats.announcement_count,
                stats.loops,
                stats.broken_paths
            );
            for (iteration, row) in &adapter.results {
                log::debug!(
                    "iteration {} AS{} selected {} via AS{}",
                    iteration,
                    row.asn,
                    row.prefix,
                    row.received_from_asn
                );
            }
        }
        Err(err) => {
            log::error!("run failed: {}", err);
            std::process::exit(1);
        }
    }
}
