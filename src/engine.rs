use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::{announcement_to_result_row, Adapter, ResultRow, SeedRow};
use crate::announcement::{Announcement, CLEAN_ORIGIN_ASN, NO_TIMESTAMP, SELF_SEED_ASN};
use crate::as_graph::{ASGraph, ASN};
use crate::as_state::AsState;
use crate::policy::RovPpVariant;
use crate::prefix::Prefix;
use crate::route_validator::RouteValidator;
use crate::shared::{Relationships, Settings};

/// ROV++ settles by iterating the up/down cycle until a full pass leaves
/// every Loc-RIB untouched, bounded so a misbehaving policy can't spin
/// forever.
const MAX_ROVPP_ITERATIONS: u32 = 100;

/// Counters mirroring the original extrapolator's `g_loop`/`g_broken_path`/
/// `g_verification` globals, kept per-run instead of process-global.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub loops: u64,
    pub broken_paths: u64,
    pub verification_count: u64,
    pub announcement_count: u64,
}

pub struct PropagationEngine {
    pub as_graph: ASGraph,
    pub states: HashMap<ASN, AsState>,
    pub route_validator: Arc<RouteValidator>,
    pub settings: Settings,
    pub random_tiebreak: bool,
    pub store_depref: bool,
    pub stats: RunStats,
    /// Set whenever a Loc-RIB, blackhole, or poisoned-neighbor mutation
    /// happens during the current up/down pass; drives the ROV++ settle loop.
    graph_changed: bool,
}

impl PropagationEngine {
    pub fn new(
        as_graph: ASGraph,
        settings: Settings,
        random_tiebreak: bool,
        store_depref: bool,
        route_validator: Arc<RouteValidator>,
    ) -> Self {
        let mut states = HashMap::new();
        for as_obj in as_graph.iter() {
            states.insert(
                as_obj.asn,
                AsState::new(as_obj.asn, settings, store_depref, route_validator.clone()),
            );
        }
        PropagationEngine {
            as_graph,
            states,
            route_validator,
            settings,
            random_tiebreak,
            store_depref,
            stats: RunStats::default(),
            graph_changed: false,
        }
    }

    fn resolve(&self, asn: ASN) -> ASN {
        *self.as_graph.component_translation.get(&asn).unwrap_or(&asn)
    }

    fn is_rovpp(&self) -> bool {
        matches!(
            self.settings,
            Settings::RovppV1Lite | Settings::RovppV2Lite | Settings::RovppV2iLite
        )
    }

    pub fn clear_for_next_block(&mut self) {
        for state in self.states.values_mut() {
            state.reset_for_next_block();
        }
    }

    /// Plant one monitor announcement per hop of every seed row's AS_PATH,
    /// grounded on the original extrapolator's `give_ann_to_as_path`.
    pub fn seed_block(&mut self, rows: &[SeedRow]) {
        for row in rows {
            if row.as_path.len() == 1 {
                self.give_origin_to_as_path(row.prefix, row.origin, row.timestamp);
            } else {
                self.give_ann_to_as_path(row.prefix, row.origin, &row.as_path, row.timestamp);
            }
        }
    }

    fn give_origin_to_as_path(&mut self, prefix: Prefix, origin: ASN, tstamp: i64) {
        let asn = self.resolve(origin);
        let Some(state) = self.states.get_mut(&asn) else { return };
        let existing = state.loc_rib.get(&prefix).cloned();
        match existing {
            Some(cur) if cur.tstamp >= tstamp && cur.tstamp != NO_TIMESTAMP => {
                // equal or newer already held: origin-only seeding never overwrites.
            }
            _ => {
                let ann = Announcement::origin_seed(prefix, origin, tstamp);
                state.loc_rib.insert(ann.clone());
                self.stats.announcement_count += 1;
                self.fix_path(asn, prefix, &[origin]);
            }
        }
    }

    /// Walk the path origin-to-collector (as stored, reversed) and seed each
    /// hop with the announcement it would have received from the next hop
    /// toward the origin, mirroring `Extrapolator::give_ann_to_as_path`.
    fn give_ann_to_as_path(&mut self, prefix: Prefix, origin: ASN, as_path: &[ASN], tstamp: i64) {
        let path_len = as_path.len();

        // as_path[0] is the collector-adjacent hop, as_path[last] is the origin.
        for i in (0..path_len).rev() {
            let hop = self.resolve(as_path[i]);
            let received_from = if i + 1 < path_len {
                self.resolve(as_path[i + 1])
            } else {
                SELF_SEED_ASN
            };

            let hops_from_origin = path_len - 1 - i;

            let priority = if hops_from_origin == 0 {
                // the origin's own row: flat priority, no path-length weight.
                300
            } else {
                let path_len_weight = 100u32.saturating_sub(hops_from_origin as u32);
                let base = match self.relationship_class(hop, received_from) {
                    Some(Relationships::Customers) => 200,
                    Some(Relationships::Peers) => 100,
                    Some(Relationships::Providers) => 0,
                    _ => {
                        self.stats.broken_paths += 1;
                        continue;
                    }
                };
                base + path_len_weight
            };

            let Some(state) = self.states.get_mut(&hop) else { continue };
            let incoming_path: Vec<ASN> = as_path[i..].to_vec();

            if incoming_path[1..].contains(&hop) {
                self.stats.loops += 1;
                continue;
            }

            let existing = state.loc_rib.get(&prefix).cloned();
            let should_seed = match existing {
                None => true,
                Some(cur) if cur.tstamp == NO_TIMESTAMP => true,
                Some(cur) => match tstamp.cmp(&cur.tstamp) {
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Equal => {
                        // prepending exception: if the existing path already extends the
                        // same way, keep it rather than treat this as a genuine tie.
                        !cur.as_path.starts_with(&incoming_path)
                    }
                },
            };

            if !should_seed {
                continue;
            }

            let ann = Announcement {
                prefix,
                origin,
                received_from_asn: received_from,
                priority,
                tstamp,
                from_monitor: true,
                as_path: incoming_path,
                withdraw: false,
            };
            state.loc_rib.insert(ann);
            self.stats.announcement_count += 1;
            self.fix_path(hop, prefix, &as_path[..=i]);
        }
    }

    fn relationship_class(&self, asn: ASN, neighbor: ASN) -> Option<Relationships> {
        let a = self.as_graph.get(&asn)?;
        if a.providers.contains(&neighbor) {
            Some(Relationships::Providers)
        } else if a.peers.contains(&neighbor) {
            Some(Relationships::Peers)
        } else if a.customers.contains(&neighbor) {
            Some(Relationships::Customers)
        } else {
            None
        }
    }

    /// Patch any already-propagated downstream neighbor whose stored path was
    /// learned from `reseeded_asn` so it reflects the corrected upstream path,
    /// per the original's `fix_path`.
    fn fix_path(&mut self, reseeded_asn: ASN, prefix: Prefix, corrected_suffix: &[ASN]) {
        let mut to_fix: Vec<ASN> = Vec::new();
        for (&asn, state) in self.states.iter() {
            if let Some(ann) = state.loc_rib.get(&prefix) {
                if ann.received_from_asn == reseeded_asn {
                    to_fix.push(asn);
                }
            }
        }
        for asn in to_fix {
            let Some(state) = self.states.get_mut(&asn) else { continue };
            if let Some(ann) = state.loc_rib.get(&prefix).cloned() {
                let mut new_path = corrected_suffix.to_vec();
                new_path.push(asn);
                if new_path != ann.as_path {
                    let mut patched = ann.clone();
                    patched.as_path = new_path.clone();
                    state.loc_rib.insert(patched);
                    self.fix_path(asn, prefix, &new_path);
                }
            }
        }
    }

    /// Two full ascending passes over the ranked DAG: pass one exports to
    /// providers, pass two (a completely separate sweep) exports to peers.
    pub fn propagate_up(&mut self) {
        let ranks = self.as_graph.propagation_ranks.clone();

        for rank_asns in ranks.iter() {
            for &asn in rank_asns {
                self.process_incoming(asn);
            }
            for &asn in rank_asns {
                self.send_all_announcements(asn, true, false, false);
            }
        }

        for rank_asns in ranks.iter() {
            for &asn in rank_asns {
                self.process_incoming(asn);
            }
            for &asn in rank_asns {
                self.send_all_announcements(asn, false, true, false);
            }
        }
    }

    /// One descending pass: every Loc-RIB entry propagates to customers.
    pub fn propagate_down(&mut self) {
        let ranks = self.as_graph.propagation_ranks.clone();
        for rank_asns in ranks.iter().rev() {
            for &asn in rank_asns {
                self.process_incoming(asn);
            }
            for &asn in rank_asns {
                self.send_all_announcements(asn, false, false, true);
            }
        }
    }

    /// Drain the Adj-RIB-In queue: monitor-flagged entries are left untouched
    /// (invariant I2), everything else competes against the current best via
    /// the AS's policy. A rejected ROV++ attacker route may synthesize a
    /// blackhole or poison the delivering neighbor instead of being simply
    /// dropped; a withdrawal removes a matching Loc-RIB entry and keeps
    /// propagating outward.
    fn process_incoming(&mut self, asn: ASN) {
        let Some(state) = self.states.get_mut(&asn) else { return };
        let incoming: Vec<Announcement> = state.incoming.drain(..).collect();
        let as_obj = match self.as_graph.get(&asn) {
            Some(a) => a.clone(),
            None => return,
        };

        let mut withdrawals_to_propagate: Vec<Prefix> = Vec::new();
        let mut preventive_to_install: Vec<Prefix> = Vec::new();

        for ann in incoming {
            if ann.withdraw {
                let Some(state) = self.states.get_mut(&asn) else { continue };
                let matches_current = state
                    .loc_rib
                    .get(&ann.prefix)
                    .map(|cur| cur.received_from_asn == ann.received_from_asn)
                    .unwrap_or(false);
                if matches_current {
                    state.loc_rib.remove(&ann.prefix);
                    self.graph_changed = true;
                    withdrawals_to_propagate.push(ann.prefix);
                }
                continue;
            }

            let Some(state) = self.states.get_mut(&asn) else { continue };
            if !state.policy.accepts(&ann, &as_obj) {
                state.failed_rov.insert(ann.prefix);
                if let Some(variant) = state.policy.rovpp_variant() {
                    match variant {
                        RovPpVariant::V0 => {
                            state
                                .poisoned_neighbors
                                .entry(ann.prefix)
                                .or_default()
                                .insert(ann.received_from_asn);
                            self.graph_changed = true;
                        }
                        RovPpVariant::V0_1 | RovPpVariant::V0_2 | RovPpVariant::V0_3 => {
                            if state.loc_rib.get(&ann.prefix).is_none() {
                                if let Some(blackhole) = state.policy.on_rov_reject(&ann) {
                                    state.blackholes.insert(blackhole.clone());
                                    state.loc_rib.insert(blackhole);
                                    self.graph_changed = true;
                                }
                            }
                            if variant == RovPpVariant::V0_3 {
                                preventive_to_install.push(ann.prefix);
                            }
                        }
                    }
                }
                continue;
            }
            state.passed_rov.insert(ann.prefix);

            match state.loc_rib.get(&ann.prefix) {
                None => {
                    state.loc_rib.insert(ann);
                    self.graph_changed = true;
                }
                Some(cur) if cur.from_monitor => {
                    // monitor-seeded best routes are never overwritten by propagation.
                }
                Some(cur) => {
                    if state.policy.prefers_new(&ann, cur, asn, self.random_tiebreak) {
                        if self.store_depref {
                            state.depref_rib.insert(cur.clone());
                        }
                        state.loc_rib.insert(ann);
                        self.graph_changed = true;
                    } else if self.store_depref {
                        state.depref_rib.insert(ann);
                    }
                }
            }
        }

        for prefix in withdrawals_to_propagate {
            self.broadcast_withdrawal(asn, prefix);
        }
        for prefix in preventive_to_install {
            self.install_preventive_routes(asn, prefix);
        }
    }

    /// Tell every neighbor of `asn` to drop their route for `prefix` if they
    /// learned it from `asn`; each recipient that acts on it keeps
    /// propagating the same notice outward on its next `process_incoming`.
    fn broadcast_withdrawal(&mut self, asn: ASN, prefix: Prefix) {
        let Some(as_obj) = self.as_graph.get(&asn).cloned() else { return };
        let notice = Announcement::withdrawal(prefix, asn);
        for neighbor in as_obj.providers.iter().chain(&as_obj.peers).chain(&as_obj.customers) {
            if let Some(neighbor_state) = self.states.get_mut(neighbor) {
                neighbor_state.queue_incoming(notice.clone());
            }
        }
    }

    /// v0.3: announce the two more-specific halves of a blackholed prefix as
    /// clean routes, so customers prefer the covering, uncontaminated copy
    /// over the attacker's announcement for the wider prefix.
    fn install_preventive_routes(&mut self, asn: ASN, prefix: Prefix) {
        if prefix.prefix_len() >= 32 {
            return;
        }
        let new_len = prefix.prefix_len() + 1;
        let left = Prefix::from_length(prefix.address, new_len);
        let bit = 1u32 << (32 - new_len as u32);
        let right = Prefix::from_length(prefix.address | bit, new_len);

        let Some(state) = self.states.get_mut(&asn) else { return };
        for sub in [left, right] {
            if state.loc_rib.get(&sub).is_some() {
                continue;
            }
            let preventive = Announcement {
                prefix: sub,
                origin: CLEAN_ORIGIN_ASN,
                received_from_asn: SELF_SEED_ASN,
                priority: 300,
                tstamp: NO_TIMESTAMP,
                from_monitor: false,
                as_path: vec![asn],
                withdraw: false,
            };
            state.loc_rib.insert(preventive);
            self.graph_changed = true;
        }
    }

    /// Export synthesis, grounded on `send_all_announcements`: a priority
    /// filter of `>= 200` gates both non-customer export directions, the
    /// customer direction carries every Loc-RIB entry unfiltered, and every
    /// exported announcement's path-length weight is recomputed for the
    /// receiving relationship's base.
    fn send_all_announcements(&mut self, asn: ASN, to_providers: bool, to_peers: bool, to_customers: bool) {
        let Some(as_obj) = self.as_graph.get(&asn).cloned() else { return };
        let entries: Vec<Announcement> = match self.states.get(&asn) {
            Some(s) => s.loc_rib.iter().map(|(_, a)| a.clone()).collect(),
            None => return,
        };

        let mut deliveries: Vec<(ASN, Announcement)> = Vec::new();

        for ann in &entries {
            let weight = ann.next_path_len_weight();
            let poisoned = self
                .states
                .get(&asn)
                .and_then(|s| s.poisoned_neighbors.get(&ann.prefix))
                .cloned()
                .unwrap_or_default();

            if to_providers && ann.priority >= 200 {
                if !self.suppressed(asn, ann, Relationships::Providers) {
                    let exported = Self::with_priority(ann, asn, 200 + weight);
                    for &neighbor in &as_obj.providers {
                        if !poisoned.contains(&neighbor) {
                            deliveries.push((neighbor, exported.clone()));
                        }
                    }
                }
            }
            if to_peers && ann.priority >= 200 {
                if !self.suppressed(asn, ann, Relationships::Peers) {
                    let exported = Self::with_priority(ann, asn, 100 + weight);
                    for &neighbor in &as_obj.peers {
                        if !poisoned.contains(&neighbor) {
                            deliveries.push((neighbor, exported.clone()));
                        }
                    }
                }
            }
            if to_customers {
                if !self.suppressed(asn, ann, Relationships::Customers) {
                    let exported = Self::with_priority(ann, asn, weight);
                    for &neighbor in &as_obj.customers {
                        if !poisoned.contains(&neighbor) {
                            deliveries.push((neighbor, exported.clone()));
                        }
                    }
                }
            }
        }

        for (neighbor, ann) in deliveries {
            if let Some(neighbor_state) = self.states.get_mut(&neighbor) {
                neighbor_state.queue_incoming(ann);
            }
        }
    }

    fn suppressed(&self, asn: ASN, ann: &Announcement, to: Relationships) -> bool {
        self.states
            .get(&asn)
            .map(|s| s.policy.suppress_export(ann, to))
            .unwrap_or(false)
    }

    fn with_priority(ann: &Announcement, sender: ASN, priority: u32) -> Announcement {
        let mut out = ann.clone();
        out.received_from_asn = sender;
        out.priority = priority;
        out.from_monitor = false;
        if !out.as_path.contains(&sender) {
            out.as_path.insert(0, sender);
        }
        out
    }

    /// Run the full intake → up → down cycle for one prefix block's seeds,
    /// then collect every AS's selected route, reattaching any elided stubs
    /// with their parent's selection. ROV++ settings repeat the up/down
    /// cycle until a full pass leaves the graph unchanged (blackhole
    /// installs, poisoned-neighbor filtering, and withdrawals can all still
    /// be rippling outward after the first pass), bounded to
    /// `MAX_ROVPP_ITERATIONS`.
    pub fn run_block(&mut self, rows: &[SeedRow]) -> Vec<ResultRow> {
        self.clear_for_next_block();
        self.seed_block(rows);

        if self.is_rovpp() {
            for _ in 0..MAX_ROVPP_ITERATIONS {
                self.graph_changed = false;
                self.propagate_up();
                self.propagate_down();
                if !self.graph_changed {
                    break;
                }
            }
        } else {
            self.propagate_up();
            self.propagate_down();
        }

        self.collect_results()
    }

    fn collect_results(&self) -> Vec<ResultRow> {
        let mut out = Vec::new();
        for (&asn, state) in &self.states {
            for (_, ann) in state.loc_rib.iter() {
                out.push(announcement_to_result_row(asn, ann));
            }
        }
        for (&stub_asn, &parent) in &self.as_graph.stubs_to_parents {
            if let Some(parent_state) = self.states.get(&parent) {
                for (_, ann) in parent_state.loc_rib.iter() {
                    let mut row = announcement_to_result_row(stub_asn, ann);
                    row.received_from_asn = parent;
                    out.push(row);
                }
            }
        }
        out
    }

    /// Drive a full run across every block the adapter reports, streaming
    /// results back through the adapter after each block.
    pub fn run<A: Adapter>(&mut self, adapter: &mut A, root: Prefix, iteration_size: usize) -> Result<RunStats, crate::adapter::AdapterError> {
        let blocks = crate::block_planner::plan_blocks(
            root,
            iteration_size,
            &|p| adapter.count_seeds_under(p).unwrap_or(0),
            &|p| adapter.count_seeds_exact(p).unwrap_or(0),
        );

        for (iteration, block) in blocks.iter().enumerate() {
            let target = match block {
                crate::block_planner::Block::Subnet(p) => *p,
                crate::block_planner::Block::Prefix(p) => *p,
            };
            let rows = adapter.load_seeds(&target)?;
            let results = self.run_block(&rows);
            adapter.store_results(iteration as u64, &results)?;
            if self.store_depref {
                let depref_rows: Vec<ResultRow> = self
                    .states
                    .iter()
                    .flat_map(|(&asn, s)| {
                        s.depref_rib
                            .iter()
                            .map(move |(_, a)| announcement_to_result_row(asn, a))
                    })
                    .collect();
                adapter.store_depref_results(iteration as u64, &depref_rows)?;
            }
        }

        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryAdapter;
    use crate::as_graph::AS;

    fn two_as_provider_customer_graph() -> ASGraph {
        let mut g = ASGraph::new();
        g.insert(AS::new(1));
        g.insert(AS::new(2));
        g.add_provider_customer_edge(1, 2);
        g.assign_as_propagation_rank();
        g
    }

    #[test]
    fn origin_announcement_propagates_to_provider() {
        let graph = two_as_provider_customer_graph();
        let rv = Arc::new(RouteValidator::new());
        let mut engine = PropagationEngine::new(graph, Settings::BaseDefense, false, false, rv);

        let prefix: Prefix = "1.2.3.0/24".parse().unwrap();
        let rows = vec![SeedRow {
            prefix,
            origin: 2,
            as_path: vec![2],
            timestamp: 0,
        }];

        let results = engine.run_block(&rows);
        let provider_result = results.iter().find(|r| r.asn == 1);
        assert!(provider_result.is_some());
        assert_eq!(provider_result.unwrap().origin, 2);
    }

    #[test]
    fn in_memory_adapter_round_trip_via_run() {
        let graph = two_as_provider_customer_graph();
        let rv = Arc::new(RouteValidator::new());
        let mut engine = PropagationEngine::new(graph, Settings::BaseDefense, false, false, rv);

        let mut adapter = InMemoryAdapter::new();
        let prefix: Prefix = "1.2.3.0/24".parse().unwrap();
        adapter.seeds.push(SeedRow {
            prefix,
            origin: 2,
            as_path: vec![2],
            timestamp: 0,
        });

        let root: Prefix = "0.0.0.0/0".parse().unwrap();
        let stats = engine.run(&mut adapter, root, 10_000).unwrap();
        assert!(stats.announcement_count >= 1);
        assert!(!adapter.results.is_empty());
    }
}
