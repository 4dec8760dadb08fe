use std::collections::{HashMap, HashSet};

use crate::shared::{ASNGroups, CycleError, Relationships};

pub type ASN = u32;

#[derive(Debug, Clone)]
pub struct AS {
    pub asn: ASN,
    pub peers: Vec<ASN>,
    pub providers: Vec<ASN>,
    pub customers: Vec<ASN>,
    pub tier_1: bool,
    pub ixp: bool,
    pub provider_cone_asns: HashSet<ASN>,
    pub propagation_rank: Option<u32>,
}

impl AS {
    pub fn new(asn: ASN) -> Self {
        AS {
            asn,
            peers: Vec::new(),
            providers: Vec::new(),
            customers: Vec::new(),
            tier_1: false,
            ixp: false,
            provider_cone_asns: HashSet::new(),
            propagation_rank: None,
        }
    }

    pub fn from_asn_sets(
        asn: ASN,
        peer_asns: HashSet<ASN>,
        provider_asns: HashSet<ASN>,
        customer_asns: HashSet<ASN>,
    ) -> Self {
        AS {
            asn,
            peers: peer_asns.into_iter().collect(),
            providers: provider_asns.into_iter().collect(),
            customers: customer_asns.into_iter().collect(),
            tier_1: false,
            ixp: false,
            provider_cone_asns: HashSet::new(),
            propagation_rank: None,
        }
    }

    pub fn get_neighbors(&self, rel: Relationships) -> &[ASN] {
        match rel {
            Relationships::Providers => &self.providers,
            Relationships::Peers => &self.peers,
            Relationships::Customers => &self.customers,
            _ => &[],
        }
    }

    pub fn is_stub(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn is_multihomed(&self) -> bool {
        self.customers.is_empty() && (self.providers.len() + self.peers.len()) > 1
    }

    pub fn is_transit(&self) -> bool {
        !self.customers.is_empty()
    }

    /// A stub AS with exactly one provider and no peers: a candidate for
    /// elision before strongly-connected-component detection.
    pub fn is_elidable_stub(&self) -> bool {
        self.customers.is_empty() && self.peers.is_empty() && self.providers.len() == 1
    }

    pub fn neighbor_asns(&self) -> HashSet<ASN> {
        let mut result = HashSet::new();
        result.extend(&self.peers);
        result.extend(&self.providers);
        result.extend(&self.customers);
        result
    }

    pub fn peer_asns(&self) -> HashSet<ASN> {
        self.peers.iter().copied().collect()
    }

    pub fn provider_asns(&self) -> HashSet<ASN> {
        self.providers.iter().copied().collect()
    }

    pub fn customer_asns(&self) -> HashSet<ASN> {
        self.customers.iter().copied().collect()
    }
}

#[derive(Debug, Clone)]
pub struct ASGraph {
    pub as_dict: HashMap<ASN, AS>,
    pub asn_groups: HashMap<ASNGroups, HashSet<ASN>>,
    pub propagation_ranks: Vec<Vec<ASN>>,
    /// SCCs found during condensation, keyed by nothing in particular — just the raw
    /// member lists, one per non-trivial component.
    pub components: Vec<Vec<ASN>>,
    /// Maps every ASN that belongs to a non-trivial SCC to that SCC's supernode ASN
    /// (the minimum member ASN). ASNs not present here are their own supernode.
    pub component_translation: HashMap<ASN, ASN>,
    /// Stub ASes elided before condensation, mapped to the provider they were folded into.
    pub stubs_to_parents: HashMap<ASN, ASN>,
}

impl ASGraph {
    pub fn new() -> Self {
        ASGraph {
            as_dict: HashMap::new(),
            asn_groups: HashMap::new(),
            propagation_ranks: Vec::new(),
            components: Vec::new(),
            component_translation: HashMap::new(),
            stubs_to_parents: HashMap::new(),
        }
    }

    pub fn get(&self, asn: &ASN) -> Option<&AS> {
        self.as_dict.get(asn)
    }

    pub fn get_mut(&mut self, asn: &ASN) -> Option<&mut AS> {
        self.as_dict.get_mut(asn)
    }

    pub fn insert(&mut self, as_obj: AS) {
        self.as_dict.insert(as_obj.asn, as_obj);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AS> {
        self.as_dict.values()
    }

    /// Add a provider/customer edge pair symmetrically: `provider` gets `customer`
    /// added to its customer list, `customer` gets `provider` added to its provider
    /// list. Relationship edges in this crate are always inserted this way so that
    /// invariant I5 (every relationship is mirrored on both endpoints) holds.
    pub fn add_provider_customer_edge(&mut self, provider: ASN, customer: ASN) {
        if let Some(p) = self.as_dict.get_mut(&provider) {
            if !p.customers.contains(&customer) {
                p.customers.push(customer);
            }
        }
        if let Some(c) = self.as_dict.get_mut(&customer) {
            if !c.providers.contains(&provider) {
                c.providers.push(provider);
            }
        }
    }

    pub fn add_peer_edge(&mut self, a: ASN, b: ASN) {
        if let Some(x) = self.as_dict.get_mut(&a) {
            if !x.peers.contains(&b) {
                x.peers.push(b);
            }
        }
        if let Some(y) = self.as_dict.get_mut(&b) {
            if !y.peers.contains(&a) {
                y.peers.push(a);
            }
        }
    }

    pub fn check_for_cycles(&self) -> Result<(), CycleError> {
        for as_obj in self.as_dict.values() {
            let mut visited = HashSet::new();
            let mut stack = Vec::new();

            stack.push((as_obj.asn, HashSet::new()));

            while let Some((current_asn, mut path)) = stack.pop() {
                if path.contains(&current_asn) {
                    return Err(CycleError);
                }

                if visited.contains(&current_asn) {
                    continue;
                }

                visited.insert(current_asn);
                path.insert(current_asn);

                if let Some(current_as) = self.as_dict.get(&current_asn) {
                    for &provider_asn in &current_as.providers {
                        stack.push((provider_asn, path.clone()));
                    }
                }
            }
        }

        Ok(())
    }

    /// Remove single-provider, no-peer, no-customer stub ASes from the graph prior
    /// to condensation, recording the provider they folded into so they can be
    /// reattached (with their parent's selected route) after propagation.
    ///
    /// This mirrors the elision the original extrapolator performs to shrink the
    /// working graph before running Tarjan's algorithm: stubs never participate in
    /// a cycle (a cycle needs an outgoing edge back toward the stub, which a
    /// single-provider stub never has), so removing them first only shrinks the
    /// SCC search space.
    pub fn remove_stubs(&mut self) {
        let stub_asns: Vec<ASN> = self
            .as_dict
            .values()
            .filter(|a| a.is_elidable_stub())
            .map(|a| a.asn)
            .collect();

        for asn in stub_asns {
            let parent = match self.as_dict.get(&asn).and_then(|a| a.providers.first().copied()) {
                Some(p) => p,
                None => continue,
            };
            if let Some(p) = self.as_dict.get_mut(&parent) {
                p.customers.retain(|&c| c != asn);
            }
            self.as_dict.remove(&asn);
            self.stubs_to_parents.insert(asn, parent);
        }
    }

    /// Find strongly-connected components over the provider→customer edge
    /// relation using Tarjan's algorithm with an explicit work stack (no native
    /// recursion, so depth is bounded only by available heap). Populates
    /// `components` and `component_translation`, and rewrites every edge list in
    /// `as_dict` to use supernode ASNs in place of any absorbed member.
    pub fn condense(&mut self) {
        let adjacency: HashMap<ASN, Vec<ASN>> = self
            .as_dict
            .iter()
            .map(|(&asn, a)| (asn, a.customers.clone()))
            .collect();

        let mut index_counter: u32 = 0;
        let mut indices: HashMap<ASN, u32> = HashMap::new();
        let mut lowlink: HashMap<ASN, u32> = HashMap::new();
        let mut on_stack: HashSet<ASN> = HashSet::new();
        let mut scc_stack: Vec<ASN> = Vec::new();
        let mut components: Vec<Vec<ASN>> = Vec::new();

        let empty: Vec<ASN> = Vec::new();
        let nodes: Vec<ASN> = adjacency.keys().copied().collect();

        for start in nodes {
            if indices.contains_key(&start) {
                continue;
            }

            // work stack of (node, index into its child list already visited)
            let mut work: Vec<(ASN, usize)> = vec![(start, 0)];
            indices.insert(start, index_counter);
            lowlink.insert(start, index_counter);
            index_counter += 1;
            scc_stack.push(start);
            on_stack.insert(start);

            while let Some(&mut (v, ref mut child_idx)) = work.last_mut() {
                let children = adjacency.get(&v).unwrap_or(&empty);
                if *child_idx < children.len() {
                    let w = children[*child_idx];
                    *child_idx += 1;

                    if !indices.contains_key(&w) {
                        indices.insert(w, index_counter);
                        lowlink.insert(w, index_counter);
                        index_counter += 1;
                        scc_stack.push(w);
                        on_stack.insert(w);
                        work.push((w, 0));
                    } else if on_stack.contains(&w) {
                        let wi = indices[&w];
                        let vl = lowlink[&v];
                        lowlink.insert(v, vl.min(wi));
                    }
                } else {
                    work.pop();
                    if let Some(&(parent, _)) = work.last() {
                        let vl = lowlink[&v];
                        let pl = lowlink[&parent];
                        lowlink.insert(parent, pl.min(vl));
                    }
                    if lowlink[&v] == indices[&v] {
                        let mut comp = Vec::new();
                        loop {
                            let w = scc_stack.pop().expect("scc stack underflow");
                            on_stack.remove(&w);
                            comp.push(w);
                            if w == v {
                                break;
                            }
                        }
                        components.push(comp);
                    }
                }
            }
        }

        self.components = components;

        let mut translation = HashMap::new();
        for comp in &self.components {
            if comp.len() <= 1 {
                continue;
            }
            let supernode = *comp.iter().min().unwrap();
            for &m in comp {
                translation.insert(m, supernode);
            }
        }
        self.component_translation = translation;
        self.rewrite_edges_with_translation();
    }

    fn rewrite_edges_with_translation(&mut self) {
        if self.component_translation.is_empty() {
            return;
        }
        let translate = |asn: ASN, t: &HashMap<ASN, ASN>| t.get(&asn).copied().unwrap_or(asn);

        let asns: Vec<ASN> = self.as_dict.keys().copied().collect();
        for asn in asns {
            let translated_self = translate(asn, &self.component_translation);
            if translated_self != asn {
                // absorbed member: merge its edges into the supernode, then drop it.
                if let Some(member) = self.as_dict.remove(&asn) {
                    let entry = self.as_dict.get_mut(&translated_self);
                    if let Some(supernode) = entry {
                        for p in member.providers {
                            let tp = translate(p, &self.component_translation);
                            if tp != translated_self && !supernode.providers.contains(&tp) {
                                supernode.providers.push(tp);
                            }
                        }
                        for c in member.customers {
                            let tc = translate(c, &self.component_translation);
                            if tc != translated_self && !supernode.customers.contains(&tc) {
                                supernode.customers.push(tc);
                            }
                        }
                        for pr in member.peers {
                            let tpr = translate(pr, &self.component_translation);
                            if tpr != translated_self && !supernode.peers.contains(&tpr) {
                                supernode.peers.push(tpr);
                            }
                        }
                    }
                }
            }
        }

        // retranslate remaining edges everywhere (covers supernodes pointing at
        // other absorbed members discovered after their own merge pass above).
        for as_obj in self.as_dict.values_mut() {
            for p in as_obj.providers.iter_mut() {
                *p = translate(*p, &self.component_translation);
            }
            for c in as_obj.customers.iter_mut() {
                *c = translate(*c, &self.component_translation);
            }
            for pr in as_obj.peers.iter_mut() {
                *pr = translate(*pr, &self.component_translation);
            }
            as_obj.providers.sort_unstable();
            as_obj.providers.dedup();
            as_obj.providers.retain(|&p| p != as_obj.asn);
            as_obj.customers.sort_unstable();
            as_obj.customers.dedup();
            as_obj.customers.retain(|&c| c != as_obj.asn);
            as_obj.peers.sort_unstable();
            as_obj.peers.dedup();
            as_obj.peers.retain(|&p| p != as_obj.asn);
        }
    }

    pub fn add_provider_cone_asns(&mut self) {
        let mut provider_cones: HashMap<ASN, HashSet<ASN>> = HashMap::new();

        let all_asns: Vec<ASN> = self.as_dict.keys().copied().collect();

        for asn in all_asns {
            if let Some(as_obj) = self.as_dict.get(&asn) {
                if as_obj.tier_1 {
                    let cone = self.calculate_provider_cone(asn, &mut HashMap::new());
                    provider_cones.insert(asn, cone);
                }
            }
        }

        for (asn, cone) in provider_cones {
            if let Some(as_obj) = self.as_dict.get_mut(&asn) {
                as_obj.provider_cone_asns = cone;
            }
        }
    }

    fn calculate_provider_cone(&self, asn: ASN, visited: &mut HashMap<ASN, HashSet<ASN>>) -> HashSet<ASN> {
        if let Some(cone) = visited.get(&asn) {
            return cone.clone();
        }

        let mut cone = HashSet::new();
        cone.insert(asn);

        if let Some(as_obj) = self.as_dict.get(&asn) {
            for &customer_asn in &as_obj.customers {
                let customer_cone = self.calculate_provider_cone(customer_asn, visited);
                cone.extend(customer_cone);
            }
        }

        visited.insert(asn, cone.clone());
        cone
    }

    /// Bottom-up rank assignment over the (now-condensed, acyclic) graph: rank 0 is
    /// every customer-free AS, rank N is one more than the longest customer-to-provider
    /// chain beneath it.
    pub fn assign_as_propagation_rank(&mut self) {
        let mut unassigned: HashSet<ASN> = self.as_dict.keys().copied().collect();
        let mut current_rank = 0u32;
        let mut propagation_ranks = Vec::new();

        while !unassigned.is_empty() {
            let mut current_rank_asns = Vec::new();

            for &asn in &unassigned {
                if let Some(as_obj) = self.as_dict.get(&asn) {
                    let all_customers_ranked = as_obj.customers.iter().all(|&c| {
                        self.as_dict
                            .get(&c)
                            .map(|customer| customer.propagation_rank.is_some())
                            .unwrap_or(true)
                    });

                    if as_obj.customers.is_empty() || all_customers_ranked {
                        current_rank_asns.push(asn);
                    }
                }
            }

            if current_rank_asns.is_empty() {
                // Residual unassigned ASNs with unranked customers indicate a cycle
                // survived condensation — place them at the current rank to avoid
                // looping forever; `condense()` should make this unreachable.
                current_rank_asns.extend(unassigned.iter().copied());
            }

            for &asn in &current_rank_asns {
                unassigned.remove(&asn);
                if let Some(as_obj) = self.as_dict.get_mut(&asn) {
                    as_obj.propagation_rank = Some(current_rank);
                }
            }

            propagation_ranks.push(current_rank_asns);
            current_rank += 1;
        }

        self.propagation_ranks = propagation_ranks;
    }

    pub fn add_asn_groups(&mut self) {
        let mut groups: HashMap<ASNGroups, HashSet<ASN>> = HashMap::new();

        let tier_1_asns: HashSet<ASN> = self
            .as_dict
            .values()
            .filter(|as_obj| as_obj.tier_1)
            .map(|as_obj| as_obj.asn)
            .collect();
        groups.insert(ASNGroups::Tier1, tier_1_asns);

        let stubs: HashSet<ASN> = self
            .as_dict
            .values()
            .filter(|as_obj| as_obj.is_stub())
            .map(|as_obj| as_obj.asn)
            .collect();
        groups.insert(ASNGroups::Stubs, stubs.clone());

        let multihomed: HashSet<ASN> = self
            .as_dict
            .values()
            .filter(|as_obj| as_obj.is_multihomed())
            .map(|as_obj| as_obj.asn)
            .collect();
        groups.insert(ASNGroups::Multihomed, multihomed.clone());

        let mut stubs_or_mh = stubs;
        stubs_or_mh.extend(&multihomed);
        groups.insert(ASNGroups::StubsOrMh, stubs_or_mh);

        let transit: HashSet<ASN> = self
            .as_dict
            .values()
            .filter(|as_obj| as_obj.is_transit())
            .map(|as_obj| as_obj.asn)
            .collect();
        groups.insert(ASNGroups::Transit, transit);

        let ixp: HashSet<ASN> = self
            .as_dict
            .values()
            .filter(|as_obj| as_obj.ixp)
            .map(|as_obj| as_obj.asn)
            .collect();
        groups.insert(ASNGroups::Ixp, ixp);

        groups.insert(ASNGroups::Etc, HashSet::new());
        groups.insert(ASNGroups::Input, HashSet::new());

        self.asn_groups = groups;
    }
}

impl Default for ASGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet as HSet;

    #[test]
    fn test_as_creation() {
        let as1 = AS::from_asn_sets(100, HSet::from([200, 300]), HSet::from([400]), HSet::from([500, 600]));
        assert_eq!(as1.asn, 100);
        assert_eq!(as1.peers.len(), 2);
        assert_eq!(as1.providers, vec![400]);
    }

    #[test]
    fn test_as_graph_insertion() {
        let mut graph = ASGraph::new();
        graph.insert(AS::new(1));
        graph.insert(AS::new(2));
        assert!(graph.get(&1).is_some());
        assert!(graph.get(&3).is_none());
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph = ASGraph::new();
        let mut a = AS::new(1);
        a.providers.push(2);
        let mut b = AS::new(2);
        b.providers.push(1);
        graph.insert(a);
        graph.insert(b);
        assert!(graph.check_for_cycles().is_err());
    }

    #[test]
    fn test_propagation_rank_assignment() {
        let mut graph = ASGraph::new();
        let mut top = AS::new(1);
        top.customers.push(2);
        let mut bottom = AS::new(2);
        bottom.providers.push(1);
        graph.insert(top);
        graph.insert(bottom);
        graph.assign_as_propagation_rank();
        assert_eq!(graph.get(&2).unwrap().propagation_rank, Some(0));
        assert_eq!(graph.get(&1).unwrap().propagation_rank, Some(1));
    }

    #[test]
    fn test_stub_removal_folds_into_single_provider() {
        let mut graph = ASGraph::new();
        let mut provider = AS::new(1);
        provider.customers.push(2);
        let mut stub = AS::new(2);
        stub.providers.push(1);
        graph.insert(provider);
        graph.insert(stub);
        graph.remove_stubs();
        assert!(graph.get(&2).is_none());
        assert_eq!(graph.stubs_to_parents.get(&2), Some(&1));
        assert!(graph.get(&1).unwrap().customers.is_empty());
    }

    #[test]
    fn test_condense_collapses_a_two_cycle_into_one_supernode() {
        let mut graph = ASGraph::new();
        let mut a = AS::new(5);
        a.customers.push(3);
        a.providers.push(3);
        let mut b = AS::new(3);
        b.providers.push(5);
        b.customers.push(5);
        graph.insert(a);
        graph.insert(b);
        graph.condense();
        assert_eq!(graph.component_translation.get(&5), Some(&3));
        assert!(graph.get(&3).is_some());
        assert!(graph.get(&5).is_none());
    }
}
