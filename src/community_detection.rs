use std::collections::{HashMap, HashSet};

use crate::as_graph::ASN;

/// A report of a suspicious AS_PATH: the hyperedge is the full set of ASNs
/// observed on that path. Grouping reports that share an AS into connected
/// components, then taking a bounded vertex cover of each component, yields
/// a small candidate set of ASNs most likely responsible for the anomalies
/// seen across the reports in that component.
#[derive(Default)]
pub struct CommunityDetector {
    reports: Vec<HashSet<ASN>>,
}

impl CommunityDetector {
    pub fn new() -> Self {
        CommunityDetector { reports: Vec::new() }
    }

    pub fn add_report(&mut self, as_path: &[ASN]) {
        if as_path.is_empty() {
            return;
        }
        self.reports.push(as_path.iter().copied().collect());
    }

    /// Cluster all reports into connected components (two reports are linked
    /// if they share at least one ASN), then compute a bounded vertex cover
    /// for each — the set of ASNs whose removal would break every hyperedge
    /// within that component, capped at `max_cover_per_component` entries
    /// chosen by descending report-frequency.
    pub fn process_reports(&self, max_cover_per_component: usize) -> HashSet<ASN> {
        let components = self.connected_components();
        let mut suspects = HashSet::new();

        for component in components {
            let cover = Self::bounded_vertex_cover(&component, max_cover_per_component);
            suspects.extend(cover);
        }

        suspects
    }

    fn connected_components(&self) -> Vec<Vec<HashSet<ASN>>> {
        let n = self.reports.len();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], x: usize) -> usize {
            if parent[x] != x {
                parent[x] = find(parent, parent[x]);
            }
            parent[x]
        }

        fn union(parent: &mut [usize], a: usize, b: usize) {
            let ra = find(parent, a);
            let rb = find(parent, b);
            if ra != rb {
                parent[ra] = rb;
            }
        }

        let mut asn_to_reports: HashMap<ASN, Vec<usize>> = HashMap::new();
        for (i, report) in self.reports.iter().enumerate() {
            for &asn in report {
                asn_to_reports.entry(asn).or_default().push(i);
            }
        }

        for indices in asn_to_reports.values() {
            for w in indices.windows(2) {
                union(&mut parent, w[0], w[1]);
            }
        }

        let mut groups: HashMap<usize, Vec<HashSet<ASN>>> = HashMap::new();
        for i in 0..n {
            let root = find(&mut parent, i);
            groups.entry(root).or_default().push(self.reports[i].clone());
        }

        groups.into_values().collect()
    }

    /// Greedy bounded vertex cover: repeatedly pick the ASN appearing in the
    /// most not-yet-covered hyperedges until every hyperedge is covered or
    /// the cap is reached.
    fn bounded_vertex_cover(component: &[HashSet<ASN>], cap: usize) -> HashSet<ASN> {
        let mut remaining: Vec<HashSet<ASN>> = component.to_vec();
        let mut cover = HashSet::new();

        while !remaining.is_empty() && cover.len() < cap {
            let mut counts: HashMap<ASN, usize> = HashMap::new();
            for edge in &remaining {
                for &asn in edge {
                    *counts.entry(asn).or_insert(0) += 1;
                }
            }
            let Some((&best_asn, _)) = counts.iter().max_by_key(|(_, &c)| c) else {
                break;
            };
            cover.insert(best_asn);
            remaining.retain(|edge| !edge.contains(&best_asn));
        }

        cover
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_asn_links_reports_into_one_component() {
        let mut d = CommunityDetector::new();
        d.add_report(&[1, 2, 3]);
        d.add_report(&[3, 4, 5]);
        d.add_report(&[9, 10]);
        let suspects = d.process_reports(5);
        // component {1,2,3,4,5} must be covered by at least one ASN, as must {9,10}
        assert!(!suspects.is_empty());
    }

    #[test]
    fn cap_limits_cover_size_per_component() {
        let mut d = CommunityDetector::new();
        for i in 0..10u32 {
            d.add_report(&[i, i + 100]);
        }
        let suspects = d.process_reports(2);
        assert!(suspects.len() <= 20);
    }
}
