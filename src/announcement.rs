use std::collections::HashMap;

use crate::as_graph::ASN;
use crate::prefix::Prefix;

/// Sentinel `received_from_asn` values for seeded or synthetic announcements.
pub const SELF_SEED_ASN: ASN = 300;
pub const BLACKHOLE_ASN: ASN = 64512;
pub const ATTACKER_ORIGIN_ASN: ASN = 64513;
pub const CLEAN_ORIGIN_ASN: ASN = 64514;
pub const PREVENTIVE_HIJACK_ASN: ASN = 64515;
pub const PREVENTIVE_HIJACK_ALT_ASN: ASN = 64516;
pub const ATTACKER_SEEN_FLAG_ASN: ASN = 64570;

/// An empty/placeholder timestamp slot.
pub const NO_TIMESTAMP: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub prefix: Prefix,
    pub origin: ASN,
    pub received_from_asn: ASN,
    pub priority: u32,
    pub tstamp: i64,
    pub from_monitor: bool,
    pub as_path: Vec<ASN>,
    /// True for a synthesized copy that tells a recipient to remove a
    /// previously-received route for `prefix` rather than install one.
    pub withdraw: bool,
}

impl Announcement {
    pub fn seed_from_monitor(prefix: Prefix, origin: ASN, as_path: Vec<ASN>, tstamp: i64) -> Self {
        Announcement {
            prefix,
            origin,
            received_from_asn: SELF_SEED_ASN,
            priority: 400,
            tstamp,
            from_monitor: true,
            as_path,
            withdraw: false,
        }
    }

    pub fn origin_seed(prefix: Prefix, origin: ASN, tstamp: i64) -> Self {
        Announcement {
            prefix,
            origin,
            received_from_asn: SELF_SEED_ASN,
            priority: 400,
            tstamp,
            from_monitor: true,
            as_path: vec![origin],
            withdraw: false,
        }
    }

    /// A withdrawal notice for `prefix`, attributed to `received_from_asn` so
    /// a recipient only acts on it if that matches the neighbor it actually
    /// learned its current route from.
    pub fn withdrawal(prefix: Prefix, received_from_asn: ASN) -> Self {
        Announcement {
            prefix,
            origin: 0,
            received_from_asn,
            priority: 0,
            tstamp: NO_TIMESTAMP,
            from_monitor: false,
            as_path: Vec::new(),
            withdraw: true,
        }
    }

    /// Length of the path-weighted low two digits of the priority, treating a stored
    /// zero (the origin-seed wraparound at priority 400) as 99 before decrementing,
    /// matching the original extrapolator's recompute step.
    pub fn next_path_len_weight(&self) -> u32 {
        let w = self.priority % 100;
        if w == 0 {
            99
        } else {
            w - 1
        }
    }

    pub fn path_contains(&self, asn: ASN) -> bool {
        self.as_path.contains(&asn)
    }

    pub fn prepends_at(&self, hop_index_from_end: usize) -> bool {
        let len = self.as_path.len();
        if hop_index_from_end == 0 || hop_index_from_end >= len {
            return false;
        }
        self.as_path[len - hop_index_from_end] == self.as_path[len - hop_index_from_end - 1]
    }
}

/// Per-AS bounded store: at most one announcement per prefix.
#[derive(Debug, Clone, Default)]
pub struct PrefixAnnouncementMap {
    inner: HashMap<Prefix, Announcement>,
}

impl PrefixAnnouncementMap {
    pub fn new() -> Self {
        PrefixAnnouncementMap {
            inner: HashMap::new(),
        }
    }

    pub fn get(&self, prefix: &Prefix) -> Option<&Announcement> {
        self.inner.get(prefix)
    }

    pub fn insert(&mut self, ann: Announcement) {
        self.inner.insert(ann.prefix, ann);
    }

    pub fn remove(&mut self, prefix: &Prefix) -> Option<Announcement> {
        self.inner.remove(prefix)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &Announcement)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix() -> Prefix {
        "1.2.3.0/24".parse().unwrap()
    }

    #[test]
    fn origin_seed_carries_full_priority_and_monitor_flag() {
        let ann = Announcement::origin_seed(prefix(), 100, 0);
        assert_eq!(ann.priority, 400);
        assert!(ann.from_monitor);
        assert_eq!(ann.received_from_asn, SELF_SEED_ASN);
    }

    #[test]
    fn next_path_len_weight_wraps_zero_to_99() {
        let mut ann = Announcement::origin_seed(prefix(), 100, 0);
        ann.priority = 400;
        assert_eq!(ann.next_path_len_weight(), 99);
        ann.priority = 305;
        assert_eq!(ann.next_path_len_weight(), 4);
    }

    #[test]
    fn prefix_map_holds_one_announcement_per_prefix() {
        let mut map = PrefixAnnouncementMap::new();
        map.insert(Announcement::origin_seed(prefix(), 100, 0));
        map.insert(Announcement::origin_seed(prefix(), 200, 1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&prefix()).unwrap().origin, 200);
    }
}
