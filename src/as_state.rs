use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::announcement::{Announcement, PrefixAnnouncementMap};
use crate::as_graph::ASN;
use crate::policy::{create_policy, PolicyExtension};
use crate::prefix::Prefix;
use crate::route_validator::RouteValidator;
use crate::shared::Settings;

/// Runtime propagation state for a single AS across one block iteration:
/// Adj-RIB-In queue, Loc-RIB, an optional depref (second-best) RIB, and the
/// policy overlay applied at intake/export time.
pub struct AsState {
    pub asn: ASN,
    pub settings: Settings,
    pub policy: Box<dyn PolicyExtension>,
    pub incoming: Vec<Announcement>,
    pub loc_rib: PrefixAnnouncementMap,
    pub depref_rib: PrefixAnnouncementMap,
    pub store_depref: bool,

    // ROV++ auxiliary bookkeeping, unused outside a ROV++ policy.
    pub failed_rov: HashSet<Prefix>,
    pub passed_rov: HashSet<Prefix>,
    pub blackholes: PrefixAnnouncementMap,
    /// v0: neighbors this AS must never re-export a prefix to again, because
    /// that neighbor once delivered an attacker announcement for it.
    pub poisoned_neighbors: HashMap<Prefix, HashSet<ASN>>,
}

impl AsState {
    pub fn new(asn: ASN, settings: Settings, store_depref: bool, route_validator: Arc<RouteValidator>) -> Self {
        AsState {
            asn,
            settings,
            policy: create_policy(settings, route_validator),
            incoming: Vec::new(),
            loc_rib: PrefixAnnouncementMap::new(),
            depref_rib: PrefixAnnouncementMap::new(),
            store_depref,
            failed_rov: HashSet::new(),
            passed_rov: HashSet::new(),
            blackholes: PrefixAnnouncementMap::new(),
            poisoned_neighbors: HashMap::new(),
        }
    }

    pub fn reset_for_next_block(&mut self) {
        self.incoming.clear();
        self.loc_rib.clear();
        self.depref_rib.clear();
        self.failed_rov.clear();
        self.passed_rov.clear();
        self.blackholes.clear();
        self.poisoned_neighbors.clear();
    }

    pub fn queue_incoming(&mut self, ann: Announcement) {
        self.incoming.push(ann);
    }
}
