use std::collections::HashSet;

use crate::announcement::{Announcement, BLACKHOLE_ASN};
use crate::as_graph::{ASN, AS};
use crate::prefix::Prefix;
use crate::route_validator::RouteValidator;
use crate::shared::{ROAValidity, Relationships, Settings};

/// ROV++ variant, per the original's `ROVppAS` family (v0, v0.1 blackhole,
/// v0.2 blackhole-with-forward, v0.3 preventive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RovPpVariant {
    V0,
    V0_1,
    V0_2,
    V0_3,
}

/// EZBGPsec overlay variant. Plain EZBGPsec carries no extra check beyond
/// BGPsec-style origin validation; the others add the named detection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EzBgpsecVariant {
    Plain,
    DirectoryOnly,
    CommunityDetection,
    PathEnd,
    ContiguousChain,
    Transitive,
}

/// A single deterministic coin flip seeded fresh from `asn` on every call
/// (splitmix64's mixing step), so tie-break outcomes depend only on the AS
/// and not on call order or a process-global RNG stream.
fn asn_seeded_coin(asn: ASN) -> bool {
    let mut state = asn as u64;
    state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^= z >> 31;
    z & 1 == 1
}

/// A policy overlay governs three decisions at an AS: whether to accept an
/// incoming announcement, whether a candidate replaces the currently-held
/// best route, and whether a route is withheld from a given export direction.
pub trait PolicyExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Intake validation: loop detection, ROA checks, path-end checks, etc.
    /// Called before an announcement is allowed into Adj-RIB-In processing.
    fn accepts(&self, ann: &Announcement, as_obj: &AS) -> bool {
        !ann.path_contains(as_obj.asn)
    }

    /// True if `candidate` should replace `cur` as the best route for this
    /// prefix. The default implements the priority-based Gao-Rexford
    /// selection: higher priority wins; on an exact tie, the incoming
    /// announcement replaces the held one only if `random_tiebreak` draws
    /// true — otherwise the held announcement (`cur`) is kept. The draw is
    /// reseeded from `asn` on every call, not a shared thread RNG, so a run
    /// is reproducible given the same graph and seed set.
    fn prefers_new(&self, candidate: &Announcement, cur: &Announcement, asn: ASN, random_tiebreak: bool) -> bool {
        match candidate.priority.cmp(&cur.priority) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => random_tiebreak && asn_seeded_coin(asn),
        }
    }

    /// True if this announcement must not be exported toward `to_relationship`.
    fn suppress_export(&self, _ann: &Announcement, _to_relationship: Relationships) -> bool {
        false
    }

    /// `Some(variant)` if this overlay is a ROV++ variant, so the engine can
    /// dispatch the blackhole/poison-neighbor handling that belongs to
    /// intake rather than to this trait's yes/no `accepts`.
    fn rovpp_variant(&self) -> Option<RovPpVariant> {
        None
    }

    /// Called when `accepts` rejected `ann` as a ROV++ attacker route.
    /// Returns the blackhole announcement to install in Loc-RIB, if this
    /// variant synthesizes one.
    fn on_rov_reject(&self, _ann: &Announcement) -> Option<Announcement> {
        None
    }

    fn setup(&mut self, _as_obj: &AS) {}
}

pub struct BgpPolicy;

impl PolicyExtension for BgpPolicy {
    fn name(&self) -> &str {
        "BGP"
    }
}

pub struct RovPolicy {
    pub route_validator: std::sync::Arc<RouteValidator>,
}

impl RovPolicy {
    pub fn new(route_validator: std::sync::Arc<RouteValidator>) -> Self {
        RovPolicy { route_validator }
    }

    fn roa_ok(&self, ann: &Announcement) -> bool {
        let ipnet_prefix = match ipnetwork::IpNetwork::new(
            std::net::IpAddr::V4(std::net::Ipv4Addr::from(ann.prefix.address)),
            ann.prefix.prefix_len(),
        ) {
            Ok(n) => n,
            Err(_) => return true,
        };
        let (validity, _) = self.route_validator.get_roa_outcome(&ipnet_prefix, ann.origin);
        matches!(validity, ROAValidity::Valid | ROAValidity::Unknown)
    }
}

impl PolicyExtension for RovPolicy {
    fn accepts(&self, ann: &Announcement, as_obj: &AS) -> bool {
        !ann.path_contains(as_obj.asn) && self.roa_ok(ann)
    }

    fn name(&self) -> &str {
        "ROV"
    }
}

/// ROV++: rejects invalid-origin routes like ROV, and additionally tracks
/// which prefixes failed/passed validation so export decisions (and, for
/// v0.1/v0.2, blackhole synthesis) can consult that history.
pub struct RovPpPolicy {
    pub variant: RovPpVariant,
    pub route_validator: std::sync::Arc<RouteValidator>,
}

impl RovPpPolicy {
    pub fn new(variant: RovPpVariant, route_validator: std::sync::Arc<RouteValidator>) -> Self {
        RovPpPolicy { variant, route_validator }
    }

    fn roa_ok(&self, ann: &Announcement) -> bool {
        let ipnet_prefix = match ipnetwork::IpNetwork::new(
            std::net::IpAddr::V4(std::net::Ipv4Addr::from(ann.prefix.address)),
            ann.prefix.prefix_len(),
        ) {
            Ok(n) => n,
            Err(_) => return true,
        };
        let (validity, _) = self.route_validator.get_roa_outcome(&ipnet_prefix, ann.origin);
        matches!(validity, ROAValidity::Valid | ROAValidity::Unknown)
    }

    /// v0.1/v0.2 synthesize a blackhole announcement in place of a rejected
    /// route: origin is rewritten to the reserved blackhole ASN so the route
    /// is visibly null-routed rather than silently dropped.
    pub fn make_blackhole(&self, rejected: &Announcement) -> Announcement {
        let mut bh = rejected.clone();
        bh.origin = BLACKHOLE_ASN;
        bh.as_path = vec![BLACKHOLE_ASN];
        bh
    }
}

impl PolicyExtension for RovPpPolicy {
    fn accepts(&self, ann: &Announcement, as_obj: &AS) -> bool {
        !ann.path_contains(as_obj.asn) && self.roa_ok(ann)
    }

    fn suppress_export(&self, ann: &Announcement, to_relationship: Relationships) -> bool {
        // v0: never forward a route this AS itself rejected to any neighbor.
        // v0.1/v0.2: blackhole announcements are forwarded only to customers
        // (v0.2) to reach downstream victims; v0 and v0.1 never forward them.
        if ann.origin == BLACKHOLE_ASN {
            return match self.variant {
                RovPpVariant::V0 | RovPpVariant::V0_1 => true,
                RovPpVariant::V0_2 | RovPpVariant::V0_3 => to_relationship != Relationships::Customers,
            };
        }
        false
    }

    fn rovpp_variant(&self) -> Option<RovPpVariant> {
        Some(self.variant)
    }

    fn on_rov_reject(&self, ann: &Announcement) -> Option<Announcement> {
        match self.variant {
            // v0 has no blackhole: it only remembers not to re-export to the
            // neighbor that delivered the attacker route (handled by the
            // engine via the poisoned-neighbor set, not here).
            RovPpVariant::V0 => None,
            RovPpVariant::V0_1 | RovPpVariant::V0_2 | RovPpVariant::V0_3 => Some(self.make_blackhole(ann)),
        }
    }

    fn name(&self) -> &str {
        match self.variant {
            RovPpVariant::V0 => "ROVPPV0",
            RovPpVariant::V0_1 => "ROVPPV0_1",
            RovPpVariant::V0_2 => "ROVPPV0_2",
            RovPpVariant::V0_3 => "ROVPPV0_3",
        }
    }
}

/// EZBGPsec: accepts only announcements whose full AS path was carried
/// end-to-end (no gaps introduced by a non-adopting AS), optionally layering
/// the named detection mechanism on top. Community-detection suspect lists
/// are supplied externally (see `community_detection.rs`) and consulted by
/// holding a blacklist snapshot on the policy.
pub struct EzBgpsecPolicy {
    pub variant: EzBgpsecVariant,
    pub blacklist: HashSet<ASN>,
}

impl EzBgpsecPolicy {
    pub fn new(variant: EzBgpsecVariant) -> Self {
        EzBgpsecPolicy {
            variant,
            blacklist: HashSet::new(),
        }
    }

    pub fn set_blacklist(&mut self, blacklist: HashSet<ASN>) {
        self.blacklist = blacklist;
    }
}

impl PolicyExtension for EzBgpsecPolicy {
    fn accepts(&self, ann: &Announcement, as_obj: &AS) -> bool {
        if ann.path_contains(as_obj.asn) {
            return false;
        }
        if self.variant == EzBgpsecVariant::CommunityDetection
            && ann.as_path.iter().any(|asn| self.blacklist.contains(asn))
        {
            return false;
        }
        true
    }

    fn name(&self) -> &str {
        match self.variant {
            EzBgpsecVariant::Plain => "EZBGPSEC",
            EzBgpsecVariant::DirectoryOnly => "EZBGPSEC_DIRECTORY",
            EzBgpsecVariant::CommunityDetection => "EZBGPSEC_COMMUNITY_DETECTION",
            EzBgpsecVariant::PathEnd => "EZBGPSEC_PATH_END",
            EzBgpsecVariant::ContiguousChain => "EZBGPSEC_CONTIGUOUS_CHAIN",
            EzBgpsecVariant::Transitive => "EZBGPSEC_TRANSITIVE",
        }
    }
}

/// Construct the policy overlay named by a `Settings` value. Unimplemented
/// settings fall back to plain BGP, matching the teacher's existing fallback
/// convention for settings with no dedicated overlay.
pub fn create_policy(
    settings: Settings,
    route_validator: std::sync::Arc<RouteValidator>,
) -> Box<dyn PolicyExtension> {
    match settings {
        Settings::BaseDefense => Box::new(BgpPolicy),
        Settings::Rov => Box::new(RovPolicy::new(route_validator)),
        Settings::RovppV1Lite => Box::new(RovPpPolicy::new(RovPpVariant::V0_1, route_validator)),
        Settings::RovppV2Lite => Box::new(RovPpPolicy::new(RovPpVariant::V0_2, route_validator)),
        Settings::RovppV2iLite => Box::new(RovPpPolicy::new(RovPpVariant::V0_3, route_validator)),
        Settings::Bgpisec => Box::new(EzBgpsecPolicy::new(EzBgpsecVariant::Plain)),
        Settings::BgpisecTransitive => Box::new(EzBgpsecPolicy::new(EzBgpsecVariant::Transitive)),
        Settings::BgpisecTransitiveProConId | Settings::BgpisecTransitiveOnlyToCustomers => {
            Box::new(EzBgpsecPolicy::new(EzBgpsecVariant::ContiguousChain))
        }
        Settings::PathEnd => Box::new(EzBgpsecPolicy::new(EzBgpsecVariant::PathEnd)),
        _ => Box::new(BgpPolicy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(priority: u32) -> Announcement {
        let mut a = Announcement::origin_seed("1.2.3.0/24".parse().unwrap(), 100, 0);
        a.priority = priority;
        a
    }

    #[test]
    fn higher_priority_always_wins() {
        let p = BgpPolicy;
        assert!(p.prefers_new(&ann(300), &ann(200), 64512, false));
        assert!(!p.prefers_new(&ann(200), &ann(300), 64512, false));
    }

    #[test]
    fn tie_without_random_tiebreak_keeps_current() {
        let p = BgpPolicy;
        assert!(!p.prefers_new(&ann(250), &ann(250), 64512, false));
    }

    #[test]
    fn asn_seeded_coin_is_deterministic_per_asn() {
        assert_eq!(asn_seeded_coin(13796), asn_seeded_coin(13796));
        let p = BgpPolicy;
        let first = p.prefers_new(&ann(250), &ann(250), 13796, true);
        let second = p.prefers_new(&ann(250), &ann(250), 13796, true);
        assert_eq!(first, second);
    }

    #[test]
    fn rovpp_v0_suppresses_export_of_blackholes_everywhere() {
        let rv = std::sync::Arc::new(RouteValidator::new());
        let p = RovPpPolicy::new(RovPpVariant::V0, rv);
        let mut bh = ann(100);
        bh.origin = BLACKHOLE_ASN;
        assert!(p.suppress_export(&bh, Relationships::Customers));
        assert!(p.suppress_export(&bh, Relationships::Peers));
    }

    #[test]
    fn rovpp_v0_2_forwards_blackholes_only_to_customers() {
        let rv = std::sync::Arc::new(RouteValidator::new());
        let p = RovPpPolicy::new(RovPpVariant::V0_2, rv);
        let mut bh = ann(100);
        bh.origin = BLACKHOLE_ASN;
        assert!(!p.suppress_export(&bh, Relationships::Customers));
        assert!(p.suppress_export(&bh, Relationships::Peers));
    }

    #[test]
    fn rovpp_v0_has_no_blackhole_but_v0_1_does() {
        let rv = std::sync::Arc::new(RouteValidator::new());
        let v0 = RovPpPolicy::new(RovPpVariant::V0, rv.clone());
        let v0_1 = RovPpPolicy::new(RovPpVariant::V0_1, rv);
        let rejected = ann(200);

        assert_eq!(v0.rovpp_variant(), Some(RovPpVariant::V0));
        assert!(v0.on_rov_reject(&rejected).is_none());

        let bh = v0_1.on_rov_reject(&rejected).expect("v0.1 synthesizes a blackhole");
        assert_eq!(bh.origin, BLACKHOLE_ASN);
    }
}
