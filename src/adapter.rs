use crate::announcement::Announcement;
use crate::as_graph::ASN;
use crate::prefix::Prefix;
use crate::shared::Relationships;

/// A single relationship-table row as the adapter would read it back from
/// the backing store: two ASNs and how the first relates to the second.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipRow {
    pub asn: ASN,
    pub neighbor_asn: ASN,
    pub relationship: Relationships,
}

/// A single AS-path announcement row as read from the seed table: the
/// engine plants one monitor announcement per hop on `as_path`.
#[derive(Debug, Clone)]
pub struct SeedRow {
    pub prefix: Prefix,
    pub origin: ASN,
    pub as_path: Vec<ASN>,
    pub timestamp: i64,
}

/// One AS's final selected route for a prefix, ready to be persisted.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub asn: ASN,
    pub prefix: Prefix,
    pub origin: ASN,
    pub received_from_asn: ASN,
}

#[derive(Debug)]
pub struct AdapterError(pub String);

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "adapter I/O failure: {}", self.0)
    }
}

impl std::error::Error for AdapterError {}

/// External collaborator interface: supplies the AS-relationship graph and
/// seed announcements, and receives the engine's computed results. The
/// engine never talks to a database directly; it only calls through this
/// trait, so swapping storage backends never touches propagation logic.
pub trait Adapter {
    fn load_relationships(&self) -> Result<Vec<RelationshipRow>, AdapterError>;

    /// Seed rows whose prefix falls under `block`, i.e. the work for one
    /// propagation iteration.
    fn load_seeds(&self, block: &Prefix) -> Result<Vec<SeedRow>, AdapterError>;

    /// Count of seed rows under `block`, used by the prefix-block planner
    /// without materializing the rows themselves.
    fn count_seeds_under(&self, block: &Prefix) -> Result<usize, AdapterError>;

    /// Count of seed rows whose prefix is exactly `block` (not a more
    /// specific descendant), used to decide whether a block needs its own
    /// single-prefix work unit in addition to further bisection.
    fn count_seeds_exact(&self, block: &Prefix) -> Result<usize, AdapterError>;

    fn store_results(&mut self, iteration: u64, rows: &[ResultRow]) -> Result<(), AdapterError>;

    fn store_depref_results(&mut self, _iteration: u64, _rows: &[ResultRow]) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// A minimal in-memory adapter useful for tests and small scripted runs: all
/// relationships and seeds are provided up front, results accumulate in a
/// `Vec` rather than going to a database.
#[derive(Default)]
pub struct InMemoryAdapter {
    pub relationships: Vec<RelationshipRow>,
    pub seeds: Vec<SeedRow>,
    pub results: Vec<(u64, ResultRow)>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        InMemoryAdapter::default()
    }
}

impl Adapter for InMemoryAdapter {
    fn load_relationships(&self) -> Result<Vec<RelationshipRow>, AdapterError> {
        Ok(self.relationships.clone())
    }

    fn load_seeds(&self, block: &Prefix) -> Result<Vec<SeedRow>, AdapterError> {
        Ok(self
            .seeds
            .iter()
            .filter(|s| s.prefix.contained_in_or_equal_to(block))
            .cloned()
            .collect())
    }

    fn count_seeds_under(&self, block: &Prefix) -> Result<usize, AdapterError> {
        Ok(self
            .seeds
            .iter()
            .filter(|s| s.prefix.contained_in_or_equal_to(block))
            .count())
    }

    fn count_seeds_exact(&self, block: &Prefix) -> Result<usize, AdapterError> {
        Ok(self.seeds.iter().filter(|s| s.prefix == *block).count())
    }

    fn store_results(&mut self, iteration: u64, rows: &[ResultRow]) -> Result<(), AdapterError> {
        for row in rows {
            self.results.push((iteration, row.clone()));
        }
        Ok(())
    }
}

pub fn announcement_to_result_row(asn: ASN, ann: &Announcement) -> ResultRow {
    ResultRow {
        asn,
        prefix: ann.prefix,
        origin: ann.origin,
        received_from_asn: ann.received_from_asn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_adapter_filters_seeds_by_block() {
        let mut a = InMemoryAdapter::new();
        a.seeds.push(SeedRow {
            prefix: "1.2.3.0/24".parse().unwrap(),
            origin: 100,
            as_path: vec![100],
            timestamp: 0,
        });
        a.seeds.push(SeedRow {
            prefix: "8.8.8.0/24".parse().unwrap(),
            origin: 200,
            as_path: vec![200],
            timestamp: 0,
        });
        let block: Prefix = "1.0.0.0/8".parse().unwrap();
        let rows = a.load_seeds(&block).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].origin, 100);
    }
}
