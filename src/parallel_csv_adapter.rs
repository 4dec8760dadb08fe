use std::fs;
use std::path::PathBuf;
use std::thread;

use crate::adapter::{Adapter, AdapterError, RelationshipRow, ResultRow, SeedRow};
use crate::prefix::Prefix;

/// Streams `store_results` across worker threads, each striping its share of
/// the rows into its own staging CSV under `staging_dir`, mirroring the
/// original extrapolator's `save_results_thread` convention of writing to
/// `/dev/shm/bgp/<iteration>_<thread>.csv` so the write fan-out never
/// contends on a single file handle or a single DB connection.
///
/// This adapter owns seeding and relationship data in memory (like
/// `InMemoryAdapter`) and only parallelizes the result-emission path; a
/// production deployment would back `load_relationships`/`load_seeds` with a
/// real store instead.
pub struct ParallelCsvAdapter {
    pub relationships: Vec<RelationshipRow>,
    pub seeds: Vec<SeedRow>,
    pub staging_dir: PathBuf,
    pub thread_count: usize,
}

impl ParallelCsvAdapter {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        let thread_count = thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1);
        ParallelCsvAdapter {
            relationships: Vec::new(),
            seeds: Vec::new(),
            staging_dir: staging_dir.into(),
            thread_count,
        }
    }

    fn staging_path(&self, iteration: u64, thread_idx: usize) -> PathBuf {
        self.staging_dir.join(format!("{}_{}.csv", iteration, thread_idx))
    }

    /// Write one thread's share of `rows` to its staging file, then hand the
    /// written row count back so the caller can confirm nothing was dropped.
    fn write_shard(path: &PathBuf, rows: &[ResultRow]) -> Result<usize, AdapterError> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| AdapterError(format!("opening staging file {:?}: {}", path, e)))?;
        for row in rows {
            writer
                .write_record(&[
                    row.asn.to_string(),
                    row.prefix.to_cidr(),
                    row.origin.to_string(),
                    row.received_from_asn.to_string(),
                ])
                .map_err(|e| AdapterError(format!("writing row to {:?}: {}", path, e)))?;
        }
        writer
            .flush()
            .map_err(|e| AdapterError(format!("flushing {:?}: {}", path, e)))?;
        Ok(rows.len())
    }
}

impl Adapter for ParallelCsvAdapter {
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

    /// Stripe `rows` by index modulo `thread_count`, spawn one writer thread
    /// per shard, then join. A thread's write failure is surfaced once all
    /// threads have finished, so a single bad shard never strands the rest
    /// mid-write.
    fn store_results(&mut self, iteration: u64, rows: &[ResultRow]) -> Result<(), AdapterError> {
        if rows.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.staging_dir)
            .map_err(|e| AdapterError(format!("creating staging dir {:?}: {}", self.staging_dir, e)))?;

        let thread_count = self.thread_count.min(rows.len()).max(1);
        let mut shards: Vec<Vec<ResultRow>> = vec![Vec::new(); thread_count];
        for (i, row) in rows.iter().enumerate() {
            shards[i % thread_count].push(row.clone());
        }

        let outcomes: Vec<Result<usize, AdapterError>> = thread::scope(|scope| {
            let handles: Vec<_> = shards
                .into_iter()
                .enumerate()
                .map(|(thread_idx, shard)| {
                    let path = self.staging_path(iteration, thread_idx);
                    scope.spawn(move || Self::write_shard(&path, &shard))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for outcome in outcomes {
            outcome?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announcement::SELF_SEED_ASN;

    fn row(asn: u32) -> ResultRow {
        ResultRow {
            asn,
            prefix: "1.2.3.0/24".parse().unwrap(),
            origin: 100,
            received_from_asn: SELF_SEED_ASN,
        }
    }

    #[test]
    fn store_results_writes_one_staging_file_per_thread_with_all_rows_covered() {
        let dir = std::env::temp_dir().join(format!("bgp_staging_test_{}", std::process::id()));
        let mut adapter = ParallelCsvAdapter::new(&dir);
        adapter.thread_count = 3;

        let rows: Vec<ResultRow> = (1..=7).map(row).collect();
        adapter.store_results(0, &rows).unwrap();

        let mut total_lines = 0usize;
        for thread_idx in 0..3 {
            let path = adapter.staging_path(0, thread_idx);
            assert!(path.exists());
            let contents = fs::read_to_string(&path).unwrap();
            total_lines += contents.lines().count();
        }
        assert_eq!(total_lines, 7);

        fs::remove_dir_all(&dir).ok();
    }
}
