use dutchmint_core::allocation::Allocation;
use dutchmint_core::error::MintError;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::path::Path;

const SNAPSHOT_KEY: &[u8] = b"engine_snapshot";

/// Versioned wrapper around a bincode-encoded engine snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub version: u16,
    pub payload: Vec<u8>,
}

/// Persistent auction store backed by sled.
///
/// Named trees:
///   meta         — utf8 key bytes      → raw bytes (engine snapshot lives here)
///   allocations  — u64 BE sequence no. → bincode(Allocation)
///
/// The allocation log is append-only; keys are assigned in admission order so
/// iteration returns allocations in token-id order.
pub struct StateDb {
    db: sled::Db,
    meta: sled::Tree,
    allocations: sled::Tree,
    /// Makes every commit fail with `Storage`, for rollback tests.
    #[cfg(test)]
    fail_commits: std::sync::atomic::AtomicBool,
}

impl StateDb {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MintError> {
        let db = sled::open(path).map_err(|e| MintError::Storage(e.to_string()))?;
        let meta        = db.open_tree("meta").map_err(|e| MintError::Storage(e.to_string()))?;
        let allocations = db.open_tree("allocations").map_err(|e| MintError::Storage(e.to_string()))?;
        Ok(Self {
            db,
            meta,
            allocations,
            #[cfg(test)]
            fail_commits: std::sync::atomic::AtomicBool::new(false),
        })
    }

    #[cfg(test)]
    pub(crate) fn set_failing_commits(&self, failing: bool) {
        self.fail_commits.store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_writable(&self) -> Result<(), MintError> {
        if self.fail_commits.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MintError::Storage("commit disabled".into()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_writable(&self) -> Result<(), MintError> {
        Ok(())
    }

    // ── Snapshot ──────────────────────────────────────────────────────────────

    pub fn load_snapshot(&self) -> Result<Option<SnapshotEnvelope>, MintError> {
        match self.meta.get(SNAPSHOT_KEY).map_err(|e| MintError::Storage(e.to_string()))? {
            Some(bytes) => {
                let env = bincode::deserialize(&bytes)
                    .map_err(|e| MintError::Serialization(e.to_string()))?;
                Ok(Some(env))
            }
            None => Ok(None),
        }
    }

    // ── Allocations ──────────────────────────────────────────────────────────

    pub fn load_allocations(&self) -> Result<Vec<Allocation>, MintError> {
        let mut out = Vec::new();
        for item in self.allocations.iter() {
            let (_, bytes) = item.map_err(|e| MintError::Storage(e.to_string()))?;
            let alloc = bincode::deserialize(&bytes)
                .map_err(|e| MintError::Serialization(e.to_string()))?;
            out.push(alloc);
        }
        Ok(out)
    }

    // ── Commit ────────────────────────────────────────────────────────────────

    /// Write a new snapshot plus any allocations it introduced in one
    /// multi-tree transaction, then flush. `first_index` is the log position
    /// of `new_allocations[0]`.
    pub fn commit(
        &self,
        snapshot: &SnapshotEnvelope,
        first_index: u64,
        new_allocations: &[Allocation],
    ) -> Result<(), MintError> {
        self.check_writable()?;
        let snapshot_bytes = bincode::serialize(snapshot)
            .map_err(|e| MintError::Serialization(e.to_string()))?;
        let rows = new_allocations
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let bytes = bincode::serialize(a)
                    .map_err(|e| MintError::Serialization(e.to_string()))?;
                Ok(((first_index + i as u64).to_be_bytes(), bytes))
            })
            .collect::<Result<Vec<_>, MintError>>()?;

        (&self.meta, &self.allocations)
            .transaction(|(meta, allocs)| {
                meta.insert(SNAPSHOT_KEY, snapshot_bytes.as_slice())?;
                for (key, bytes) in &rows {
                    allocs.insert(&key[..], bytes.as_slice())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| MintError::Storage(format!("{e:?}")))?;
        self.flush()
    }

    pub fn flush(&self) -> Result<(), MintError> {
        self.db.flush().map_err(|e| MintError::Storage(e.to_string()))?;
        Ok(())
    }
}
