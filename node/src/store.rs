//! # Ledger Store
//!
//! Durable home of the presale ledger, built on sled's embedded key-value
//! store.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                | Value                  |
//! |------------|--------------------|------------------------|
//! | `ledger`   | `ledger_snapshot`  | `bincode(LedgerState)` |
//! | `metadata` | key (UTF-8)        | value (bytes)          |
//!
//! The whole ledger is written as one value after every accepted change,
//! so a crash can never leave a half-applied mint on disk. The write is
//! flushed before the call is acknowledged.
//!
//! ## Cost
//!
//! The snapshot grows with the number of minted tokens (one 20-byte holder
//! per token), and every accepted call rewrites and flushes all of it while
//! the ledger mutex is held. A sold-out collection at `MAX_COLLECTION_SIZE`
//! is roughly 20 MB per save. That is acceptable for one presale per node;
//! a larger ledger would need per-token keys instead of a single value.

use presale_contracts::LedgerState;
use presale_protocol::config::LEDGER_SNAPSHOT_KEY;
use sled::{Db, Tree};
use std::path::Path;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur while reading or writing the ledger.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata key holding the unix time of the last successful save.
const META_LAST_SAVED: &[u8] = b"last_saved_at";

/// Where the node commits the ledger after each accepted call.
pub trait LedgerPersistence: Send + Sync {
    /// Durably replaces the stored ledger with `state`.
    fn save(&self, state: &LedgerState) -> StoreResult<()>;

    /// Unix time of the last successful save, if any.
    fn last_saved_at(&self) -> StoreResult<Option<u64>>;
}

// ---------------------------------------------------------------------------
// LedgerStore
// ---------------------------------------------------------------------------

/// Persistent storage for a single presale ledger.
///
/// Cheap to clone; all handles share the same sled database.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: Db,
    ledger: Tree,
    metadata: Tree,
}

impl LedgerStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a store that lives in memory and vanishes on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let ledger = db.open_tree("ledger")?;
        let metadata = db.open_tree("metadata")?;
        Ok(Self {
            db,
            ledger,
            metadata,
        })
    }

    /// Loads the saved ledger, if one exists.
    pub fn load(&self) -> StoreResult<Option<LedgerState>> {
        match self.ledger.get(LEDGER_SNAPSHOT_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl LedgerPersistence for LedgerStore {
    /// Replaces the saved ledger with `state` and flushes it to disk.
    fn save(&self, state: &LedgerState) -> StoreResult<()> {
        let bytes = bincode::serialize(state)?;
        self.ledger.insert(LEDGER_SNAPSHOT_KEY, bytes)?;
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.metadata.insert(META_LAST_SAVED, now.to_be_bytes().to_vec())?;
        self.db.flush()?;
        Ok(())
    }

    fn last_saved_at(&self) -> StoreResult<Option<u64>> {
        Ok(self.metadata.get(META_LAST_SAVED)?.and_then(|raw| {
            let bytes: [u8; 8] = raw.as_ref().try_into().ok()?;
            Some(u64::from_be_bytes(bytes))
        }))
    }
}
