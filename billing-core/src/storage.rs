//! Snapshot persistence
//!
//! The engine's state is four small collections; durability is a bincode
//! snapshot written atomically (temp file + rename) so a crash mid-write
//! leaves the previous snapshot intact. Secondary indexes are not persisted;
//! they are rebuilt on load.

use crate::types::{AssetId, OneTimePayment, PaymentRecord, Plan, Subscription, SubscriptionId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized engine state
///
/// Collections are stored sorted (subscriptions and history by id, plans by
/// creation time, orders by order id) so snapshots of the same state are
/// byte-identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Registered assets, in insertion order
    pub assets: Vec<AssetId>,

    /// All plans
    pub plans: Vec<Plan>,

    /// All subscriptions, including terminal ones
    pub subscriptions: Vec<Subscription>,

    /// Payment history per subscription
    pub history: Vec<(SubscriptionId, Vec<PaymentRecord>)>,

    /// One-time payments
    pub orders: Vec<OneTimePayment>,

    /// Subscriptions ever created
    pub subscriptions_created: u64,
}

/// Snapshot file store
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store writing `file_name` inside `data_dir` (created if
    /// missing)
    pub fn open(data_dir: impl AsRef<Path>, file_name: &str) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(file_name),
        })
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `None` when none has been written yet
    pub fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let snapshot = bincode::deserialize(&bytes)?;
        Ok(Some(snapshot))
    }

    /// Write the snapshot atomically
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = bincode::serialize(snapshot)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Storage(format!(
                "failed to commit snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(
            "Snapshot written: {} bytes to {}",
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }
}
