//! Ledger snapshots stored as JSON files.
//!
//! ```json
//! { "leaves": ["0x1291…", "42", …], "root": "0x0abc…" }
//! ```
//!
//! `root` may be left out; the file is then trusted as-is and its root is
//! recomputed on read.

use std::path::Path;

use anyhow::{Context, Result};
use note_pool_lib::{FieldElement, LedgerReader, MerkleAccumulator, PoolError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub leaves: Vec<FieldElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<FieldElement>,
}

impl SnapshotFile {
    /// Fill in a missing root from the leaves.
    pub fn with_root(mut self, accumulator: &MerkleAccumulator) -> note_pool_lib::Result<Self> {
        if self.root.is_none() {
            self.root = Some(accumulator.root(&self.leaves)?);
        }
        Ok(self)
    }
}

impl LedgerReader for SnapshotFile {
    async fn fetch_leaves(&self) -> note_pool_lib::Result<Vec<FieldElement>> {
        Ok(self.leaves.clone())
    }

    async fn fetch_root(&self) -> note_pool_lib::Result<FieldElement> {
        self.root
            .ok_or_else(|| PoolError::LedgerUnavailable("snapshot has no root".into()))
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))
}
