//! Reading the published accumulator and turning a note into a witness.
//!
//! The ledger may move between reads. A snapshot whose recomputed root does
//! not match the published root is reported as [`PoolError::RootMismatch`]
//! so the caller can fetch again; it is never treated as fatal here.

use std::future::Future;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PoolError, Result};
use crate::field::FieldElement;
use crate::merkle::{AccumulatorSnapshot, AuthenticationPath, MerkleAccumulator};
use crate::note::Note;
use crate::witness::{ChangeOutput, SpendRequest, SpendWitness, SpendWitnessAssembler};

/// Read access to the published note commitments.
pub trait LedgerReader {
    /// All commitments, in insertion order.
    fn fetch_leaves(&self) -> impl Future<Output = Result<Vec<FieldElement>>> + Send;

    /// Current accumulator root.
    fn fetch_root(&self) -> impl Future<Output = Result<FieldElement>> + Send;
}

/// How the caller wants a note's value split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendIntent {
    pub note: Note,
    pub withdraw_amount: FieldElement,
    #[serde(default)]
    pub withdraw_to: Option<FieldElement>,
    #[serde(default)]
    pub withdraw_token: Option<FieldElement>,
    #[serde(default)]
    pub tx1: ChangeOutput,
    #[serde(default)]
    pub tx2_secret: Option<FieldElement>,
}

impl SpendIntent {
    pub fn into_request(self, path: AuthenticationPath, root: FieldElement) -> SpendRequest {
        SpendRequest {
            note: self.note,
            path,
            root,
            withdraw_amount: self.withdraw_amount,
            withdraw_to: self.withdraw_to,
            withdraw_token: self.withdraw_token,
            tx1: self.tx1,
            tx2_secret: self.tx2_secret,
        }
    }
}

/// A note found in a consistent ledger snapshot.
#[derive(Clone, Debug)]
pub struct LocatedNote {
    pub snapshot: AccumulatorSnapshot,
    pub root: FieldElement,
    pub commitment: FieldElement,
    pub path: AuthenticationPath,
}

/// Fetch the ledger, check it is self-consistent and find `note` in it.
pub async fn locate_note<L: LedgerReader>(
    ledger: &L,
    accumulator: &MerkleAccumulator,
    note: &Note,
) -> Result<LocatedNote> {
    let snapshot = AccumulatorSnapshot::new(ledger.fetch_leaves().await?);
    let published = ledger.fetch_root().await?;

    let computed = snapshot.root(accumulator)?;
    if computed != published {
        warn!(%published, %computed, leaves = snapshot.len(), "stale ledger snapshot");
        return Err(PoolError::RootMismatch {
            expected: published,
            computed,
        });
    }

    let commitment = note.commitment(accumulator.hasher())?;
    let index = snapshot
        .position_of(commitment)
        .ok_or(PoolError::NoteNotFound {
            commitment,
            leaves: snapshot.len(),
        })?;
    let path = snapshot.path(accumulator, index)?;
    debug!(index, leaves = snapshot.len(), "located note");

    Ok(LocatedNote {
        snapshot,
        root: published,
        commitment,
        path,
    })
}

/// Ledger read, note lookup and witness assembly in one step.
pub async fn prepare_spend<L, R>(
    ledger: &L,
    assembler: &SpendWitnessAssembler,
    intent: SpendIntent,
    rng: &mut R,
) -> Result<SpendWitness>
where
    L: LedgerReader,
    R: RngCore + ?Sized,
{
    let located = locate_note(ledger, assembler.accumulator(), &intent.note).await?;
    let request = intent.into_request(located.path, located.root);
    assembler.assemble(&request, rng)
}
