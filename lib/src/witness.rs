//! Split-spend witness assembly.
//!
//! Spending a note publishes its nullifier and splits its value three ways:
//!
//! ```text
//! note.amount == withdraw.amount + tx1.amount + tx2.amount
//! ```
//!
//! `tx1` is chosen by the caller, `tx2` receives the remainder. Every check
//! that can be done locally is done here, before the witness ever reaches the
//! proving backend.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChangeSlot, PoolError, Result};
use crate::field::FieldElement;
use crate::merkle::{AuthenticationPath, MerkleAccumulator};
use crate::note::{commit_to_asset, generate_claiming_key, Asset, Note};

/// Number of authentication-path slots the circuit takes.
pub const MERKLE_PATH_SLOTS: usize = 20;

/// Caller-chosen first change output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOutput {
    #[serde(default)]
    pub amount: Option<FieldElement>,
    #[serde(default)]
    pub secret: Option<FieldElement>,
}

/// Everything needed to spend one note.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRequest {
    pub note: Note,
    pub path: AuthenticationPath,
    pub root: FieldElement,
    pub withdraw_amount: FieldElement,
    /// Defaults to the note's owner.
    #[serde(default)]
    pub withdraw_to: Option<FieldElement>,
    /// Token of the public withdrawal. Defaults to the note's token.
    #[serde(default)]
    pub withdraw_token: Option<FieldElement>,
    #[serde(default)]
    pub tx1: ChangeOutput,
    /// Owner of the remainder note; required when the remainder is non-zero.
    #[serde(default)]
    pub tx2_secret: Option<FieldElement>,
}

impl SpendRequest {
    /// Spend the whole note to the public withdrawal, no change.
    pub fn withdraw_all(note: Note, path: AuthenticationPath, root: FieldElement) -> Self {
        Self {
            withdraw_amount: note.asset.amount,
            note,
            path,
            root,
            withdraw_to: None,
            withdraw_token: None,
            tx1: ChangeOutput::default(),
            tx2_secret: None,
        }
    }
}

/// The flat record handed to the proving backend.
///
/// Field names and the fixed defaults for `OwnerKey`, `AuthDone` and
/// `Payload` are part of the backend's input format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpendWitness {
    pub claiming_key: FieldElement,
    pub owner: FieldElement,
    pub owner_key: FieldElement,
    pub auth_done: FieldElement,
    pub tx_asset: Asset,
    pub merkle_proof: Vec<FieldElement>,
    pub merkle_root: FieldElement,
    pub nullifier: FieldElement,
    pub withdraw: Asset,
    pub withdraw_to: FieldElement,
    pub tx1_secret: FieldElement,
    pub tx1_amount: FieldElement,
    pub tx1: FieldElement,
    pub tx2_secret: FieldElement,
    /// Recomputed by the backend; not part of the wire record.
    #[serde(skip)]
    pub tx2_amount: FieldElement,
    pub tx2: FieldElement,
    pub payload: FieldElement,
}

impl SpendWitness {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PoolError::WitnessEncoding(e.to_string()))
    }
}

/// Builds balanced [`SpendWitness`]es.
#[derive(Clone)]
pub struct SpendWitnessAssembler {
    accumulator: MerkleAccumulator,
}

impl SpendWitnessAssembler {
    pub fn new(accumulator: MerkleAccumulator) -> Self {
        Self { accumulator }
    }

    pub fn accumulator(&self) -> &MerkleAccumulator {
        &self.accumulator
    }

    /// Assemble the witness for `request`.
    ///
    /// `rng` is only drawn from when a zero-valued change output has no
    /// secret; with both secrets supplied the result is fully determined by
    /// `request`.
    pub fn assemble<R: RngCore + ?Sized>(
        &self,
        request: &SpendRequest,
        rng: &mut R,
    ) -> Result<SpendWitness> {
        let hasher = self.accumulator.hasher();
        let note = &request.note;
        let token = note.asset.token_address;

        let nullifier = note.nullifier(hasher)?;

        let tx1_amount = request.tx1.amount.unwrap_or_else(FieldElement::zero);
        let tx1_secret = self.change_secret(ChangeSlot::Tx1, request.tx1.secret, tx1_amount, rng)?;
        let tx1 = commit_to_asset(hasher, tx1_secret, token, tx1_amount)?;

        let tx2_amount = note
            .asset
            .amount
            .checked_sub(tx1_amount)
            .and_then(|rest| rest.checked_sub(request.withdraw_amount))
            .ok_or(PoolError::OverspendAttempt {
                available: note.asset.amount,
                withdraw: request.withdraw_amount,
                tx1: tx1_amount,
            })?;
        debug!(%tx1_amount, %tx2_amount, withdraw = %request.withdraw_amount, "split note value");

        let tx2_secret = self.change_secret(ChangeSlot::Tx2, request.tx2_secret, tx2_amount, rng)?;
        let tx2 = commit_to_asset(hasher, tx2_secret, token, tx2_amount)?;

        let commitment = note.commitment(hasher)?;
        self.accumulator.verify(commitment, &request.path, request.root)?;
        let merkle_proof = request.path.padded(MERKLE_PATH_SLOTS)?;

        Ok(SpendWitness {
            claiming_key: note.claiming_key,
            owner: note.owner,
            owner_key: FieldElement::zero(),
            auth_done: FieldElement::zero(),
            tx_asset: note.asset,
            merkle_proof,
            merkle_root: request.root,
            nullifier,
            withdraw: Asset::new(
                request.withdraw_amount,
                request.withdraw_token.unwrap_or(token),
            ),
            withdraw_to: request.withdraw_to.unwrap_or(note.owner),
            tx1_secret,
            tx1_amount,
            tx1,
            tx2_secret,
            tx2_amount,
            tx2,
            payload: FieldElement::zero(),
        })
    }

    /// A supplied secret is used as is. Without one the output must carry no
    /// value, and gets a throwaway secret so the record keeps its shape.
    fn change_secret<R: RngCore + ?Sized>(
        &self,
        slot: ChangeSlot,
        secret: Option<FieldElement>,
        amount: FieldElement,
        rng: &mut R,
    ) -> Result<FieldElement> {
        match secret {
            Some(secret) => Ok(secret),
            None if !amount.is_zero() => {
                Err(PoolError::MissingSecretForNonzeroAmount { slot, amount })
            }
            None => {
                let a = generate_claiming_key(rng);
                let b = generate_claiming_key(rng);
                self.accumulator.hasher().hash2(a, b)
            }
        }
    }
}
