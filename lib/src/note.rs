//! Notes: hidden commitments to an amount of a token.
//!
//! ```text
//! secret     = H(claiming_key, owner)
//! commitment = H(H(secret, token), amount)
//! nullifier  = H(H(H(claiming_key + 1, owner), token), amount)
//! ```
//!
//! The commitment is the public leaf; the nullifier is published once when
//! the note is spent. Offsetting the claiming key by one keeps the nullifier
//! unlinkable to the commitment for anyone who does not hold the key.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::FieldElement;
use crate::hash::HashBackend;

/// A quantity of a specific fungible token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Asset {
    pub amount: FieldElement,
    #[serde(rename = "Addr")]
    pub token_address: FieldElement,
}

impl Asset {
    pub fn new(amount: impl Into<FieldElement>, token_address: FieldElement) -> Self {
        Self {
            amount: amount.into(),
            token_address,
        }
    }
}

/// Secret material identifying a deposited note.
///
/// Notes are never stored by the core; only their derived values are.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub claiming_key: FieldElement,
    pub owner: FieldElement,
    pub asset: Asset,
}

impl Note {
    pub fn new(claiming_key: FieldElement, owner: FieldElement, asset: Asset) -> Self {
        Self {
            claiming_key,
            owner,
            asset,
        }
    }

    pub fn secret(&self, hasher: &dyn HashBackend) -> Result<FieldElement> {
        note_secret(hasher, self.claiming_key, self.owner)
    }

    pub fn commitment(&self, hasher: &dyn HashBackend) -> Result<FieldElement> {
        let secret = self.secret(hasher)?;
        commit_to_asset(hasher, secret, self.asset.token_address, self.asset.amount)
    }

    pub fn nullifier(&self, hasher: &dyn HashBackend) -> Result<FieldElement> {
        note_nullifier(hasher, self.claiming_key, self.owner, &self.asset)
    }
}

/// `H(claiming_key, owner)`; knowing it proves ownership of the note.
pub fn note_secret(
    hasher: &dyn HashBackend,
    claiming_key: FieldElement,
    owner: FieldElement,
) -> Result<FieldElement> {
    hasher.hash2(claiming_key, owner)
}

/// `H(H(secret, token), amount)`, the leaf value of a note.
pub fn commit_to_asset(
    hasher: &dyn HashBackend,
    secret: FieldElement,
    token_address: FieldElement,
    amount: FieldElement,
) -> Result<FieldElement> {
    hasher.hash3(secret, token_address, amount)
}

/// Spend tag of a note: the commitment derivation run over `claiming_key + 1`.
pub fn note_nullifier(
    hasher: &dyn HashBackend,
    claiming_key: FieldElement,
    owner: FieldElement,
    asset: &Asset,
) -> Result<FieldElement> {
    let shifted = note_secret(hasher, claiming_key + FieldElement::one(), owner)?;
    commit_to_asset(hasher, shifted, asset.token_address, asset.amount)
}

/// Fresh uniformly random claiming key for a new note.
pub fn generate_claiming_key<R: RngCore + ?Sized>(rng: &mut R) -> FieldElement {
    FieldElement::random(rng)
}
