//! Accounting core of a shielded note pool.
//!
//! Value deposited into the pool lives as hidden note commitments in an
//! append-only Merkle accumulator. Spending a note proves membership of its
//! commitment, publishes its nullifier and splits its value between a public
//! withdrawal and up to two new notes:
//!
//! ```text
//!   ledger leaves ──► MerkleAccumulator ──► AuthenticationPath ─┐
//!                                                               ▼
//!   (claiming key, owner, asset) ──► Note ──► SpendWitnessAssembler ──► prover
//!                                     │                          ▲
//!                                     └── nullifier ─────────────┘
//! ```
//!
//! Everything here is a pure function of its inputs. The only shared state is
//! the one-time hash backend initialization in [`hash::BackendLoader`].

pub mod error;
pub mod field;
pub mod hash;
pub mod ledger;
pub mod merkle;
pub mod note;
pub mod prover;
pub mod witness;

pub use error::{ChangeSlot, PoolError, Result};
pub use field::FieldElement;
pub use hash::{init_poseidon, BackendLoader, HashBackend, HashHandle, PoseidonBn254};
pub use ledger::{locate_note, prepare_spend, LedgerReader, LocatedNote, SpendIntent};
pub use merkle::{AccumulatorSnapshot, AuthenticationPath, MerkleAccumulator, Node, PairingRule};
pub use note::{
    commit_to_asset, generate_claiming_key, note_nullifier, note_secret, Asset, Note,
};
pub use prover::{prove_spend, ProofResponse, ProvingBackend, SpendProof};
pub use witness::{
    ChangeOutput, SpendRequest, SpendWitness, SpendWitnessAssembler, MERKLE_PATH_SLOTS,
};
