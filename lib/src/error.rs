use thiserror::Error;

use crate::field::FieldElement;

/// Which of the two change outputs of a split spend an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeSlot {
    Tx1,
    Tx2,
}

impl core::fmt::Display for ChangeSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ChangeSlot::Tx1 => f.write_str("Tx1"),
            ChangeSlot::Tx2 => f.write_str("Tx2"),
        }
    }
}

/// Errors produced by the pool core.
///
/// Every validation failure is raised before anything is handed to the
/// proving backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The hash backend is not initialized or failed to evaluate.
    #[error("hash backend unavailable: {0}")]
    HashBackendUnavailable(String),

    /// A value could not be parsed into the scalar field.
    #[error("invalid field input {input:?}: {reason}")]
    InvalidFieldInput { input: String, reason: &'static str },

    /// Root or path requested over an empty leaf sequence.
    #[error("accumulator has no leaves")]
    EmptyAccumulator,

    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },

    /// A change output carries value but no secret was supplied to own it.
    #[error("{slot} secret must be provided when its amount ({amount}) is greater than zero")]
    MissingSecretForNonzeroAmount { slot: ChangeSlot, amount: FieldElement },

    /// Withdraw + Tx1 exceed the value of the spent note.
    #[error("overspend: note holds {available}, withdraw {withdraw} + Tx1 {tx1} exceeds it")]
    OverspendAttempt {
        available: FieldElement,
        withdraw: FieldElement,
        tx1: FieldElement,
    },

    /// Passthrough of a structured failure from the proving backend.
    #[error("proof generation failed: {kind} - {message}")]
    ProofBackendFailure { kind: String, message: String },

    /// An authentication path or snapshot does not resolve to the expected root.
    #[error("root mismatch: expected {expected}, computed {computed}")]
    RootMismatch {
        expected: FieldElement,
        computed: FieldElement,
    },

    #[error("authentication path has {len} siblings, the circuit accepts at most {max}")]
    PathTooLong { len: usize, max: usize },

    #[error("note commitment {commitment} not found among {leaves} leaves")]
    NoteNotFound { commitment: FieldElement, leaves: usize },

    #[error("ledger read failed: {0}")]
    LedgerUnavailable(String),

    /// The witness record could not be encoded for the proving backend.
    #[error("witness encoding failed: {0}")]
    WitnessEncoding(String),
}

impl PoolError {
    /// Whether refreshing the ledger snapshot and rebuilding the witness may
    /// succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PoolError::RootMismatch { .. }
                | PoolError::NoteNotFound { .. }
                | PoolError::LedgerUnavailable(_)
        )
    }
}

pub type Result<T, E = PoolError> = core::result::Result<T, E>;
