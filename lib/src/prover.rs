//! Boundary with the external proving backend.
//!
//! The backend receives the witness record as JSON and answers with either a
//! proof plus public inputs or a structured failure. Proof internals are
//! opaque here and are passed through untouched.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PoolError, Result};
use crate::field::FieldElement;
use crate::witness::SpendWitness;

/// Backend answer, tagged by `status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProofResponse {
    Success {
        proof: serde_json::Value,
        #[serde(rename = "publicInputs")]
        public_inputs: Vec<FieldElement>,
        /// Contract calldata, when the backend derives it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        calldata: Option<String>,
    },
    Error {
        error: String,
        message: String,
    },
}

/// A proof accepted from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct SpendProof {
    pub proof: serde_json::Value,
    pub public_inputs: Vec<FieldElement>,
    pub calldata: Option<Vec<u8>>,
}

/// Something that turns a witness into a proof.
pub trait ProvingBackend {
    fn prove(&self, witness: &SpendWitness) -> impl Future<Output = Result<ProofResponse>> + Send;
}

/// Prove `witness` and unwrap the response. Failures are surfaced verbatim;
/// nothing is retried here.
pub async fn prove_spend<P: ProvingBackend>(
    backend: &P,
    witness: &SpendWitness,
) -> Result<SpendProof> {
    match backend.prove(witness).await? {
        ProofResponse::Success {
            proof,
            public_inputs,
            calldata,
        } => {
            let calldata = calldata.map(|hex_str| decode_calldata(&hex_str)).transpose()?;
            info!(public_inputs = public_inputs.len(), "proof generated");
            Ok(SpendProof {
                proof,
                public_inputs,
                calldata,
            })
        }
        ProofResponse::Error { error, message } => {
            warn!(%error, %message, "proving backend rejected witness");
            Err(PoolError::ProofBackendFailure {
                kind: error,
                message,
            })
        }
    }
}

fn decode_calldata(hex_str: &str) -> Result<Vec<u8>> {
    let digits = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(digits).map_err(|e| PoolError::ProofBackendFailure {
        kind: "calldata".into(),
        message: e.to_string(),
    })
}
