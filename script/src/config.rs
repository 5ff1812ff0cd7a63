//! Environment-driven configuration.
//!
//! Values come from the process environment after `.env` has been loaded.
//!
//! Required for on-chain commands:
//!   RPC_URL        JSON-RPC endpoint
//!   PRIVATE_KEY    funded wallet key, signs the withdraw transaction
//!   POOL_ADDRESS   deployed note pool contract
//!   PROVER_CMD     external prover executable
//!
//! Optional:
//!   PROVER_ARGS    extra arguments for PROVER_CMD, whitespace separated
//!   PAIRING_RULE   `zero-identity` (default) or `odd-parity`
//!   NOTE_FILE      spend intent JSON (default: fixtures/note.json)
//!   MAX_ATTEMPTS   witness rebuilds on a stale snapshot (default: 3)

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use note_pool_lib::PairingRule;

use crate::command_prover::CommandProver;

#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub pool_address: Address,
    pub pairing_rule: PairingRule,
    pub note_file: PathBuf,
    pub max_attempts: u32,
}

impl PoolConfig {
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL").context("RPC_URL not set")?;
        let private_key = std::env::var("PRIVATE_KEY").context("PRIVATE_KEY not set")?;
        let pool_address: Address = std::env::var("POOL_ADDRESS")
            .context("POOL_ADDRESS not set")?
            .parse()
            .context("POOL_ADDRESS is not an address")?;
        let note_file = std::env::var("NOTE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_fixture("note.json"));
        let max_attempts: u32 = std::env::var("MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .context("MAX_ATTEMPTS must be a number")?;

        Ok(Self {
            rpc_url,
            private_key,
            pool_address,
            pairing_rule: pairing_rule_from_env()?,
            note_file,
            max_attempts: max_attempts.max(1),
        })
    }
}

pub fn pairing_rule_from_env() -> Result<PairingRule> {
    match std::env::var("PAIRING_RULE") {
        Ok(raw) => raw.parse().map_err(anyhow::Error::msg),
        Err(_) => Ok(PairingRule::default()),
    }
}

impl CommandProver {
    pub fn from_env() -> Result<Self> {
        let program = std::env::var("PROVER_CMD").context("PROVER_CMD not set")?;
        let args = std::env::var("PROVER_ARGS")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Ok(CommandProver::new(program).with_args(args))
    }
}

/// `<workspace>/fixtures/<name>`.
pub fn default_fixture(name: &str) -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .unwrap_or(manifest)
        .join("fixtures")
        .join(name)
}
