//! Withdraw script: spend one note from the pool.
//!
//! Reads a spend intent from NOTE_FILE, builds the witness against the
//! on-chain leaves, proves it with PROVER_CMD and submits the withdrawal.
//!
//! Usage:
//!   cargo run --release -p note-pool-script --bin withdraw
//!
//! See `note_pool_script::config` for the environment it reads.

use std::time::Duration;

use alloy::{providers::ProviderBuilder, signers::local::PrivateKeySigner};
use anyhow::{bail, Context, Result};
use note_pool_lib::{
    prepare_spend, prove_spend, BackendLoader, MerkleAccumulator, SpendIntent,
    SpendWitnessAssembler,
};
use note_pool_script::{read_json, setup_logger, CommandProver, PoolConfig, PoolLedger};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logger();

    println!("\n=== Note Pool Withdraw ===\n");

    // ── Load config ────────────────────────────────────────────────────
    let config = PoolConfig::from_env()?;
    let prover = CommandProver::from_env()?;
    println!("Pool:         {}", config.pool_address);
    println!("Pairing rule: {:?}", config.pairing_rule);
    println!("Note file:    {}", config.note_file.display());

    let intent: SpendIntent = read_json(&config.note_file)?;

    // ── Connect ────────────────────────────────────────────────────────
    let signer: PrivateKeySigner = config.private_key.parse().context("invalid PRIVATE_KEY")?;
    println!("Wallet:       {}", signer.address());
    let provider = ProviderBuilder::new()
        .wallet(signer)
        .connect_http(config.rpc_url.parse().context("invalid RPC_URL")?);
    let pool = PoolLedger::new(config.pool_address, provider);

    let hasher = BackendLoader::poseidon().handle().await?;
    let assembler = SpendWitnessAssembler::new(MerkleAccumulator::new(hasher, config.pairing_rule));

    // ── Spent check ────────────────────────────────────────────────────
    let nullifier = intent.note.nullifier(assembler.accumulator().hasher())?;
    println!("\n[1] Nullifier {nullifier}");
    if pool.is_spent(nullifier).await? {
        bail!("note already spent");
    }
    println!("    Unspent");

    // ── Witness ────────────────────────────────────────────────────────
    println!("\n[2] Building witness from on-chain leaves...");
    let mut rng = rand::thread_rng();
    let mut attempt = 1;
    let witness = loop {
        match prepare_spend(&pool, &assembler, intent.clone(), &mut rng).await {
            Ok(witness) => break witness,
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                warn!(attempt, %err, "ledger moved, fetching again");
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    };
    println!("    Root:       {}", witness.merkle_root);
    println!("    Withdraw:   {}", witness.withdraw.amount);
    println!("    Change 1:   {} -> {}", witness.tx1_amount, witness.tx1);
    println!("    Change 2:   {} -> {}", witness.tx2_amount, witness.tx2);

    // ── Prove ──────────────────────────────────────────────────────────
    println!("\n[3] Proving...");
    let proof = prove_spend(&prover, &witness).await?;
    let calldata = proof
        .calldata
        .context("prover response carries no calldata")?;
    println!("    Public inputs: {}", proof.public_inputs.len());

    // ── Submit ─────────────────────────────────────────────────────────
    println!("\n[4] Submitting withdrawal...");
    let tx_hash = pool.submit_withdraw(calldata, &proof.public_inputs).await?;
    println!("    Tx: {tx_hash}");

    println!("\n=== Done ===");
    Ok(())
}
