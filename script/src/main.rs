//! Note pool CLI.
//!
//! Subcommands:
//!   keygen   - Draw a fresh claiming key
//!   note     - Derive secret, commitment and nullifier of a note
//!   hash     - Hash two or three field elements
//!   root     - Accumulator root of a snapshot file
//!   path     - Authentication path for one leaf of a snapshot file
//!   locate   - Find a note in a snapshot file and check the snapshot's root
//!   witness  - Assemble a spend witness
//!   prove    - Send a witness to the external prover (PROVER_CMD)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use note_pool_lib::{
    generate_claiming_key, locate_note, prepare_spend, prove_spend, Asset, BackendLoader,
    FieldElement, MerkleAccumulator, Note, PairingRule, SpendIntent, SpendRequest, SpendWitness,
    SpendWitnessAssembler,
};
use note_pool_script::{read_json, setup_logger, write_json, CommandProver, SnapshotFile};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "note-pool")]
#[command(about = "Accounting tools for the shielded note pool")]
struct Cli {
    /// Pairing rule of the deployed pool
    #[arg(long, global = true, env = "PAIRING_RULE", default_value = "zero-identity")]
    rule: PairingRule,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a fresh claiming key
    Keygen,
    /// Derive the secret, commitment and nullifier of a note
    Note {
        #[arg(long)]
        key: FieldElement,
        #[arg(long)]
        owner: FieldElement,
        #[arg(long)]
        amount: FieldElement,
        #[arg(long)]
        token: FieldElement,
    },
    /// Hash two or three field elements, left to right
    Hash {
        #[arg(num_args = 2..=3, required = true)]
        values: Vec<FieldElement>,
    },
    /// Print the accumulator root of a snapshot file
    Root {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Print the authentication path of one leaf
    Path {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        index: usize,
    },
    /// Find a note (JSON file) in a snapshot
    Locate {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        note: PathBuf,
    },
    /// Assemble a spend witness, from a full request or from an intent plus a snapshot
    Witness {
        /// SpendRequest JSON (path and root included)
        #[arg(long, conflicts_with_all = ["intent", "snapshot"])]
        request: Option<PathBuf>,
        /// SpendIntent JSON
        #[arg(long, requires = "snapshot")]
        intent: Option<PathBuf>,
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Write the witness here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Prove a witness with PROVER_CMD
    Prove {
        #[arg(long)]
        witness: PathBuf,
        /// Write the proof here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct NoteOutput {
    secret: FieldElement,
    commitment: FieldElement,
    nullifier: FieldElement,
}

#[derive(Serialize)]
struct ProofOutput {
    proof: serde_json::Value,
    #[serde(rename = "publicInputs")]
    public_inputs: Vec<FieldElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calldata: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logger();
    let cli = Cli::parse();

    let hasher = BackendLoader::poseidon().handle().await?;
    let accumulator = MerkleAccumulator::new(hasher, cli.rule);

    match cli.command {
        Commands::Keygen => {
            println!("{}", generate_claiming_key(&mut rand::thread_rng()).to_hex());
        }
        Commands::Note {
            key,
            owner,
            amount,
            token,
        } => {
            let note = Note::new(key, owner, Asset::new(amount, token));
            let out = NoteOutput {
                secret: note.secret(accumulator.hasher())?,
                commitment: note.commitment(accumulator.hasher())?,
                nullifier: note.nullifier(accumulator.hasher())?,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Hash { values } => {
            let hasher = accumulator.hasher();
            let digest = match values.as_slice() {
                [a, b] => hasher.hash2(*a, *b)?,
                [a, b, c] => hasher.hash3(*a, *b, *c)?,
                _ => bail!("expected two or three values"),
            };
            println!("{digest}");
        }
        Commands::Root { snapshot } => {
            let snap: SnapshotFile = read_json(&snapshot)?;
            let root = accumulator.root(&snap.leaves)?;
            println!("Leaves: {}", snap.leaves.len());
            println!("Root:   {root}");
            if let Some(published) = snap.root {
                if published != root {
                    bail!("snapshot root {published} does not match computed root {root}");
                }
                println!("Published root matches");
            }
        }
        Commands::Path { snapshot, index } => {
            let snap: SnapshotFile = read_json(&snapshot)?;
            let path = accumulator.authentication_path(&snap.leaves, index)?;
            println!("{}", serde_json::to_string_pretty(&path)?);
        }
        Commands::Locate { snapshot, note } => {
            let snap = read_json::<SnapshotFile>(&snapshot)?.with_root(&accumulator)?;
            let note: Note = read_json(&note)?;
            let located = locate_note(&snap, &accumulator, &note).await?;
            println!("Commitment: {}", located.commitment);
            println!("Index:      {}", located.path.index);
            println!("Root:       {}", located.root);
            println!("{}", serde_json::to_string_pretty(&located.path)?);
        }
        Commands::Witness {
            request,
            intent,
            snapshot,
            output,
        } => {
            let assembler = SpendWitnessAssembler::new(accumulator);
            let mut rng = rand::thread_rng();
            let witness = match (request, intent, snapshot) {
                (Some(request), _, _) => {
                    let request: SpendRequest = read_json(&request)?;
                    assembler.assemble(&request, &mut rng)?
                }
                (None, Some(intent), Some(snapshot)) => {
                    let snap =
                        read_json::<SnapshotFile>(&snapshot)?.with_root(assembler.accumulator())?;
                    let intent: SpendIntent = read_json(&intent)?;
                    prepare_spend(&snap, &assembler, intent, &mut rng).await?
                }
                _ => bail!("pass --request, or --intent with --snapshot"),
            };
            emit(output, &witness)?;
        }
        Commands::Prove { witness, output } => {
            let witness: SpendWitness = read_json(&witness)?;
            let prover = CommandProver::from_env()?;
            let proof = prove_spend(&prover, &witness)
                .await
                .context("proving failed")?;
            let out = ProofOutput {
                proof: proof.proof,
                public_inputs: proof.public_inputs,
                calldata: proof.calldata.map(|c| format!("0x{}", hex::encode(c))),
            };
            emit(output, &out)?;
        }
    }

    Ok(())
}

fn emit<T: Serialize>(output: Option<PathBuf>, value: &T) -> Result<()> {
    match output {
        Some(path) => {
            write_json(&path, value)?;
            println!("Written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
