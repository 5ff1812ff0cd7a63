//! Proving backend that runs an external prover executable.
//!
//! The witness record is written to the child's stdin as JSON; the child
//! answers on stdout with a `ProofResponse` JSON document.

use std::path::PathBuf;
use std::process::Stdio;

use note_pool_lib::{PoolError, ProofResponse, ProvingBackend, Result, SpendWitness};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct CommandProver {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandProver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

fn failure(kind: &str, message: impl ToString) -> PoolError {
    PoolError::ProofBackendFailure {
        kind: kind.to_string(),
        message: message.to_string(),
    }
}

impl ProvingBackend for CommandProver {
    async fn prove(&self, witness: &SpendWitness) -> Result<ProofResponse> {
        let input = witness.to_json()?;
        debug!(program = %self.program.display(), bytes = input.len(), "spawning prover");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failure("spawn", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| failure("stdin", e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failure("wait", e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure(
                "exit",
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| failure("response", e))
    }
}
