//! Field hash primitive.
//!
//! The pool only needs a 2-input hash over the scalar field; the 3-input form
//! is defined on top of it as `hash2(hash2(a, b), c)`. That association order
//! is part of the protocol and must not change.

use std::sync::Arc;

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{PoolError, Result};
use crate::field::FieldElement;

/// `hash2(1, 2)` for circom-compatible Poseidon over BN254.
const POSEIDON_1_2: &str =
    "7853200120776062878684798364095072458815029376092732009249414926327459813530";

/// A deterministic, collision-resistant hash over the full scalar field.
pub trait HashBackend: Send + Sync {
    fn hash2(&self, a: FieldElement, b: FieldElement) -> Result<FieldElement>;

    /// Left-associative: `hash2(hash2(a, b), c)`.
    fn hash3(&self, a: FieldElement, b: FieldElement, c: FieldElement) -> Result<FieldElement> {
        let ab = self.hash2(a, b)?;
        self.hash2(ab, c)
    }
}

/// Caller-held handle to a ready hash backend.
pub type HashHandle = Arc<dyn HashBackend>;

/// Poseidon over BN254 with circom parameters (width 3), as used by the
/// circuit and the pool contract.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseidonBn254;

impl HashBackend for PoseidonBn254 {
    fn hash2(&self, a: FieldElement, b: FieldElement) -> Result<FieldElement> {
        let mut poseidon = Poseidon::<Fr>::new_circom(2)
            .map_err(|e| PoolError::HashBackendUnavailable(e.to_string()))?;
        poseidon
            .hash(&[Fr::from(a), Fr::from(b)])
            .map(FieldElement::from)
            .map_err(|e| PoolError::HashBackendUnavailable(e.to_string()))
    }
}

/// Build the Poseidon backend and check it against a known vector before
/// handing it out.
pub fn init_poseidon() -> Result<HashHandle> {
    let backend = PoseidonBn254;
    let check = backend.hash2(FieldElement::from(1u64), FieldElement::from(2u64))?;
    let expected = FieldElement::parse(POSEIDON_1_2)?;
    if check != expected {
        return Err(PoolError::HashBackendUnavailable(format!(
            "poseidon self-check failed: hash2(1, 2) = {check}"
        )));
    }
    Ok(Arc::new(backend))
}

/// One-time, race-free initialization of a hash backend.
///
/// Concurrent callers of [`BackendLoader::handle`] all await the same
/// in-flight initialization; at most one initializer runs at a time and a
/// successful result is shared by every later caller.
pub struct BackendLoader {
    init: fn() -> Result<HashHandle>,
    cell: OnceCell<HashHandle>,
}

impl BackendLoader {
    pub fn new(init: fn() -> Result<HashHandle>) -> Self {
        Self {
            init,
            cell: OnceCell::new(),
        }
    }

    pub fn poseidon() -> Self {
        Self::new(init_poseidon)
    }

    /// Wait for the backend, initializing it if nobody has yet.
    pub async fn handle(&self) -> Result<HashHandle> {
        let init = self.init;
        self.cell
            .get_or_try_init(|| async move {
                debug!("initializing hash backend");
                let handle = init()?;
                info!("hash backend ready");
                Ok::<_, PoolError>(handle)
            })
            .await
            .cloned()
    }

    /// The backend if it is already initialized. Never triggers initialization.
    pub fn get(&self) -> Result<HashHandle> {
        self.cell
            .get()
            .cloned()
            .ok_or_else(|| PoolError::HashBackendUnavailable("backend not initialized".into()))
    }

    /// Drop the current backend so the next [`handle`](Self::handle) call
    /// initializes again.
    pub fn reset(&mut self) {
        self.cell.take();
    }
}

impl Default for BackendLoader {
    fn default() -> Self {
        Self::poseidon()
    }
}
