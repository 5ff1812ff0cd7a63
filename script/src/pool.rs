//! Note pool contract access through alloy.

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    providers::Provider,
    sol,
};
use anyhow::Result;
use note_pool_lib::{FieldElement, LedgerReader, PoolError};

// ---------------------------------------------------------------------------
// Contract bindings
// ---------------------------------------------------------------------------

sol! {
    #[sol(rpc)]
    interface INotePool {
        function getLeaves() external view returns (uint256[] memory);
        function getRoot() external view returns (uint256);
        function isSpent(uint256 nullifier) external view returns (bool);
        function withdraw(bytes calldata proof, uint256[] calldata publicInputs) external;
    }
}

pub fn field_to_u256(v: FieldElement) -> U256 {
    U256::from_be_bytes(v.to_be_bytes())
}

pub fn u256_to_field(v: U256) -> FieldElement {
    FieldElement::from_be_bytes_mod_order(&v.to_be_bytes::<32>())
}

/// Ledger reads and withdraw submission against a deployed pool.
pub struct PoolLedger<P> {
    pool: INotePool::INotePoolInstance<P>,
}

impl<P: Provider + Clone> PoolLedger<P> {
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            pool: INotePool::new(address, provider),
        }
    }

    pub async fn is_spent(&self, nullifier: FieldElement) -> Result<bool> {
        Ok(self.pool.isSpent(field_to_u256(nullifier)).call().await?)
    }

    /// Send the withdraw transaction and wait for its receipt.
    pub async fn submit_withdraw(
        &self,
        calldata: Vec<u8>,
        public_inputs: &[FieldElement],
    ) -> Result<TxHash> {
        let inputs: Vec<U256> = public_inputs.iter().copied().map(field_to_u256).collect();
        let tx = self
            .pool
            .withdraw(Bytes::from(calldata), inputs)
            .send()
            .await?;
        let receipt = tx.get_receipt().await?;
        Ok(receipt.transaction_hash)
    }
}

impl<P: Provider + Clone> LedgerReader for PoolLedger<P> {
    async fn fetch_leaves(&self) -> note_pool_lib::Result<Vec<FieldElement>> {
        let leaves: Vec<U256> = self
            .pool
            .getLeaves()
            .call()
            .await
            .map_err(|e| PoolError::LedgerUnavailable(e.to_string()))?;
        Ok(leaves.into_iter().map(u256_to_field).collect())
    }

    async fn fetch_root(&self) -> note_pool_lib::Result<FieldElement> {
        let root: U256 = self
            .pool
            .getRoot()
            .call()
            .await
            .map_err(|e| PoolError::LedgerUnavailable(e.to_string()))?;
        Ok(u256_to_field(root))
    }
}
