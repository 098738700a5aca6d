use alloy::primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;
use bridge_core::{SettlementRecord, SettlementStatus};

use crate::error::{ChainError, RegistryError, StatusError};
use crate::initiator::{InitiationCall, PreparedSubmission};

/// Escrow contract and token reads plus escrow submission.
///
/// Each implementation talks to one concrete backend (a JSON-RPC node, an
/// in-memory ledger for tests and dry runs).
#[async_trait]
pub trait EscrowChain: Send + Sync {
    /// Address that signs and pays for submissions.
    fn sender(&self) -> Address;

    /// Off-chain recipient identity configured on the escrow contract.
    async fn recipient_email(&self) -> Result<String, ChainError>;

    /// Settlement token the escrow contract holds.
    async fn token_address(&self) -> Result<Address, ChainError>;

    async fn token_decimals(&self, token: Address) -> Result<u8, ChainError>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    /// Token balance held by the escrow contract.
    async fn contract_token_balance(&self) -> Result<U256, ChainError>;

    /// Contract balance not yet committed to open escrows.
    async fn free_balance(&self) -> Result<U256, ChainError>;

    /// Estimate, fill and sign an escrow initiation without sending it.
    /// Only read-only node calls happen here; a call the contract would
    /// reject fails with [`ChainError::Reverted`].
    async fn prepare(&self, call: &InitiationCall) -> Result<PreparedSubmission, ChainError>;

    /// Hand a prepared transaction to the node. Returns once the node has
    /// accepted it.
    async fn broadcast(&self, prepared: PreparedSubmission) -> Result<TxHash, ChainError>;

    /// Prepare and broadcast in one step.
    async fn submit(&self, call: &InitiationCall) -> Result<TxHash, ChainError> {
        let prepared = self.prepare(call).await?;
        self.broadcast(prepared).await
    }

    /// Wait for `confirmations` blocks on top of `tx_hash` and return the
    /// inclusion block. Unbounded; callers apply their own timeout. A mined
    /// but failed transaction is reported as [`ChainError::Reverted`].
    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<Option<u64>, ChainError>;
}

/// Off-chain store of reveal material.
#[async_trait]
pub trait SaltRegistry: Send + Sync {
    /// Persist the reveal material for one commitment. Succeeds only when the
    /// registry acknowledged the record.
    async fn store_salt(&self, record: &SettlementRecord) -> Result<(), RegistryError>;
}

/// One-shot settlement status lookup.
#[async_trait]
pub trait StatusFeed: Send + Sync {
    async fn fetch_status(&self, escrow_id: B256) -> Result<SettlementStatus, StatusError>;
}
