use alloy::primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use bridge_core::{SettlementRecord, SettlementStatus};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{ChainError, RegistryError, StatusError};
use crate::initiator::{InitiationCall, PreparedSubmission};
use crate::traits::{EscrowChain, SaltRegistry, StatusFeed};
use crate::types::CallForm;

/// An externally visible side effect recorded by the in-memory adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    StoreSalt(B256),
    FreeBalanceRead,
    Submit { id_hash: B256, form: CallForm },
    StatusRequest(B256),
}

/// Shared, ordered record of [`CallEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<CallEvent>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: CallEvent) {
        self.lock().push(event);
    }

    pub fn events(&self) -> Vec<CallEvent> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CallEvent>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An escrow opened on the in-memory contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEscrow {
    pub email_hash: B256,
    pub amount: U256,
    pub payer: Address,
    pub recipient: Option<Address>,
}

/// In-memory escrow contract and settlement token.
///
/// Mirrors the contract rules the client depends on: amount limits, unique
/// id hashes, and escrows locking part of the free balance.
pub struct MemoryEscrow {
    sender: Address,
    token: Address,
    decimals: u8,
    recipient_email: String,
    min_amount: U256,
    max_amount: U256,
    wallet_balance: U256,
    free_balance: Mutex<U256>,
    escrows: DashMap<B256, OpenEscrow>,
    mined: DashMap<TxHash, u64>,
    nonce: AtomicU64,
    reject_signatures: bool,
    unreadable_free_balance: bool,
    confirmation_delay: Option<Duration>,
    signing_delay: Option<Duration>,
    free_balance_delay: Option<Duration>,
    log: CallLog,
}

impl MemoryEscrow {
    pub fn new(sender: Address, log: CallLog) -> Self {
        Self {
            sender,
            token: Address::repeat_byte(0xcc),
            decimals: 6,
            recipient_email: "recipient@example.com".into(),
            min_amount: U256::from(1u8),
            max_amount: U256::MAX,
            wallet_balance: U256::ZERO,
            free_balance: Mutex::new(U256::ZERO),
            escrows: DashMap::new(),
            mined: DashMap::new(),
            nonce: AtomicU64::new(0),
            reject_signatures: false,
            unreadable_free_balance: false,
            confirmation_delay: None,
            signing_delay: None,
            free_balance_delay: None,
            log,
        }
    }

    pub fn with_free_balance(self, free: U256) -> Self {
        *self.free() = free;
        self
    }

    pub fn with_wallet_balance(mut self, balance: U256) -> Self {
        self.wallet_balance = balance;
        self
    }

    pub fn with_limits(mut self, min: U256, max: U256) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn with_recipient_email(mut self, email: impl Into<String>) -> Self {
        self.recipient_email = email.into();
        self
    }

    /// Every signing request is declined, as if the user closed the wallet prompt.
    pub fn rejecting_signatures(mut self) -> Self {
        self.reject_signatures = true;
        self
    }

    /// Free-balance reads fail with an RPC error.
    pub fn with_unreadable_free_balance(mut self) -> Self {
        self.unreadable_free_balance = true;
        self
    }

    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = Some(delay);
        self
    }

    /// Preparing a transaction takes `delay`, like a slow gas estimate or a
    /// wallet prompt left open.
    pub fn with_signing_delay(mut self, delay: Duration) -> Self {
        self.signing_delay = Some(delay);
        self
    }

    pub fn with_free_balance_delay(mut self, delay: Duration) -> Self {
        self.free_balance_delay = Some(delay);
        self
    }

    pub fn escrow(&self, id_hash: &B256) -> Option<OpenEscrow> {
        self.escrows.get(id_hash).map(|e| e.clone())
    }

    pub fn escrow_count(&self) -> usize {
        self.escrows.len()
    }

    fn free(&self) -> MutexGuard<'_, U256> {
        self.free_balance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Contract-side checks, as a gas estimate would surface them.
    fn check(&self, call: &InitiationCall, free: U256) -> Result<(), ChainError> {
        let amount = call.amount();
        if amount < self.min_amount || amount > self.max_amount {
            return Err(ChainError::Reverted("amount outside escrow limits".into()));
        }
        if amount > free {
            return Err(ChainError::Reverted("insufficient free balance".into()));
        }
        if self.escrows.contains_key(&call.id_hash()) {
            return Err(ChainError::Reverted("escrow id already exists".into()));
        }
        Ok(())
    }

    fn locked_total(&self) -> U256 {
        self.escrows
            .iter()
            .fold(U256::ZERO, |acc, e| acc.saturating_add(e.amount))
    }
}

#[async_trait]
impl EscrowChain for MemoryEscrow {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn recipient_email(&self) -> Result<String, ChainError> {
        Ok(self.recipient_email.clone())
    }

    async fn token_address(&self) -> Result<Address, ChainError> {
        Ok(self.token)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, ChainError> {
        if token != self.token {
            return Err(ChainError::Rpc(format!("no token at {token}")));
        }
        Ok(self.decimals)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        if token != self.token {
            return Err(ChainError::Rpc(format!("no token at {token}")));
        }
        if owner == self.sender {
            Ok(self.wallet_balance)
        } else {
            Ok(U256::ZERO)
        }
    }

    async fn contract_token_balance(&self) -> Result<U256, ChainError> {
        Ok(self.free().saturating_add(self.locked_total()))
    }

    async fn free_balance(&self) -> Result<U256, ChainError> {
        self.log.record(CallEvent::FreeBalanceRead);
        if let Some(delay) = self.free_balance_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreadable_free_balance {
            return Err(ChainError::Rpc("free balance read failed".into()));
        }
        Ok(*self.free())
    }

    async fn prepare(&self, call: &InitiationCall) -> Result<PreparedSubmission, ChainError> {
        if let Some(delay) = self.signing_delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject_signatures {
            return Err(ChainError::SignerRejected);
        }
        let free = *self.free();
        self.check(call, free)?;
        Ok(PreparedSubmission {
            call: call.clone(),
            raw: Bytes::new(),
        })
    }

    async fn broadcast(&self, prepared: PreparedSubmission) -> Result<TxHash, ChainError> {
        let call = prepared.call;
        let id_hash = call.id_hash();
        let amount = call.amount();
        self.log.record(CallEvent::Submit {
            id_hash,
            form: call.form(),
        });

        let mut free = self.free();
        self.check(&call, *free)?;
        match self.escrows.entry(id_hash) {
            Entry::Occupied(_) => {
                return Err(ChainError::Reverted("escrow id already exists".into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(OpenEscrow {
                    email_hash: call.email_hash(),
                    amount,
                    payer: self.sender,
                    recipient: call.recipient(),
                });
            }
        }
        *free -= amount;
        drop(free);

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = id_hash.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let tx_hash = keccak256(&preimage);
        self.mined.insert(tx_hash, nonce + 1);

        tracing::debug!(%id_hash, %tx_hash, "memory escrow opened");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        _confirmations: u64,
    ) -> Result<Option<u64>, ChainError> {
        if let Some(delay) = self.confirmation_delay {
            tokio::time::sleep(delay).await;
        }
        self.mined
            .get(&tx_hash)
            .map(|block| Some(*block))
            .ok_or_else(|| ChainError::Rpc(format!("unknown transaction {tx_hash}")))
    }
}

/// In-memory salt registry.
pub struct MemoryRegistry {
    records: DashMap<B256, SettlementRecord>,
    failure: Option<RegistryError>,
    log: CallLog,
}

impl MemoryRegistry {
    pub fn new(log: CallLog) -> Self {
        Self {
            records: DashMap::new(),
            failure: None,
            log,
        }
    }

    /// A registry that refuses every record with `error`.
    pub fn failing(log: CallLog, error: RegistryError) -> Self {
        Self {
            records: DashMap::new(),
            failure: Some(error),
            log,
        }
    }

    pub fn record(&self, id_hash: &B256) -> Option<SettlementRecord> {
        self.records.get(id_hash).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SaltRegistry for MemoryRegistry {
    async fn store_salt(&self, record: &SettlementRecord) -> Result<(), RegistryError> {
        self.log.record(CallEvent::StoreSalt(record.id_hash));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.records.insert(record.id_hash, record.clone());
        Ok(())
    }
}

/// Status feed that replays a fixed script, then reports `Pending`.
pub struct ScriptedStatusFeed {
    script: Mutex<VecDeque<Result<SettlementStatus, StatusError>>>,
    requests: AtomicUsize,
    log: Option<CallLog>,
}

impl ScriptedStatusFeed {
    pub fn new(script: impl IntoIterator<Item = Result<SettlementStatus, StatusError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: AtomicUsize::new(0),
            log: None,
        }
    }

    /// Always `Pending`.
    pub fn pending() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Number of status requests served so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusFeed for ScriptedStatusFeed {
    async fn fetch_status(&self, escrow_id: B256) -> Result<SettlementStatus, StatusError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(CallEvent::StatusRequest(escrow_id));
        }
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(SettlementStatus::Pending))
    }
}
