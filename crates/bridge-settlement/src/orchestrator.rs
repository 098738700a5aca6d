//! Settlement attempt orchestration.
//!
//! One attempt runs commit → register → gate on free balance → submit →
//! confirm → poll, strictly in that order. Every phase change goes through
//! [`AttemptStateMachine`], and each id hash may drive at most one attempt.

use alloy::primitives::{TxHash, B256, U256};
use bridge_core::{
    parse_units, AttemptEvent, AttemptPhase, AttemptStateMachine, BridgeConfig, Commitment,
    CoreError, EscrowRequest, SettlementId, SettlementRecord, SettlementStatus,
};
use bridge_crypto::new_commitment;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::balance::BalanceOracle;
use crate::cancel::CancelToken;
use crate::error::SettlementError;
use crate::initiator::EscrowInitiator;
use crate::poller::{PollConfig, StatusPoller};
use crate::traits::{EscrowChain, SaltRegistry, StatusFeed};
use crate::types::{BalanceSnapshot, SubmissionReceipt};

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub email: String,
    /// Decimal amount as typed, e.g. `"12.34"`.
    pub amount: String,
    pub recipient_override: Option<String>,
}

/// Tunables for one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub amount_decimals: u8,
    pub confirmations: u64,
    pub confirmation_timeout: Duration,
    pub polling: PollConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for OrchestratorConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            amount_decimals: config.chain.amount_decimals,
            confirmations: config.chain.confirmations,
            confirmation_timeout: config.confirmation_timeout(),
            polling: PollConfig {
                interval: config.poll_interval(),
                max_attempts: config.polling.max_attempts,
                strict: config.polling.strict,
            },
        }
    }
}

/// Result of an attempt that reached polling.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub id_hash: B256,
    pub settlement_id: SettlementId,
    pub tx_hash: TxHash,
    pub receipt: SubmissionReceipt,
    pub status: SettlementStatus,
    /// Balances re-read after polling.
    pub balances: BalanceSnapshot,
}

impl SettlementOutcome {
    /// Single status line for the user.
    pub fn message(&self) -> String {
        match self.status {
            SettlementStatus::Completed => "Settlement completed".to_string(),
            SettlementStatus::Failed => "Settlement failed".to_string(),
            SettlementStatus::TimedOut => "Timeout reached. Check again later.".to_string(),
            SettlementStatus::Pending => "Transaction confirmed! Waiting for settlement...".to_string(),
        }
    }
}

/// Sequences settlement attempts.
pub struct SettlementOrchestrator {
    chain: Arc<dyn EscrowChain>,
    registry: Arc<dyn SaltRegistry>,
    oracle: BalanceOracle,
    initiator: EscrowInitiator,
    poller: StatusPoller,
    config: OrchestratorConfig,
    /// Single-use ledger: every id hash ever claimed and its latest phase.
    /// Entries live as long as the orchestrator; long-running hosts should
    /// recycle the orchestrator or call [`Self::forget_settled`].
    attempts: DashMap<B256, AttemptPhase>,
}

impl SettlementOrchestrator {
    pub fn new(
        chain: Arc<dyn EscrowChain>,
        registry: Arc<dyn SaltRegistry>,
        status_feed: Arc<dyn StatusFeed>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            oracle: BalanceOracle::new(chain.clone()),
            initiator: EscrowInitiator::new(
                chain.clone(),
                config.confirmations,
                config.confirmation_timeout,
            ),
            poller: StatusPoller::new(status_feed, config.polling),
            chain,
            registry,
            config,
            attempts: DashMap::new(),
        }
    }

    pub fn balances(&self) -> &BalanceOracle {
        &self.oracle
    }

    /// Latest phase of the attempt bound to `id_hash`.
    pub fn phase(&self, id_hash: &B256) -> Option<AttemptPhase> {
        self.attempts.get(id_hash).map(|p| *p)
    }

    /// Number of id hashes currently held by the ledger.
    pub fn ledger_len(&self) -> usize {
        self.attempts.len()
    }

    /// Drop ledger entries of attempts that reached a final phase and return
    /// how many were removed. In-flight attempts are kept. A forgotten id
    /// hash is no longer refused locally; the escrow contract still rejects
    /// a duplicate id on-chain.
    pub fn forget_settled(&self) -> usize {
        let before = self.attempts.len();
        self.attempts.retain(|_, phase| !phase.is_final());
        let removed = before.saturating_sub(self.attempts.len());
        tracing::debug!(removed, "pruned settled attempts");
        removed
    }

    /// Run one attempt with a freshly generated commitment.
    pub async fn execute(
        &self,
        intent: &PaymentIntent,
        cancel: &CancelToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        self.validate(intent)?;
        let commitment = new_commitment(self.chain.sender(), intent.email.trim())?;
        self.execute_with_commitment(intent, commitment, cancel).await
    }

    /// Run one attempt with a caller-supplied commitment.
    ///
    /// A commitment whose id hash was already used by this orchestrator is
    /// refused before any network call.
    pub async fn execute_with_commitment(
        &self,
        intent: &PaymentIntent,
        commitment: Commitment,
        cancel: &CancelToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        let amount = self.validate(intent)?;
        let id_hash = commitment.id_hash;

        match self.attempts.entry(id_hash) {
            Entry::Occupied(_) => {
                tracing::warn!(%id_hash, "refusing to reuse commitment");
                return Err(SettlementError::CommitmentReused(id_hash));
            }
            Entry::Vacant(slot) => {
                slot.insert(AttemptPhase::Committed);
            }
        }

        let span = tracing::info_span!("settlement", %id_hash, settlement_id = %commitment.settlement_id);
        let result = self
            .run(intent, amount, &commitment, cancel)
            .instrument(span)
            .await;

        if let Err(err) = &result {
            let phase = self.phase(&id_hash);
            if let Err(e) = self.advance(id_hash, AttemptEvent::Aborted) {
                tracing::debug!(%id_hash, error = %e, "attempt already closed");
            }
            tracing::warn!(%id_hash, ?phase, error = %err, "settlement attempt aborted");
        }
        result
    }

    fn validate(&self, intent: &PaymentIntent) -> Result<U256, SettlementError> {
        if intent.email.trim().is_empty() {
            return Err(SettlementError::InvalidInput("email is required".into()));
        }
        let amount = parse_units(&intent.amount, self.config.amount_decimals)
            .map_err(SettlementError::InvalidAmount)?;
        if amount.is_zero() {
            return Err(SettlementError::InvalidAmount(CoreError::InvalidAmount(
                "amount must be greater than zero".into(),
            )));
        }
        Ok(amount)
    }

    async fn run(
        &self,
        intent: &PaymentIntent,
        amount: U256,
        commitment: &Commitment,
        cancel: &CancelToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        let id_hash = commitment.id_hash;
        let email = intent.email.trim();

        self.checkpoint(cancel, false)?;
        let recipient_email = self
            .chain
            .recipient_email()
            .await
            .map_err(SettlementError::ChainRead)?;

        let record = SettlementRecord::new(commitment, email, &recipient_email);
        self.registry
            .store_salt(&record)
            .await
            .map_err(SettlementError::RegistrationFailure)?;
        drop(record);
        self.advance(id_hash, AttemptEvent::RegistrationSucceeded)?;

        self.checkpoint(cancel, false)?;
        let free = self
            .oracle
            .free_balance()
            .await
            .map_err(SettlementError::BalanceUnavailable)?;
        self.checkpoint(cancel, false)?;

        let request = EscrowRequest::new(commitment, amount, intent.recipient_override.clone());
        let pending = self.initiator.submit(&request, free.raw, cancel).await?;
        self.advance(id_hash, AttemptEvent::Broadcast)?;

        let receipt = self.initiator.confirm(&pending).await?;
        self.advance(id_hash, AttemptEvent::ConfirmationObserved)?;
        tracing::info!(tx_hash = %receipt.tx_hash, "Transaction confirmed! Waiting for settlement...");

        let status = self.poller.poll(id_hash, cancel).await?;
        self.advance(id_hash, AttemptEvent::TerminalStatusReached)?;

        let balances = self.oracle.snapshot().await;

        Ok(SettlementOutcome {
            id_hash,
            settlement_id: commitment.settlement_id.clone(),
            tx_hash: receipt.tx_hash,
            receipt,
            status,
            balances,
        })
    }

    fn checkpoint(&self, cancel: &CancelToken, broadcast: bool) -> Result<(), SettlementError> {
        if cancel.is_cancelled() {
            return Err(SettlementError::Cancelled { broadcast });
        }
        Ok(())
    }

    fn advance(&self, id_hash: B256, event: AttemptEvent) -> Result<AttemptPhase, SettlementError> {
        let mut phase = self
            .attempts
            .get_mut(&id_hash)
            .ok_or_else(|| SettlementError::Internal(format!("no attempt for {id_hash}")))?;
        let next = AttemptStateMachine::transition(*phase, event)?;
        *phase = next;
        Ok(next)
    }
}
