//! Escrow initiation.
//!
//! Selects the `initPayment` overload, enforces the free-balance precondition
//! before anything is signed, and bounds the confirmation wait. Cancellation
//! is honoured up to the moment the signed transaction is handed to the node.

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use bridge_core::{parse_recipient, CoreError, EscrowRequest};
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{ChainError, SettlementError};
use crate::traits::EscrowChain;
use crate::types::{CallForm, SubmissionReceipt};

/// A fully resolved contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiationCall {
    Plain {
        id_hash: B256,
        email_hash: B256,
        amount: U256,
    },
    RecipientOverride {
        id_hash: B256,
        email_hash: B256,
        amount: U256,
        recipient: Address,
    },
}

impl InitiationCall {
    /// Pick the overload for `request`. A missing, blank or malformed
    /// override falls back to the plain form.
    pub fn from_request(request: &EscrowRequest) -> Self {
        match parse_recipient(request.recipient_override.as_deref()) {
            Some(recipient) => Self::RecipientOverride {
                id_hash: request.id_hash,
                email_hash: request.email_hash,
                amount: request.amount,
                recipient,
            },
            None => Self::Plain {
                id_hash: request.id_hash,
                email_hash: request.email_hash,
                amount: request.amount,
            },
        }
    }

    pub fn id_hash(&self) -> B256 {
        match self {
            Self::Plain { id_hash, .. } | Self::RecipientOverride { id_hash, .. } => *id_hash,
        }
    }

    pub fn email_hash(&self) -> B256 {
        match self {
            Self::Plain { email_hash, .. } | Self::RecipientOverride { email_hash, .. } => {
                *email_hash
            }
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            Self::Plain { amount, .. } | Self::RecipientOverride { amount, .. } => *amount,
        }
    }

    pub fn recipient(&self) -> Option<Address> {
        match self {
            Self::Plain { .. } => None,
            Self::RecipientOverride { recipient, .. } => Some(*recipient),
        }
    }

    pub fn form(&self) -> CallForm {
        match self {
            Self::Plain { .. } => CallForm::Plain,
            Self::RecipientOverride { .. } => CallForm::RecipientOverride,
        }
    }
}

/// A signed initiation that has not been sent yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSubmission {
    pub call: InitiationCall,
    /// EIP-2718 encoded signed transaction. Empty for backends that sign on
    /// broadcast.
    pub raw: Bytes,
}

/// A transaction the node accepted but whose confirmation is still open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEscrow {
    pub tx_hash: TxHash,
    pub call: InitiationCall,
}

/// Submits escrow initiations to an [`EscrowChain`].
pub struct EscrowInitiator {
    chain: Arc<dyn EscrowChain>,
    confirmations: u64,
    confirmation_timeout: Duration,
}

impl EscrowInitiator {
    pub fn new(chain: Arc<dyn EscrowChain>, confirmations: u64, confirmation_timeout: Duration) -> Self {
        Self {
            chain,
            confirmations,
            confirmation_timeout,
        }
    }

    /// Check the precondition, then sign and broadcast.
    ///
    /// Nothing is submitted when `request.amount` is zero or exceeds
    /// `free_balance`, or when `cancel` fires before the broadcast starts.
    pub async fn submit(
        &self,
        request: &EscrowRequest,
        free_balance: U256,
        cancel: &CancelToken,
    ) -> Result<PendingEscrow, SettlementError> {
        if request.amount.is_zero() {
            return Err(SettlementError::InvalidAmount(CoreError::InvalidAmount(
                "amount must be greater than zero".into(),
            )));
        }
        if request.amount > free_balance {
            return Err(SettlementError::PreconditionFailure {
                requested: request.amount,
                available: free_balance,
            });
        }

        let call = InitiationCall::from_request(request);
        tracing::info!(
            id_hash = %call.id_hash(),
            amount = %call.amount(),
            form = %call.form(),
            "submitting escrow initiation"
        );

        let prepared = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(id_hash = %call.id_hash(), "cancelled while preparing transaction");
                return Err(SettlementError::Cancelled { broadcast: false });
            }
            prepared = self.chain.prepare(&call) => prepared.map_err(pre_broadcast_error)?,
        };
        if cancel.is_cancelled() {
            return Err(SettlementError::Cancelled { broadcast: false });
        }

        let tx_hash = self
            .chain
            .broadcast(prepared)
            .await
            .map_err(pre_broadcast_error)?;

        tracing::info!(%tx_hash, "escrow transaction broadcast");
        Ok(PendingEscrow { tx_hash, call })
    }

    /// Wait, bounded by the configured timeout, for the required confirmations.
    pub async fn confirm(&self, pending: &PendingEscrow) -> Result<SubmissionReceipt, SettlementError> {
        let tx_hash = pending.tx_hash;
        let wait = self.chain.wait_for_confirmation(tx_hash, self.confirmations);

        match tokio::time::timeout(self.confirmation_timeout, wait).await {
            Err(_) => {
                tracing::warn!(%tx_hash, timeout_secs = self.confirmation_timeout.as_secs(), "confirmation timed out");
                Err(SettlementError::ConfirmationTimeout {
                    tx_hash,
                    waited: self.confirmation_timeout,
                })
            }
            Ok(Err(source)) => Err(SettlementError::SubmissionFailure {
                tx_hash: Some(tx_hash),
                source,
            }),
            Ok(Ok(block_number)) => {
                tracing::info!(%tx_hash, ?block_number, "escrow transaction confirmed");
                Ok(SubmissionReceipt {
                    tx_hash,
                    block_number,
                    form: pending.call.form(),
                })
            }
        }
    }

    /// Submit and confirm in one step.
    pub async fn initiate(
        &self,
        request: &EscrowRequest,
        free_balance: U256,
        cancel: &CancelToken,
    ) -> Result<SubmissionReceipt, SettlementError> {
        let pending = self.submit(request, free_balance, cancel).await?;
        self.confirm(&pending).await
    }
}

fn pre_broadcast_error(err: ChainError) -> SettlementError {
    match err {
        ChainError::SignerRejected => SettlementError::UserAbort,
        source => SettlementError::SubmissionFailure {
            tx_hash: None,
            source,
        },
    }
}
