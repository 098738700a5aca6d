use alloy::primitives::{TxHash, B256, U256};
use bridge_core::{format_units, CoreError, PAYMENT_DECIMALS};
use bridge_crypto::CryptoError;
use std::time::Duration;

/// Errors reported by an escrow chain adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    /// The wallet declined to sign.
    #[error("signer rejected the request")]
    SignerRejected,

    /// Node or transport failure; may succeed if retried.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The contract reverted (limits, authorization, duplicate id hash).
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// The node answered with data that could not be decoded.
    #[error("undecodable chain response: {0}")]
    Decode(String),
}

/// Errors from the salt registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Transport(String),

    #[error("registry rejected the record (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Errors from one settlement status request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StatusError {
    #[error("status service unreachable: {0}")]
    Transport(String),

    #[error("status service returned HTTP {0}")]
    Http(u16),

    #[error("malformed status response: {0}")]
    Malformed(String),
}

/// Errors from the bridge read API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bridge api unreachable: {0}")]
    Transport(String),

    #[error("bridge api returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("undecodable bridge api response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from signer resolution.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("no signer available: pass --private-key, set ESCROW_BRIDGE_PRIVATE_KEY or configure wallet.key_file")]
    NoSigner,

    #[error("malformed private key from {0}")]
    MalformedKey(String),

    #[error("failed to read key file: {0}")]
    KeyFile(#[from] std::io::Error),
}

/// What a caller may do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAdvice {
    /// Correct the input and try again.
    FixInput,
    /// Nothing reached the chain; a new attempt is safe and costs no gas.
    RetryAttempt,
    /// A transaction may exist on-chain. Never resubmit the same id hash;
    /// any retry needs a new commitment.
    RetryWithNewCommitment,
    /// The escrow exists; its status should be queried again later.
    CheckStatusLater,
    /// Retrying will not help.
    DoNotRetry,
}

/// Settlement-attempt errors.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("request declined in wallet")]
    UserAbort,

    #[error("invalid amount: {0}")]
    InvalidAmount(#[source] CoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "amount {} exceeds free balance {}",
        format_units(*requested, PAYMENT_DECIMALS),
        format_units(*available, PAYMENT_DECIMALS)
    )]
    PreconditionFailure { requested: U256, available: U256 },

    #[error("free balance unavailable: {0}")]
    BalanceUnavailable(#[source] ChainError),

    #[error("escrow contract read failed: {0}")]
    ChainRead(#[source] ChainError),

    #[error("salt registration failed: {0}")]
    RegistrationFailure(#[source] RegistryError),

    #[error("submission failed: {source}")]
    SubmissionFailure {
        /// Set once the transaction was handed to the node.
        tx_hash: Option<TxHash>,
        #[source]
        source: ChainError,
    },

    #[error("transaction {tx_hash} not confirmed within {}s", waited.as_secs())]
    ConfirmationTimeout { tx_hash: TxHash, waited: Duration },

    #[error("malformed status response: {0}")]
    MalformedResponse(String),

    #[error("status service unavailable: {0}")]
    StatusUnavailable(String),

    #[error("commitment {0} was already used")]
    CommitmentReused(B256),

    #[error("cancelled")]
    Cancelled {
        /// Whether the escrow transaction had already been broadcast.
        broadcast: bool,
    },

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for SettlementError {
    fn from(err: CoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<StatusError> for SettlementError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::Malformed(msg) => Self::MalformedResponse(msg),
            other => Self::StatusUnavailable(other.to_string()),
        }
    }
}

impl SettlementError {
    /// Classify the error for the caller's retry decision.
    pub fn retry_advice(&self) -> RetryAdvice {
        match self {
            Self::InvalidAmount(_) | Self::InvalidInput(_) | Self::PreconditionFailure { .. } => {
                RetryAdvice::FixInput
            }
            Self::UserAbort
            | Self::BalanceUnavailable(_)
            | Self::ChainRead(_)
            | Self::RegistrationFailure(_)
            | Self::Crypto(_) => RetryAdvice::RetryAttempt,
            Self::SubmissionFailure {
                source: ChainError::Reverted(_),
                ..
            } => RetryAdvice::DoNotRetry,
            Self::SubmissionFailure { tx_hash: None, .. } => RetryAdvice::RetryAttempt,
            Self::SubmissionFailure { tx_hash: Some(_), .. } | Self::ConfirmationTimeout { .. } => {
                RetryAdvice::RetryWithNewCommitment
            }
            Self::MalformedResponse(_) | Self::StatusUnavailable(_) => {
                RetryAdvice::CheckStatusLater
            }
            Self::Cancelled { broadcast: true } => RetryAdvice::CheckStatusLater,
            Self::Cancelled { broadcast: false } => RetryAdvice::RetryAttempt,
            Self::CommitmentReused(_) | Self::Internal(_) => RetryAdvice::DoNotRetry,
        }
    }

    /// Single human-readable status line for the user.
    pub fn user_message(&self) -> String {
        if let Self::SubmissionFailure {
            source: ChainError::Reverted(_),
            ..
        } = self
        {
            return format!(
                "Error: {self}. The escrow contract rejected this payment; check the amount against the escrow limits."
            );
        }
        let hint = match self.retry_advice() {
            RetryAdvice::FixInput => "",
            RetryAdvice::RetryAttempt => " Nothing was sent on-chain; you can try again.",
            RetryAdvice::RetryWithNewCommitment => {
                " A transaction may exist on-chain; check it before starting a new payment."
            }
            RetryAdvice::CheckStatusLater => " The payment may still settle; check its status later.",
            RetryAdvice::DoNotRetry => "",
        };
        format!("Error: {self}.{hint}")
    }
}
