//! Escrow Bridge settlement layer.
//!
//! Runs one settlement attempt end to end: reveal material goes to the salt
//! registry, the free balance gates the escrow transaction, the transaction
//! is submitted and confirmed, and the status service is polled until the
//! settlement completes, fails or the polling budget runs out.

pub mod adapters;
pub mod api;
pub mod balance;
pub mod cancel;
pub mod error;
pub mod initiator;
pub mod orchestrator;
pub mod poller;
pub mod registry;
pub mod traits;
pub mod types;
pub mod wallet;

pub use api::BridgeApiClient;
pub use balance::BalanceOracle;
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use error::{
    ApiError, ChainError, RegistryError, RetryAdvice, SettlementError, StatusError, WalletError,
};
pub use initiator::{EscrowInitiator, InitiationCall, PendingEscrow, PreparedSubmission};
pub use orchestrator::{
    OrchestratorConfig, PaymentIntent, SettlementOrchestrator, SettlementOutcome,
};
pub use poller::{HttpStatusFeed, PollConfig, StatusPoller};
pub use registry::HttpSaltRegistry;
pub use traits::{EscrowChain, SaltRegistry, StatusFeed};
pub use types::{BalanceSnapshot, CallForm, SubmissionReceipt, TokenBalance};
pub use wallet::{
    build_signer, choose_candidate, collect_candidates, resolve_signer, SignerCandidate,
    SignerSource,
};
