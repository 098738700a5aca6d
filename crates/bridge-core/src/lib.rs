//! Escrow Bridge core.
//!
//! Data model shared by every layer of the settlement client: commitments,
//! reveal records, escrow requests, exact token amounts, recipient address
//! validation, the per-attempt state machine and the TOML configuration.

pub mod address;
pub mod amount;
pub mod config;
pub mod error;
pub mod state_machine;
pub mod types;

pub use address::{parse_address, parse_recipient};
pub use amount::{format_units, parse_payment_amount, parse_units, PAYMENT_DECIMALS};
pub use config::BridgeConfig;
pub use error::CoreError;
pub use state_machine::{AttemptEvent, AttemptPhase, AttemptStateMachine};
pub use types::{
    Commitment, EscrowRequest, Salt, SettlementId, SettlementRecord, SettlementStatus,
};
