use crate::state_machine::AttemptPhase;

/// Core validation and configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex value: {0}")]
    InvalidHex(String),

    #[error("invalid attempt transition from {from} to {to}")]
    InvalidStateTransition {
        from: AttemptPhase,
        to: AttemptPhase,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
