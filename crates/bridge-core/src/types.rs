use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CoreError;

/// 32 bytes of commitment salt.
///
/// The salt is reveal material: it is zeroed on drop and redacted from
/// `Debug` output. The canonical text form is `0x` followed by 64 lowercase
/// hex digits.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Salt([u8; 32]);

impl Salt {
    /// Wrap raw salt bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical `0x`-prefixed hex encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

impl FromStr for Salt {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 64 {
            return Err(CoreError::InvalidHex(format!(
                "salt must be 64 hex digits, got {}",
                digits.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| CoreError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Advisory identifier of one settlement attempt: `<sender>-<unix millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementId(String);

impl SettlementId {
    /// Build the identifier from the sender address and a millisecond timestamp.
    ///
    /// The address is rendered in its EIP-55 checksum form.
    pub fn new(sender: Address, unix_millis: i64) -> Self {
        Self(format!("{}-{}", sender.to_checksum(None), unix_millis))
    }

    /// Build the identifier for `sender` at the current wall-clock time.
    pub fn now(sender: Address) -> Self {
        Self::new(sender, Utc::now().timestamp_millis())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Salt plus the two hashes that bind a settlement attempt on-chain.
#[derive(Debug, Clone)]
pub struct Commitment {
    /// Fresh CSPRNG salt, never reused across attempts.
    pub salt: Salt,
    /// Advisory attempt identifier hashed into `id_hash`.
    pub settlement_id: SettlementId,
    /// `keccak256(salt ‖ settlement_id)`; also the escrow id on-chain.
    pub id_hash: B256,
    /// `keccak256(salt ‖ email)`.
    pub email_hash: B256,
}

/// Reveal material held by the off-chain registry.
#[derive(Debug, Clone)]
pub struct SettlementRecord {
    pub id_hash: B256,
    pub salt: Salt,
    pub email: String,
    pub recipient_email: String,
    pub created_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Capture the reveal material for `commitment`.
    pub fn new(commitment: &Commitment, email: &str, recipient_email: &str) -> Self {
        Self {
            id_hash: commitment.id_hash,
            salt: commitment.salt.clone(),
            email: email.to_string(),
            recipient_email: recipient_email.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Everything the escrow contract needs to open a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRequest {
    pub id_hash: B256,
    pub email_hash: B256,
    /// Amount in integer minor units.
    pub amount: U256,
    /// Raw recipient override as supplied by the user, not yet validated.
    pub recipient_override: Option<String>,
}

impl EscrowRequest {
    pub fn new(commitment: &Commitment, amount: U256, recipient_override: Option<String>) -> Self {
        Self {
            id_hash: commitment.id_hash,
            email_hash: commitment.email_hash,
            amount,
            recipient_override,
        }
    }
}

/// Settlement outcome as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// No definitive answer yet.
    Pending,
    /// The status service reports the escrow as settled.
    Completed,
    /// The status service reports the escrow as failed.
    Failed,
    /// The polling budget ran out without a definitive answer.
    TimedOut,
}

impl SettlementStatus {
    /// Whether polling stops at this status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Map a status-service value. `TimedOut` never appears on the wire.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::TimedOut => write!(f, "TimedOut"),
        }
    }
}
