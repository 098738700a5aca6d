//! Commitment generation.
//!
//! A commitment binds one settlement attempt to hidden reveal material:
//! `id_hash = H(salt ‖ settlement_id)` and `email_hash = H(salt ‖ email)`,
//! with `H` the packed keccak256 the escrow contract verifies against.

use alloy_primitives::{Address, B256};
use bridge_core::{Commitment, Salt, SettlementId};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;
use crate::hashing::salted_hash;

/// Draw 32 fresh bytes from the operating system CSPRNG.
pub fn generate_salt() -> Result<Salt, CryptoError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(Salt::from_bytes(bytes))
}

/// Derive `(id_hash, email_hash)` for a salt. Pure and deterministic.
pub fn derive_commitment(salt: &Salt, settlement_id: &SettlementId, email: &str) -> (B256, B256) {
    let id_hash = salted_hash(salt, settlement_id.as_str());
    let email_hash = salted_hash(salt, email);
    (id_hash, email_hash)
}

/// Build a fresh commitment for `sender` at an explicit timestamp.
pub fn new_commitment_at(
    sender: Address,
    email: &str,
    unix_millis: i64,
) -> Result<Commitment, CryptoError> {
    commit(SettlementId::new(sender, unix_millis), email)
}

/// Build a fresh commitment for `sender` at the current time.
pub fn new_commitment(sender: Address, email: &str) -> Result<Commitment, CryptoError> {
    commit(SettlementId::now(sender), email)
}

fn commit(settlement_id: SettlementId, email: &str) -> Result<Commitment, CryptoError> {
    let salt = generate_salt()?;
    let (id_hash, email_hash) = derive_commitment(&salt, &settlement_id, email);
    tracing::debug!(%id_hash, settlement_id = %settlement_id, "commitment derived");
    Ok(Commitment {
        salt,
        settlement_id,
        id_hash,
        email_hash,
    })
}
