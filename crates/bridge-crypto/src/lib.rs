pub mod commitment;
pub mod error;
pub mod hashing;

pub use commitment::{derive_commitment, generate_salt, new_commitment, new_commitment_at};
pub use error::CryptoError;
pub use hashing::{keccak, salted_hash};
