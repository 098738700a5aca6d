/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("entropy source failure: {0}")]
    Entropy(String),
}
