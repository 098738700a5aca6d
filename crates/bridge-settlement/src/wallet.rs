//! Signer resolution.
//!
//! Candidate keys come from several sources. The highest-preference source
//! that supplied a key wins; a malformed key from that source is an error
//! rather than a silent fallback to a lower-preference one.

use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

use crate::error::WalletError;

/// Where a candidate key came from, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignerSource {
    Flag,
    Environment,
    KeyFile,
}

impl fmt::Display for SignerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => write!(f, "--private-key"),
            Self::Environment => write!(f, "ESCROW_BRIDGE_PRIVATE_KEY"),
            Self::KeyFile => write!(f, "wallet.key_file"),
        }
    }
}

/// A private key offered by one source.
pub struct SignerCandidate {
    pub source: SignerSource,
    key: Zeroizing<String>,
}

impl SignerCandidate {
    pub fn new(source: SignerSource, key: impl Into<String>) -> Self {
        Self {
            source,
            key: Zeroizing::new(key.into()),
        }
    }

    fn is_blank(&self) -> bool {
        self.key.trim().is_empty()
    }
}

impl fmt::Debug for SignerCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerCandidate")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Gather candidates from the flag, the environment value and the key file.
pub fn collect_candidates(
    flag: Option<String>,
    env: Option<String>,
    key_file: Option<&Path>,
) -> Result<Vec<SignerCandidate>, WalletError> {
    let mut candidates = Vec::new();
    if let Some(key) = flag {
        candidates.push(SignerCandidate::new(SignerSource::Flag, key));
    }
    if let Some(key) = env {
        candidates.push(SignerCandidate::new(SignerSource::Environment, key));
    }
    if let Some(path) = key_file {
        let contents = Zeroizing::new(std::fs::read_to_string(path)?);
        candidates.push(SignerCandidate::new(SignerSource::KeyFile, contents.trim()));
    }
    Ok(candidates)
}

/// Pick the preferred non-blank candidate. Pure; the key is not parsed.
pub fn choose_candidate(candidates: &[SignerCandidate]) -> Result<&SignerCandidate, WalletError> {
    candidates
        .iter()
        .filter(|c| !c.is_blank())
        .min_by_key(|c| c.source)
        .ok_or(WalletError::NoSigner)
}

/// Build the local signer for a chosen candidate.
pub fn build_signer(candidate: &SignerCandidate) -> Result<PrivateKeySigner, WalletError> {
    let signer: PrivateKeySigner = candidate
        .key
        .trim()
        .parse()
        .map_err(|_| WalletError::MalformedKey(candidate.source.to_string()))?;

    tracing::info!(address = %signer.address(), source = %candidate.source, "signer resolved");
    Ok(signer)
}

/// [`choose_candidate`] followed by [`build_signer`].
pub fn resolve_signer(candidates: &[SignerCandidate]) -> Result<PrivateKeySigner, WalletError> {
    build_signer(choose_candidate(candidates)?)
}
