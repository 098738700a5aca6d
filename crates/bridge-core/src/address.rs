//! Recipient address validation.

use alloy_primitives::Address;

use crate::error::CoreError;

/// Parse a `0x`-prefixed, 20-byte hex address.
///
/// All-lowercase and all-uppercase inputs carry no checksum and are accepted
/// as-is. Mixed-case input must be a valid EIP-55 checksum encoding.
pub fn parse_address(input: &str) -> Result<Address, CoreError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| CoreError::InvalidAddress(format!("missing 0x prefix: {trimmed}")))?;

    if digits.len() != 40 {
        return Err(CoreError::InvalidAddress(format!(
            "expected 40 hex digits, got {}: {trimmed}",
            digits.len()
        )));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidAddress(format!("non-hex character: {trimmed}")));
    }

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());

    if has_lower && has_upper {
        Address::parse_checksummed(trimmed, None)
            .map_err(|e| CoreError::InvalidAddress(format!("bad checksum for {trimmed}: {e}")))
    } else {
        trimmed
            .parse::<Address>()
            .map_err(|e| CoreError::InvalidAddress(format!("{trimmed}: {e}")))
    }
}

/// Interpret an optional recipient override.
///
/// Returns `Some` only when the input is present, non-blank and a
/// syntactically valid address. Anything else means "no override".
pub fn parse_recipient(input: Option<&str>) -> Option<Address> {
    let raw = input?.trim();
    if raw.is_empty() {
        return None;
    }
    match parse_address(raw) {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring invalid recipient override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0xf11692c3AD99C121923288630F7e21e1d57b3689";

    #[test]
    fn test_checksummed_address_accepted() {
        let addr = parse_address(CHECKSUMMED).unwrap();
        assert_eq!(addr.to_checksum(None), CHECKSUMMED);
    }

    #[test]
    fn test_lowercase_address_accepted() {
        let lower = CHECKSUMMED.to_lowercase();
        assert_eq!(parse_address(&lower).unwrap(), parse_address(CHECKSUMMED).unwrap());
    }

    #[test]
    fn test_wrong_checksum_rejected() {
        // Flip the case of one letter in a checksummed address.
        let bad = CHECKSUMMED.replacen("AD99", "ad99", 1);
        assert!(matches!(parse_address(&bad), Err(CoreError::InvalidAddress(_))));
    }

    #[test]
    fn test_short_address_rejected() {
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn test_missing_prefix_rejected() {
        assert!(parse_address(&CHECKSUMMED[2..]).is_err());
    }

    #[test]
    fn test_non_hex_rejected() {
        assert!(parse_address("0xZZ1692c3ad99c121923288630f7e21e1d57b3689").is_err());
    }

    #[test]
    fn test_parse_recipient() {
        assert!(parse_recipient(None).is_none());
        assert!(parse_recipient(Some("   ")).is_none());
        assert!(parse_recipient(Some("0xabc")).is_none());
        assert!(parse_recipient(Some(CHECKSUMMED)).is_some());
        // One letter's case flipped: mixed case with a wrong checksum.
        assert!(parse_recipient(Some("0xf11692c3aD99C121923288630F7e21e1d57b3689")).is_none());
        assert!(parse_recipient(Some(&CHECKSUMMED.to_lowercase())).is_some());
    }
}
