use alloy::primitives::{TxHash, U256};
use bridge_core::format_units;
use serde::Serialize;
use std::fmt;

/// Which `initPayment` overload was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallForm {
    /// `initPayment(bytes32,bytes32,uint256)`
    Plain,
    /// `initPayment(bytes32,bytes32,uint256,address)`
    RecipientOverride,
}

impl fmt::Display for CallForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "initPayment(bytes32,bytes32,uint256)"),
            Self::RecipientOverride => write!(f, "initPayment(bytes32,bytes32,uint256,address)"),
        }
    }
}

/// Proof that an escrow transaction was mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub form: CallForm,
}

/// A raw token amount together with the precision used to display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenBalance {
    pub raw: U256,
    pub decimals: u8,
}

impl TokenBalance {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }
}

impl fmt::Display for TokenBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.raw, self.decimals))
    }
}

/// Best-effort view of the three balances shown to the user.
///
/// Each line degrades to `None` independently when its read fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub wallet: Option<TokenBalance>,
    pub contract: Option<TokenBalance>,
    pub free: Option<TokenBalance>,
}

impl BalanceSnapshot {
    /// Render as display lines, with `unknown` for failed reads.
    pub fn lines(&self) -> Vec<String> {
        fn show(balance: &Option<TokenBalance>) -> String {
            balance
                .map(|b| b.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        }
        vec![
            format!("Wallet USDC:   {}", show(&self.wallet)),
            format!("Contract USDC: {}", show(&self.contract)),
            format!("Free balance:  {}", show(&self.free)),
        ]
    }
}
