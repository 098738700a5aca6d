//! Token and escrow balance reads.

use alloy::primitives::Address;
use bridge_core::PAYMENT_DECIMALS;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::ChainError;
use crate::traits::EscrowChain;
use crate::types::{BalanceSnapshot, TokenBalance};

/// Reads the wallet, contract and free balances of the settlement token.
///
/// Token address and precision are read once and cached.
pub struct BalanceOracle {
    chain: Arc<dyn EscrowChain>,
    token: OnceCell<(Address, u8)>,
}

impl BalanceOracle {
    pub fn new(chain: Arc<dyn EscrowChain>) -> Self {
        Self {
            chain,
            token: OnceCell::new(),
        }
    }

    async fn token(&self) -> Result<(Address, u8), ChainError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let address = self.chain.token_address().await?;
                let decimals = self.chain.token_decimals(address).await?;
                if decimals != PAYMENT_DECIMALS {
                    tracing::warn!(
                        %address,
                        decimals,
                        expected = PAYMENT_DECIMALS,
                        "token precision differs from payment amount precision"
                    );
                }
                Ok::<_, ChainError>((address, decimals))
            })
            .await?;
        Ok(*token)
    }

    /// Settlement-token balance of the signing wallet.
    pub async fn wallet_balance(&self) -> Result<TokenBalance, ChainError> {
        let (token, decimals) = self.token().await?;
        let raw = self.chain.token_balance(token, self.chain.sender()).await?;
        Ok(TokenBalance::new(raw, decimals))
    }

    /// Settlement-token balance held by the escrow contract.
    pub async fn contract_balance(&self) -> Result<TokenBalance, ChainError> {
        let (_, decimals) = self.token().await?;
        let raw = self.chain.contract_token_balance().await?;
        Ok(TokenBalance::new(raw, decimals))
    }

    /// Contract balance still available for new escrows.
    pub async fn free_balance(&self) -> Result<TokenBalance, ChainError> {
        let (_, decimals) = self.token().await?;
        let raw = self.chain.free_balance().await?;
        Ok(TokenBalance::new(raw, decimals))
    }

    /// Read all three balances concurrently; a failed read becomes `None`.
    pub async fn snapshot(&self) -> BalanceSnapshot {
        let (wallet, contract, free) = tokio::join!(
            self.wallet_balance(),
            self.contract_balance(),
            self.free_balance()
        );
        BalanceSnapshot {
            wallet: keep("wallet", wallet),
            contract: keep("contract", contract),
            free: keep("free", free),
        }
    }
}

fn keep(line: &str, read: Result<TokenBalance, ChainError>) -> Option<TokenBalance> {
    match read {
        Ok(balance) => Some(balance),
        Err(e) => {
            tracing::warn!(balance = line, error = %e, "balance read failed");
            None
        }
    }
}
