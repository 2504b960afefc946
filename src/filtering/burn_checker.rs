// DANS : src/filtering/burn_checker.rs

use crate::rpc::{LedgerClient, RpcError};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, warn};

/// Vérifie que la liquidité d'une pool a été brûlée (supply du mint LP nulle ou mint fermé).
pub struct LiquidityBurnChecker {
    ledger: Arc<dyn LedgerClient>,
}

impl LiquidityBurnChecker {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Un mint LP introuvable compte comme brûlé. Toute autre erreur
    /// compte comme non brûlé.
    pub async fn is_burned(&self, lp_mint: &Pubkey) -> bool {
        match self.ledger.fetch_token_supply(lp_mint).await {
            Ok(supply) => {
                debug!(lp_mint = %lp_mint, supply, "Supply du mint LP lue.");
                supply == 0
            }
            Err(RpcError::AccountNotFound { code }) => {
                debug!(lp_mint = %lp_mint, code, "Mint LP introuvable, liquidité considérée comme brûlée.");
                true
            }
            Err(RpcError::Other(e)) => {
                warn!(lp_mint = %lp_mint, error = %e, "Lecture de la supply du mint LP en échec.");
                false
            }
        }
    }
}
