// DANS : src/execution/swap_config.rs

use crate::config::TradeSettings;
use crate::decoders::raydium::amm_v4::PoolDescriptor;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

/// Côté fixé du swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SwapDirection {
    /// Montant d'entrée fixe.
    #[default]
    #[serde(rename = "in")]
    ExactIn,
    /// Montant de sortie fixe.
    #[serde(rename = "out")]
    ExactOut,
}

/// Une jambe de trade (achat ou vente), en unités brutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapConfig {
    pub input_mint: Pubkey,
    pub input_decimals: u8,
    pub output_mint: Pubkey,
    pub output_decimals: u8,
    pub amount: u64,
    pub direction: SwapDirection,
    /// Prix plafond de l'unité de calcul, en micro-lamports.
    pub max_lamports: u64,
    pub max_retries: usize,
}

impl SwapConfig {
    /// Achat : on dépense le montant configuré pour obtenir le token cible de la pool.
    pub fn buy(pool: &PoolDescriptor, trade: &TradeSettings) -> Self {
        let target = pool.target_mint();
        Self {
            input_mint: trade.spend_mint,
            input_decimals: trade.spend_decimals,
            output_mint: target.mint,
            output_decimals: target.decimals,
            amount: ui_to_raw(trade.spend_amount, trade.spend_decimals),
            direction: trade.direction,
            max_lamports: trade.max_lamports,
            max_retries: trade.send_max_retries,
        }
    }

    /// Vente : la totalité du solde reçu, dans le sens inverse.
    pub fn sell(pool: &PoolDescriptor, trade: &TradeSettings, received: u64) -> Self {
        let target = pool.target_mint();
        Self {
            input_mint: target.mint,
            input_decimals: target.decimals,
            output_mint: trade.spend_mint,
            output_decimals: trade.spend_decimals,
            amount: received,
            direction: trade.direction,
            max_lamports: trade.max_lamports,
            max_retries: trade.send_max_retries,
        }
    }
}

/// Convertit un montant "UI" en unités brutes, arrondi à l'unité la plus proche.
pub fn ui_to_raw(amount: f64, decimals: u8) -> u64 {
    (amount * 10f64.powi(i32::from(decimals))).round() as u64
}
