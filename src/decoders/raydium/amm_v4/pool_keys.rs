// DANS : src/decoders/raydium/amm_v4/pool_keys.rs

use crate::decoders::spl_token_decoders::NATIVE_MINT;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// Toutes les clés d'une pool AMM V4 fraîchement créée, reconstruites depuis
/// sa transaction d'initialisation. Immuable une fois construite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolDescriptor {
    pub id: Pubkey,
    pub version: u8,
    pub program_id: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_decimals: u8,
    pub authority: Pubkey,
    pub open_orders: Pubkey,
    pub target_orders: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub withdraw_queue: Pubkey,
    pub lp_vault: Pubkey,
    pub market_version: u8,
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub market_authority: Pubkey,
    pub market_base_vault: Pubkey,
    pub market_quote_vault: Pubkey,
    pub market_bids: Pubkey,
    pub market_asks: Pubkey,
    pub market_event_queue: Pubkey,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub lp_reserve: u64,
    pub open_time: u64,
}

/// Le côté de la pool que l'on achète : le mint qui n'est pas le SOL natif.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetMint {
    pub mint: Pubkey,
    pub decimals: u8,
}

impl PoolDescriptor {
    pub fn target_mint(&self) -> TargetMint {
        if self.base_mint == NATIVE_MINT {
            TargetMint { mint: self.quote_mint, decimals: self.quote_decimals }
        } else {
            TargetMint { mint: self.base_mint, decimals: self.base_decimals }
        }
    }

    /// Vrai si `mint` est l'un des deux côtés de la pool.
    pub fn contains_mint(&self, mint: &Pubkey) -> bool {
        self.base_mint == *mint || self.quote_mint == *mint
    }
}
