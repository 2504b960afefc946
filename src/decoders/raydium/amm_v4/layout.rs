// DANS : src/decoders/raydium/amm_v4/layout.rs

//! Position des comptes dans l'instruction `initialize2` du programme AMM V4.
//! C'est un contrat avec le programme on-chain : si une nouvelle version réordonne
//! les comptes, on ajoute une table ici plutôt que de toucher aux appelants.

use super::AMM_V4_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitAccountLayout {
    pub version: u8,
    pub pool_id: usize,
    pub authority: usize,
    pub open_orders: usize,
    pub lp_mint: usize,
    pub base_mint: usize,
    pub quote_mint: usize,
    pub base_vault: usize,
    pub quote_vault: usize,
    pub target_orders: usize,
    pub market_program_id: usize,
    pub market_id: usize,
}

pub const INITIALIZE2_V4: InitAccountLayout = InitAccountLayout {
    version: AMM_V4_VERSION,
    pool_id: 4,
    authority: 5,
    open_orders: 6,
    lp_mint: 7,
    base_mint: 8,
    quote_mint: 9,
    base_vault: 10,
    quote_vault: 11,
    target_orders: 13,
    market_program_id: 15,
    market_id: 16,
};

const KNOWN_LAYOUTS: &[InitAccountLayout] = &[INITIALIZE2_V4];

pub fn layout_for_version(version: u8) -> Option<&'static InitAccountLayout> {
    KNOWN_LAYOUTS.iter().find(|layout| layout.version == version)
}
