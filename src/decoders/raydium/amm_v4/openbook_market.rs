// DANS: src/decoders/raydium/amm_v4/openbook_market.rs

use anyhow::{anyhow, Result};
use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;
use std::mem::size_of;

/// Le compte de marché commence par 5 octets de padding ("serum").
const MARKET_HEAD_PADDING: usize = 5;

// Structure on-chain MARKET_STATE_LAYOUT_V3, sans le padding de tête ni de queue.
#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct MarketStateV3 {
    pub account_flags: u64,
    pub own_address: [u8; 32],
    pub vault_signer_nonce: u64,
    pub base_mint: [u8; 32],
    pub quote_mint: [u8; 32],
    pub base_vault: [u8; 32],
    pub base_deposits_total: u64,
    pub base_fees_accrued: u64,
    pub quote_vault: [u8; 32],
    pub quote_deposits_total: u64,
    pub quote_fees_accrued: u64,
    pub quote_dust_threshold: u64,
    pub request_queue: [u8; 32],
    pub event_queue: [u8; 32],
    pub bids: [u8; 32],
    pub asks: [u8; 32],
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub fee_rate_bps: u64,
    pub referrer_rebates_accrued: u64,
}

/// Les comptes du marché dont un swap AMM V4 a besoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketAccounts {
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_queue: Pubkey,
    /// Autorité dérivée du marché (le "vault signer").
    pub authority: Pubkey,
}

pub fn decode_market_state(data: &[u8]) -> Result<MarketStateV3> {
    let raw = data
        .get(MARKET_HEAD_PADDING..MARKET_HEAD_PADDING + size_of::<MarketStateV3>())
        .ok_or_else(|| anyhow!("Données du marché trop courtes ({} octets)", data.len()))?;
    bytemuck::try_from_bytes::<MarketStateV3>(raw)
        .copied()
        .map_err(|e| anyhow!("Données du marché invalides : {:?}", e))
}

/// Décode le marché et dérive son autorité.
pub fn decode_market_accounts(market_id: &Pubkey, market_program_id: &Pubkey, data: &[u8]) -> Result<MarketAccounts> {
    let state = decode_market_state(data)?;
    let nonce = state.vault_signer_nonce;
    let authority = Pubkey::create_program_address(
        &[market_id.as_ref(), &nonce.to_le_bytes()],
        market_program_id,
    )
    .map_err(|e| anyhow!("Impossible de dériver l'autorité du marché {} : {}", market_id, e))?;

    Ok(MarketAccounts {
        base_vault: Pubkey::new_from_array(state.base_vault),
        quote_vault: Pubkey::new_from_array(state.quote_vault),
        bids: Pubkey::new_from_array(state.bids),
        asks: Pubkey::new_from_array(state.asks),
        event_queue: Pubkey::new_from_array(state.event_queue),
        authority,
    })
}
