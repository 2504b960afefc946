// DANS : src/decoders/raydium/amm_v4/swap_instruction.rs

use super::pool_keys::PoolDescriptor;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

const SWAP_BASE_IN_DISCRIMINATOR: u8 = 9;
const SWAP_BASE_OUT_DISCRIMINATOR: u8 = 11;

/// Montants d'un swap AMM V4, dans l'une des deux formes supportées par le programme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAmounts {
    /// Montant d'entrée fixe, sortie minimale.
    BaseIn { amount_in: u64, minimum_amount_out: u64 },
    /// Montant de sortie fixe, entrée maximale.
    BaseOut { max_amount_in: u64, amount_out: u64 },
}

impl SwapAmounts {
    fn encode(&self) -> Vec<u8> {
        let (discriminator, first, second) = match *self {
            SwapAmounts::BaseIn { amount_in, minimum_amount_out } => (SWAP_BASE_IN_DISCRIMINATOR, amount_in, minimum_amount_out),
            SwapAmounts::BaseOut { max_amount_in, amount_out } => (SWAP_BASE_OUT_DISCRIMINATOR, max_amount_in, amount_out),
        };
        let mut data = Vec::with_capacity(17);
        data.push(discriminator);
        data.extend_from_slice(&first.to_le_bytes());
        data.extend_from_slice(&second.to_le_bytes());
        data
    }
}

/// Construit l'instruction de swap AMM V4 (18 comptes, ordre imposé par le programme).
pub fn create_swap_instruction(
    pool: &PoolDescriptor,
    user_source_token_account: &Pubkey,
    user_destination_token_account: &Pubkey,
    user_owner: &Pubkey,
    amounts: SwapAmounts,
) -> Instruction {
    let keys = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(pool.id, false),
        AccountMeta::new_readonly(pool.authority, false),
        AccountMeta::new(pool.open_orders, false),
        AccountMeta::new(pool.target_orders, false),
        AccountMeta::new(pool.base_vault, false),
        AccountMeta::new(pool.quote_vault, false),
        AccountMeta::new_readonly(pool.market_program_id, false),
        AccountMeta::new(pool.market_id, false),
        AccountMeta::new(pool.market_bids, false),
        AccountMeta::new(pool.market_asks, false),
        AccountMeta::new(pool.market_event_queue, false),
        AccountMeta::new(pool.market_base_vault, false),
        AccountMeta::new(pool.market_quote_vault, false),
        AccountMeta::new_readonly(pool.market_authority, false),
        AccountMeta::new(*user_source_token_account, false),
        AccountMeta::new(*user_destination_token_account, false),
        AccountMeta::new_readonly(*user_owner, true),
    ];

    Instruction {
        program_id: pool.program_id,
        accounts: keys,
        data: amounts.encode(),
    }
}
