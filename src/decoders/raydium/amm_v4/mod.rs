// DANS : src/decoders/raydium/amm_v4/mod.rs

use solana_sdk::{pubkey, pubkey::Pubkey};

pub mod layout;
pub mod lp_init;
pub mod openbook_market;
pub mod pool_keys;
pub mod swap_instruction;

pub use lp_init::{decode_lp_init_transaction, fetch_pool_descriptor, DecodeError, LpInitInfo};
pub use pool_keys::{PoolDescriptor, TargetMint};

pub const RAYDIUM_AMM_V4_PROGRAM_ID: Pubkey = pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

pub const AMM_V4_VERSION: u8 = 4;
pub const OPENBOOK_MARKET_VERSION: u8 = 3;

/// Sous-chaîne présente dans le log émis par `initialize2`.
pub const LP_INIT_LOG_MARKER: &str = "init_pc_amount";
