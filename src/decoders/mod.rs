// src/decoders/mod.rs

pub mod raydium;
pub mod relaxed_json;
pub mod spl_token_decoders;
pub mod transaction;

pub use transaction::ParsedTransaction;
