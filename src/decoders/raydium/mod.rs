// DANS : src/decoders/raydium/mod.rs

pub mod amm_v4;
