// DANS : src/filtering/mod.rs

pub mod burn_checker;
pub mod token_validator;

pub use burn_checker::LiquidityBurnChecker;
pub use token_validator::{RejectionReason, TokenValidator};
