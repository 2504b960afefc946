// DANS : src/execution/swap_builder.rs

use crate::decoders::raydium::amm_v4::swap_instruction::{create_swap_instruction, SwapAmounts};
use crate::decoders::raydium::amm_v4::PoolDescriptor;
use crate::decoders::spl_token_decoders::NATIVE_MINT;
use crate::execution::swap_config::{SwapConfig, SwapDirection};
use crate::rpc::ResilientRpcClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    system_instruction,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::sync::Arc;
use tracing::debug;

/// Sortie minimale : la plus petite unité du token de sortie.
const MINIMUM_AMOUNT_OUT: u64 = 1;

/// Une transaction signée, prête à être diffusée, avec sa fenêtre de validité.
#[derive(Debug, Clone)]
pub struct SwapTransaction {
    pub transaction: VersionedTransaction,
    pub last_valid_block_height: u64,
    pub max_send_retries: usize,
}

#[async_trait]
pub trait SwapBuilder: Send + Sync {
    async fn build_swap(&self, pool: &PoolDescriptor, config: &SwapConfig) -> Result<SwapTransaction>;
}

/// Construit des swaps AMM V4 signés par le payer.
pub struct RaydiumSwapBuilder {
    rpc: Arc<ResilientRpcClient>,
    payer: Arc<Keypair>,
}

impl RaydiumSwapBuilder {
    pub fn new(rpc: Arc<ResilientRpcClient>, payer: Arc<Keypair>) -> Self {
        Self { rpc, payer }
    }
}

#[async_trait]
impl SwapBuilder for RaydiumSwapBuilder {
    async fn build_swap(&self, pool: &PoolDescriptor, config: &SwapConfig) -> Result<SwapTransaction> {
        let owner = self.payer.pubkey();
        let instructions = swap_instructions(pool, config, &owner)?;

        let (recent_blockhash, last_valid_block_height) = self.rpc.get_latest_blockhash().await?;
        let message = v0::Message::try_compile(&owner, &instructions, &[], recent_blockhash)
            .context("Compilation du message V0 impossible")?;
        let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), &[self.payer.as_ref()])
            .context("Signature de la transaction de swap impossible")?;

        debug!(
            pool = %pool.id,
            input_mint = %config.input_mint,
            output_mint = %config.output_mint,
            amount = config.amount,
            "Transaction de swap construite."
        );

        Ok(SwapTransaction {
            transaction,
            last_valid_block_height,
            max_send_retries: config.max_retries,
        })
    }
}

/// Les instructions d'un swap, dans l'ordre d'exécution.
pub fn swap_instructions(pool: &PoolDescriptor, config: &SwapConfig, owner: &Pubkey) -> Result<Vec<Instruction>> {
    let token_program = spl_token::id();
    let source = get_associated_token_address(owner, &config.input_mint);
    let destination = get_associated_token_address(owner, &config.output_mint);

    let mut instructions = vec![
        ComputeBudgetInstruction::set_compute_unit_price(config.max_lamports),
        create_associated_token_account_idempotent(owner, owner, &config.input_mint, &token_program),
        create_associated_token_account_idempotent(owner, owner, &config.output_mint, &token_program),
    ];

    // SOL natif en entrée : on alimente le compte WSOL puis on synchronise son solde.
    if config.input_mint == NATIVE_MINT {
        instructions.push(system_instruction::transfer(owner, &source, config.amount));
        instructions.push(spl_token::instruction::sync_native(&token_program, &source)?);
    }

    let amounts = match config.direction {
        SwapDirection::ExactIn => SwapAmounts::BaseIn {
            amount_in: config.amount,
            minimum_amount_out: MINIMUM_AMOUNT_OUT,
        },
        SwapDirection::ExactOut => SwapAmounts::BaseOut {
            max_amount_in: config.amount,
            amount_out: MINIMUM_AMOUNT_OUT,
        },
    };
    instructions.push(create_swap_instruction(pool, &source, &destination, owner, amounts));

    // SOL natif en sortie : on ferme le compte WSOL pour récupérer des lamports.
    if config.output_mint == NATIVE_MINT {
        instructions.push(spl_token::instruction::close_account(&token_program, &destination, owner, owner, &[])?);
    }

    Ok(instructions)
}
