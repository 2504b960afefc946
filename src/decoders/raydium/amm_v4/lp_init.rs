// DANS : src/decoders/raydium/amm_v4/lp_init.rs

//! Reconstruction des clés d'une pool à partir de sa transaction d'initialisation.
//!
//! Rien n'est lu depuis le compte de la pool : tout vient de la structure de la
//! transaction (comptes de l'instruction `initialize2`, instructions internes du
//! programme de tokens, soldes pré-transaction et log d'initialisation), puis du
//! compte de marché OpenBook référencé par la pool.

use super::layout::{layout_for_version, InitAccountLayout};
use super::openbook_market::{decode_market_accounts, MarketAccounts};
use super::pool_keys::PoolDescriptor;
use super::{AMM_V4_VERSION, LP_INIT_LOG_MARKER, OPENBOOK_MARKET_VERSION, RAYDIUM_AMM_V4_PROGRAM_ID};
use crate::decoders::relaxed_json::{parse_lp_init_log_entry, MalformedLogFragment};
use crate::decoders::spl_token_decoders::{NATIVE_DECIMALS, NATIVE_MINT, TOKEN_PROGRAM_ID};
use crate::decoders::transaction::{InnerInstruction, ParsedTransaction, TopLevelInstruction};
use crate::rpc::LedgerClient;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("aucune instruction du programme AMM V4 dans la transaction")]
    NoInitInstruction,
    #[error("aucune table de comptes connue pour la version {0} du programme")]
    UnknownLayout(u8),
    #[error("compte `{role}` absent à l'index {index} de l'instruction d'initialisation")]
    MissingAccount { role: &'static str, index: usize },
    #[error("instruction initializeMint du mint LP introuvable")]
    MissingLpMintInit,
    #[error("instruction mintTo du mint LP introuvable")]
    MissingLpMintTo,
    #[error("transfert vers le vault base introuvable")]
    MissingBaseTransfer,
    #[error("transfert vers le vault quote introuvable")]
    MissingQuoteTransfer,
    #[error("aucune entrée de log contenant `{LP_INIT_LOG_MARKER}`")]
    MissingInitLog,
    #[error("log d'initialisation illisible : {0}")]
    MalformedLogFragment(#[from] MalformedLogFragment),
    #[error("décimales du token non natif introuvables dans les soldes pré-transaction")]
    MissingTokenDecimals,
    #[error("transaction {0} introuvable")]
    TransactionNotFound(Signature),
    #[error("compte de marché {0} introuvable")]
    MarketNotFound(Pubkey),
    #[error("compte de marché illisible : {0:#}")]
    MalformedMarket(anyhow::Error),
    #[error("erreur RPC : {0:#}")]
    Rpc(anyhow::Error),
}

impl DecodeError {
    /// Libellé court pour les métriques.
    pub fn label(&self) -> &'static str {
        match self {
            DecodeError::NoInitInstruction => "no_init_instruction",
            DecodeError::UnknownLayout(_) => "unknown_layout",
            DecodeError::MissingAccount { .. } => "missing_account",
            DecodeError::MissingLpMintInit => "missing_lp_mint_init",
            DecodeError::MissingLpMintTo => "missing_lp_mint_to",
            DecodeError::MissingBaseTransfer => "missing_base_transfer",
            DecodeError::MissingQuoteTransfer => "missing_quote_transfer",
            DecodeError::MissingInitLog => "missing_init_log",
            DecodeError::MalformedLogFragment(_) => "malformed_log_fragment",
            DecodeError::MissingTokenDecimals => "missing_token_decimals",
            DecodeError::TransactionNotFound(_) => "transaction_not_found",
            DecodeError::MarketNotFound(_) => "market_not_found",
            DecodeError::MalformedMarket(_) => "malformed_market",
            DecodeError::Rpc(_) => "rpc",
        }
    }
}

/// Tout ce que la transaction seule permet de connaître. Il ne manque que
/// les comptes du marché pour obtenir un `PoolDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpInitInfo {
    pub id: Pubkey,
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
    pub lp_vault: Pubkey,
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub lp_reserve: u64,
    pub open_time: u64,
}

impl LpInitInfo {
    /// Associe les comptes du marché et produit le descripteur final.
    pub fn into_descriptor(self, market: MarketAccounts) -> PoolDescriptor {
        PoolDescriptor {
            id: self.id,
            version: AMM_V4_VERSION,
            program_id: RAYDIUM_AMM_V4_PROGRAM_ID,
            base_mint: self.base_mint,
            quote_mint: self.quote_mint,
            lp_mint: self.lp_mint,
            base_decimals: self.base_decimals,
            quote_decimals: self.quote_decimals,
            lp_decimals: self.lp_decimals,
            authority: self.authority,
            open_orders: self.open_orders,
            target_orders: self.target_orders,
            base_vault: self.base_vault,
            quote_vault: self.quote_vault,
            withdraw_queue: Pubkey::default(),
            lp_vault: self.lp_vault,
            market_version: OPENBOOK_MARKET_VERSION,
            market_program_id: self.market_program_id,
            market_id: self.market_id,
            market_authority: market.authority,
            market_base_vault: market.base_vault,
            market_quote_vault: market.quote_vault,
            market_bids: market.bids,
            market_asks: market.asks,
            market_event_queue: market.event_queue,
            base_reserve: self.base_reserve,
            quote_reserve: self.quote_reserve,
            lp_reserve: self.lp_reserve,
            open_time: self.open_time,
        }
    }
}

/// Récupère la transaction, la décode puis résout le marché associé.
pub async fn fetch_pool_descriptor(ledger: &dyn LedgerClient, signature: &Signature) -> Result<PoolDescriptor, DecodeError> {
    let transaction = ledger
        .fetch_transaction(signature)
        .await
        .map_err(DecodeError::Rpc)?
        .ok_or(DecodeError::TransactionNotFound(*signature))?;

    let info = decode_lp_init_transaction(&transaction)?;

    let market_data = ledger
        .fetch_account_data(&info.market_id)
        .await
        .map_err(DecodeError::Rpc)?
        .ok_or(DecodeError::MarketNotFound(info.market_id))?;
    let market = decode_market_accounts(&info.market_id, &info.market_program_id, &market_data)
        .map_err(DecodeError::MalformedMarket)?;

    Ok(info.into_descriptor(market))
}

/// Décode une transaction d'initialisation de pool. Tout ou rien : la première
/// pièce manquante interrompt le décodage.
pub fn decode_lp_init_transaction(transaction: &ParsedTransaction) -> Result<LpInitInfo, DecodeError> {
    let init = find_instruction_by_program_id(&transaction.instructions, &RAYDIUM_AMM_V4_PROGRAM_ID)
        .ok_or(DecodeError::NoInitInstruction)?;
    let layout = layout_for_version(AMM_V4_VERSION).ok_or(DecodeError::UnknownLayout(AMM_V4_VERSION))?;
    let accounts = InitAccounts::resolve(init, layout)?;

    debug!(
        signature = %transaction.signature,
        base_mint = %accounts.base_mint,
        quote_mint = %accounts.quote_mint,
        "Nouvelle instruction d'initialisation de LP trouvée."
    );

    let lp_mint_init = find_initialize_mint(transaction, &accounts.lp_mint).ok_or(DecodeError::MissingLpMintInit)?;
    let lp_mint_to = find_mint_to(transaction, &accounts.lp_mint).ok_or(DecodeError::MissingLpMintTo)?;
    let base_transfer = find_transfer_to(transaction, &accounts.base_vault, &TOKEN_PROGRAM_ID)
        .ok_or(DecodeError::MissingBaseTransfer)?;
    let quote_transfer = find_transfer_to(transaction, &accounts.quote_vault, &TOKEN_PROGRAM_ID)
        .ok_or(DecodeError::MissingQuoteTransfer)?;

    let lp_decimals = lp_mint_init
        .info
        .get("decimals")
        .and_then(|d| d.as_u64())
        .and_then(|d| u8::try_from(d).ok())
        .ok_or(DecodeError::MissingLpMintInit)?;
    let lp_vault = lp_mint_to.info_pubkey("account").ok_or(DecodeError::MissingLpMintTo)?;
    let lp_reserve = lp_mint_to.info_amount("amount").ok_or(DecodeError::MissingLpMintTo)?;
    let base_reserve = base_transfer.info_amount("amount").ok_or(DecodeError::MissingBaseTransfer)?;
    let quote_reserve = quote_transfer.info_amount("amount").ok_or(DecodeError::MissingQuoteTransfer)?;

    let log_line = transaction.find_log_entry(LP_INIT_LOG_MARKER).ok_or(DecodeError::MissingInitLog)?;
    let log_entry = parse_lp_init_log_entry(log_line)?;

    let (base_decimals, quote_decimals) = resolve_decimals(transaction, &accounts.base_mint, &accounts.quote_mint)?;

    Ok(LpInitInfo {
        id: accounts.pool_id,
        base_mint: accounts.base_mint,
        quote_mint: accounts.quote_mint,
        lp_mint: accounts.lp_mint,
        base_decimals,
        quote_decimals,
        lp_decimals,
        authority: accounts.authority,
        open_orders: accounts.open_orders,
        target_orders: accounts.target_orders,
        base_vault: accounts.base_vault,
        quote_vault: accounts.quote_vault,
        lp_vault,
        market_program_id: accounts.market_program_id,
        market_id: accounts.market_id,
        base_reserve,
        quote_reserve,
        lp_reserve,
        open_time: log_entry.open_time,
    })
}

/// Les comptes lus par position dans l'instruction d'initialisation.
struct InitAccounts {
    pool_id: Pubkey,
    authority: Pubkey,
    open_orders: Pubkey,
    lp_mint: Pubkey,
    base_mint: Pubkey,
    quote_mint: Pubkey,
    base_vault: Pubkey,
    quote_vault: Pubkey,
    target_orders: Pubkey,
    market_program_id: Pubkey,
    market_id: Pubkey,
}

impl InitAccounts {
    fn resolve(instruction: &TopLevelInstruction, layout: &InitAccountLayout) -> Result<Self, DecodeError> {
        let at = |role: &'static str, index: usize| {
            instruction
                .accounts
                .get(index)
                .copied()
                .ok_or(DecodeError::MissingAccount { role, index })
        };

        Ok(Self {
            pool_id: at("pool_id", layout.pool_id)?,
            authority: at("authority", layout.authority)?,
            open_orders: at("open_orders", layout.open_orders)?,
            lp_mint: at("lp_mint", layout.lp_mint)?,
            base_mint: at("base_mint", layout.base_mint)?,
            quote_mint: at("quote_mint", layout.quote_mint)?,
            base_vault: at("base_vault", layout.base_vault)?,
            quote_vault: at("quote_vault", layout.quote_vault)?,
            target_orders: at("target_orders", layout.target_orders)?,
            market_program_id: at("market_program_id", layout.market_program_id)?,
            market_id: at("market_id", layout.market_id)?,
        })
    }
}

fn find_instruction_by_program_id<'a>(instructions: &'a [TopLevelInstruction], program_id: &Pubkey) -> Option<&'a TopLevelInstruction> {
    instructions.iter().find(|ix| ix.program_id == *program_id)
}

fn find_initialize_mint<'a>(transaction: &'a ParsedTransaction, mint: &Pubkey) -> Option<&'a InnerInstruction> {
    transaction
        .all_inner_instructions()
        .find(|ix| (ix.is("initializeMint") || ix.is("initializeMint2")) && ix.info_pubkey("mint").as_ref() == Some(mint))
}

fn find_mint_to<'a>(transaction: &'a ParsedTransaction, mint: &Pubkey) -> Option<&'a InnerInstruction> {
    transaction
        .all_inner_instructions()
        .find(|ix| ix.is("mintTo") && ix.info_pubkey("mint").as_ref() == Some(mint))
}

fn find_transfer_to<'a>(transaction: &'a ParsedTransaction, destination: &Pubkey, program_id: &Pubkey) -> Option<&'a InnerInstruction> {
    transaction.all_inner_instructions().find(|ix| {
        ix.is("transfer") && ix.program_id == *program_id && ix.info_pubkey("destination").as_ref() == Some(destination)
    })
}

/// Décimales base/quote. Le côté natif a des décimales connues ; celles de
/// l'autre côté viennent des soldes pré-transaction.
fn resolve_decimals(transaction: &ParsedTransaction, base_mint: &Pubkey, quote_mint: &Pubkey) -> Result<(u8, u8), DecodeError> {
    let base_is_native = *base_mint == NATIVE_MINT;
    let non_native_mint = if base_is_native { quote_mint } else { base_mint };

    let balances = &transaction.pre_token_balances;
    let exact = balances.iter().find(|b| b.mint == *non_native_mint);
    let entry = match exact {
        Some(entry) => entry,
        None => {
            let fallback = balances
                .iter()
                .find(|b| b.mint != NATIVE_MINT)
                .ok_or(DecodeError::MissingTokenDecimals)?;
            warn!(
                expected_mint = %non_native_mint,
                used_mint = %fallback.mint,
                "Aucun solde pré-transaction pour le mint de la pool, utilisation du premier mint non natif."
            );
            fallback
        }
    };

    if base_is_native {
        Ok((NATIVE_DECIMALS, entry.decimals))
    } else {
        Ok((entry.decimals, NATIVE_DECIMALS))
    }
}
