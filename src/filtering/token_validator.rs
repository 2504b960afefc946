// DANS : src/filtering/token_validator.rs

use crate::decoders::spl_token_decoders::is_token_program;
use crate::rpc::LedgerClient;
use solana_sdk::pubkey::Pubkey;
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

/// Pourquoi un token a été écarté. Ce n'est pas une erreur : c'est le résultat négatif du filtre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    FetchFailed(String),
    AccountMissing,
    FreezeAuthority(Pubkey),
    MintAuthority(Pubkey),
    NotInitialized,
    UnknownTokenProgram(Pubkey),
    LiquidityNotBurned,
    /// L'actif dépensé à l'achat n'est aucun des deux côtés de la pool.
    SpendMintNotInPool(Pubkey),
}

impl RejectionReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::FetchFailed(_) => "fetch_failed",
            RejectionReason::AccountMissing => "account_missing",
            RejectionReason::FreezeAuthority(_) => "freeze_authority",
            RejectionReason::MintAuthority(_) => "mint_authority",
            RejectionReason::NotInitialized => "not_initialized",
            RejectionReason::UnknownTokenProgram(_) => "unknown_token_program",
            RejectionReason::LiquidityNotBurned => "lp_not_burned",
            RejectionReason::SpendMintNotInPool(_) => "spend_mint_not_in_pool",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::FetchFailed(e) => write!(f, "lecture du mint impossible : {}", e),
            RejectionReason::AccountMissing => write!(f, "compte mint absent"),
            RejectionReason::FreezeAuthority(a) => write!(f, "autorité de gel présente ({})", a),
            RejectionReason::MintAuthority(a) => write!(f, "autorité de mint présente ({})", a),
            RejectionReason::NotInitialized => write!(f, "mint non initialisé"),
            RejectionReason::UnknownTokenProgram(p) => write!(f, "programme propriétaire inconnu ({})", p),
            RejectionReason::LiquidityNotBurned => write!(f, "liquidité non brûlée"),
            RejectionReason::SpendMintNotInPool(m) => write!(f, "la pool n'échange pas l'actif dépensé ({})", m),
        }
    }
}

/// Filtre de sécurité sur le mint du token cible. Tout doute rejette le token.
pub struct TokenValidator {
    ledger: Arc<dyn LedgerClient>,
}

impl TokenValidator {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    pub async fn is_valid(&self, mint: &Pubkey) -> bool {
        self.screen(mint).await.is_ok()
    }

    pub async fn screen(&self, mint: &Pubkey) -> Result<(), RejectionReason> {
        let account = match self.ledger.fetch_mint_account(mint).await {
            Ok(Some(account)) => account,
            Ok(None) => return Err(RejectionReason::AccountMissing),
            Err(e) => {
                warn!(mint = %mint, error = %e, "Lecture du mint en échec, token rejeté.");
                return Err(RejectionReason::FetchFailed(format!("{:#}", e)));
            }
        };

        if let Some(authority) = account.freeze_authority {
            return Err(RejectionReason::FreezeAuthority(authority));
        }
        if let Some(authority) = account.mint_authority {
            return Err(RejectionReason::MintAuthority(authority));
        }
        if !account.is_initialized {
            return Err(RejectionReason::NotInitialized);
        }
        if !is_token_program(&account.owner_program) {
            return Err(RejectionReason::UnknownTokenProgram(account.owner_program));
        }

        debug!(mint = %mint, "Token accepté par le filtre de sécurité.");
        Ok(())
    }
}
