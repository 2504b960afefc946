// DANS : src/config.rs

use crate::decoders::raydium::amm_v4::RAYDIUM_AMM_V4_PROGRAM_ID;
use crate::execution::swap_config::SwapDirection;
use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::{fmt, net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

/// Les variables d'environnement telles quelles, avant validation.
#[derive(Deserialize)]
pub struct RawConfig {
    pub solana_rpc_url: String,
    pub solana_ws_url: String,
    pub payer_private_key: String,
    pub spend_mint: String,
    pub spend_decimals: u8,
    pub spend_amount: f64,
    pub max_lamports: u64,
    #[serde(default = "default_send_max_retries")]
    pub send_max_retries: usize,
    #[serde(default)]
    pub swap_direction: SwapDirection,
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
    #[serde(default = "default_sell_max_attempts")]
    pub sell_max_attempts: u32,
    #[serde(default = "default_sell_retry_base_delay_ms")]
    pub sell_retry_base_delay_ms: u64,
    #[serde(default)]
    pub burn_check_enabled: bool,
    #[serde(default = "default_seen_signatures_capacity")]
    pub seen_signatures_capacity: usize,
    #[serde(default = "default_rpc_max_retries")]
    pub rpc_max_retries: u8,
    #[serde(default = "default_rpc_retry_delay_ms")]
    pub rpc_retry_delay_ms: u64,
    #[serde(default = "default_control_addr")]
    pub control_addr: String,
    #[serde(default)]
    pub auto_start: bool,
}

fn default_send_max_retries() -> usize { 3 }
fn default_settlement_delay_ms() -> u64 { 20_000 }
fn default_sell_max_attempts() -> u32 { 5 }
fn default_sell_retry_base_delay_ms() -> u64 { 3_000 }
fn default_seen_signatures_capacity() -> usize { 10_000 }
fn default_rpc_max_retries() -> u8 { 3 }
fn default_rpc_retry_delay_ms() -> u64 { 250 }
fn default_control_addr() -> String { "0.0.0.0:9100".to_string() }

#[derive(Debug, Clone)]
pub struct RpcSettings {
    pub rpc_url: String,
    pub ws_url: String,
    pub max_retries: u8,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Programme dont on écoute les logs.
    pub program_id: Pubkey,
    pub seen_signatures_capacity: usize,
    pub burn_check_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct TradeSettings {
    /// L'actif dépensé à l'achat et récupéré à la vente.
    pub spend_mint: Pubkey,
    pub spend_decimals: u8,
    /// Montant en unités "UI" (ex. 0.01 SOL).
    pub spend_amount: f64,
    pub max_lamports: u64,
    pub send_max_retries: usize,
    pub direction: SwapDirection,
    pub settlement_delay: Duration,
    pub sell_max_attempts: u32,
    pub sell_retry_base_delay: Duration,
}

/// Configuration validée, construite une fois au démarrage.
pub struct Config {
    pub rpc: RpcSettings,
    pub monitor: MonitorSettings,
    pub trade: TradeSettings,
    pub payer: Arc<Keypair>,
    pub control_addr: SocketAddr,
    pub auto_start: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc", &self.rpc)
            .field("monitor", &self.monitor)
            .field("trade", &self.trade)
            .field("payer", &self.payer.pubkey())
            .field("control_addr", &self.control_addr)
            .field("auto_start", &self.auto_start)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let raw = envy::from_env::<RawConfig>().context("Variables d'environnement manquantes ou invalides")?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(raw: RawConfig) -> Result<Self> {
        check_url("SOLANA_RPC_URL", &raw.solana_rpc_url, &["http://", "https://"])?;
        check_url("SOLANA_WS_URL", &raw.solana_ws_url, &["ws://", "wss://"])?;

        let spend_mint = Pubkey::from_str(&raw.spend_mint)
            .with_context(|| format!("SPEND_MINT n'est pas une adresse valide : {}", raw.spend_mint))?;
        ensure!(
            raw.spend_amount.is_finite() && raw.spend_amount > 0.0,
            "SPEND_AMOUNT doit être strictement positif (reçu {})",
            raw.spend_amount
        );
        ensure!(raw.sell_max_attempts >= 1, "SELL_MAX_ATTEMPTS doit valoir au moins 1");
        ensure!(raw.seen_signatures_capacity >= 1, "SEEN_SIGNATURES_CAPACITY doit valoir au moins 1");

        let payer = decode_keypair(&raw.payer_private_key)?;
        let control_addr = SocketAddr::from_str(&raw.control_addr)
            .with_context(|| format!("CONTROL_ADDR invalide : {}", raw.control_addr))?;

        Ok(Self {
            rpc: RpcSettings {
                rpc_url: raw.solana_rpc_url,
                ws_url: raw.solana_ws_url,
                max_retries: raw.rpc_max_retries,
                retry_delay_ms: raw.rpc_retry_delay_ms,
            },
            monitor: MonitorSettings {
                program_id: RAYDIUM_AMM_V4_PROGRAM_ID,
                seen_signatures_capacity: raw.seen_signatures_capacity,
                burn_check_enabled: raw.burn_check_enabled,
            },
            trade: TradeSettings {
                spend_mint,
                spend_decimals: raw.spend_decimals,
                spend_amount: raw.spend_amount,
                max_lamports: raw.max_lamports,
                send_max_retries: raw.send_max_retries,
                direction: raw.swap_direction,
                settlement_delay: Duration::from_millis(raw.settlement_delay_ms),
                sell_max_attempts: raw.sell_max_attempts,
                sell_retry_base_delay: Duration::from_millis(raw.sell_retry_base_delay_ms),
            },
            payer: Arc::new(payer),
            control_addr,
            auto_start: raw.auto_start,
        })
    }
}

fn check_url(name: &str, value: &str, schemes: &[&str]) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{} est vide", name);
    }
    if !schemes.iter().any(|scheme| value.starts_with(scheme)) {
        bail!("{} doit commencer par {} (reçu {})", name, schemes.join(" ou "), value);
    }
    Ok(())
}

/// Clé privée encodée en base58 (64 octets, format des portefeuilles Solana).
fn decode_keypair(encoded: &str) -> Result<Keypair> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .context("PAYER_PRIVATE_KEY n'est pas du base58 valide")?;
    Keypair::try_from(bytes.as_slice()).context("PAYER_PRIVATE_KEY ne décrit pas une paire de clés valide")
}
