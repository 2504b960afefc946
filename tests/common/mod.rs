#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytemuck::Zeroable;
use serde_json::json;
use sniper::{
    config::TradeSettings,
    decoders::{
        raydium::amm_v4::{openbook_market::MarketStateV3, PoolDescriptor, RAYDIUM_AMM_V4_PROGRAM_ID},
        spl_token_decoders::{mint::MintAccount, NATIVE_MINT, TOKEN_PROGRAM_ID},
        transaction::{InnerInstruction, InnerInstructionGroup, ParsedTransaction, TokenBalance, TopLevelInstruction},
    },
    execution::{PipelineRun, SwapBuilder, SwapConfig, SwapDirection, SwapOrchestrator, SwapTransaction},
    rpc::{LedgerClient, LogNotification, LogSubscription, RpcError},
};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU8, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, Notify},
    time::Instant,
};

pub const SUBSCRIPTION_ID: u64 = 7;

pub fn sig(n: u8) -> Signature {
    Signature::from([n; 64])
}

// --- Ledger en mémoire ---

#[derive(Debug, Clone)]
pub enum SupplyResponse {
    Amount(u64),
    NotFound,
    Failure,
}

#[derive(Default)]
pub struct MockLedger {
    pub transactions: Mutex<HashMap<Signature, ParsedTransaction>>,
    pub accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    pub mints: Mutex<HashMap<Pubkey, MintAccount>>,
    pub failing_mints: Mutex<Vec<Pubkey>>,
    pub supplies: Mutex<HashMap<Pubkey, SupplyResponse>>,
    /// Signatures renvoyées par `send_and_confirm`, dans l'ordre.
    pub confirmed_signatures: Mutex<VecDeque<Signature>>,
    pub notifier: Mutex<Option<mpsc::Sender<LogNotification>>>,
    pub unsubscribed: Mutex<Vec<u64>>,
    pub subscribe_calls: AtomicUsize,
    pub transaction_fetches: AtomicUsize,
    pub mint_fetches: AtomicUsize,
    /// Si présent, `fetch_mint_account` attend ce signal avant de répondre.
    pub mint_gate: Mutex<Option<Arc<Notify>>>,
    pub sent: AtomicUsize,
    next_signature: AtomicU8,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { next_signature: AtomicU8::new(100), ..Self::default() })
    }

    pub fn add_transaction(&self, transaction: ParsedTransaction) {
        self.transactions.lock().unwrap().insert(transaction.signature, transaction);
    }

    pub fn add_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }

    pub fn add_mint(&self, mint: MintAccount) {
        self.mints.lock().unwrap().insert(mint.address, mint);
    }

    pub fn set_supply(&self, mint: Pubkey, response: SupplyResponse) {
        self.supplies.lock().unwrap().insert(mint, response);
    }

    pub fn push_confirmed_signature(&self, signature: Signature) {
        self.confirmed_signatures.lock().unwrap().push_back(signature);
    }

    /// Pousse une notification dans l'abonnement actif.
    pub async fn notify(&self, notification: LogNotification) {
        let sender = self.notifier.lock().unwrap().clone().expect("aucun abonnement actif");
        sender.send(notification).await.expect("abonnement fermé");
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn logs_subscribe(&self, _program_id: &Pubkey) -> Result<LogSubscription> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        *self.notifier.lock().unwrap() = Some(tx);
        Ok(LogSubscription { id: SUBSCRIPTION_ID, notifications: rx })
    }

    async fn logs_unsubscribe(&self, subscription_id: u64) -> Result<()> {
        self.unsubscribed.lock().unwrap().push(subscription_id);
        self.notifier.lock().unwrap().take();
        Ok(())
    }

    async fn fetch_transaction(&self, signature: &Signature) -> Result<Option<ParsedTransaction>> {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn fetch_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn fetch_mint_account(&self, mint: &Pubkey) -> Result<Option<MintAccount>> {
        self.mint_fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.mint_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing_mints.lock().unwrap().contains(mint) {
            return Err(anyhow!("connexion refusée"));
        }
        Ok(self.mints.lock().unwrap().get(mint).cloned())
    }

    async fn fetch_token_supply(&self, mint: &Pubkey) -> Result<u64, RpcError> {
        match self.supplies.lock().unwrap().get(mint).cloned() {
            Some(SupplyResponse::Amount(amount)) => Ok(amount),
            Some(SupplyResponse::NotFound) => Err(RpcError::AccountNotFound { code: -32602 }),
            Some(SupplyResponse::Failure) | None => Err(RpcError::Other(anyhow!("timeout"))),
        }
    }

    async fn send_and_confirm(&self, _transaction: &SwapTransaction) -> Result<Signature> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let scripted = self.confirmed_signatures.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| sig(self.next_signature.fetch_add(1, Ordering::SeqCst))))
    }
}

// --- Swap builder scripté ---

pub struct MockSwapBuilder {
    /// Résultat de chaque appel, dans l'ordre ; `default_ok` ensuite.
    script: Mutex<VecDeque<bool>>,
    default_ok: bool,
    pub calls: Mutex<Vec<(SwapConfig, Instant)>>,
}

impl MockSwapBuilder {
    pub fn succeeding() -> Arc<Self> {
        Self::scripted(vec![], true)
    }

    pub fn scripted(script: Vec<bool>, default_ok: bool) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(script.into()), default_ok, calls: Mutex::new(Vec::new()) })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl SwapBuilder for MockSwapBuilder {
    async fn build_swap(&self, _pool: &PoolDescriptor, config: &SwapConfig) -> Result<SwapTransaction> {
        self.calls.lock().unwrap().push((config.clone(), Instant::now()));
        let ok = self.script.lock().unwrap().pop_front().unwrap_or(self.default_ok);
        if !ok {
            return Err(anyhow!("blockhash introuvable"));
        }
        Ok(SwapTransaction {
            transaction: VersionedTransaction::default(),
            last_valid_block_height: 1_000,
            max_send_retries: config.max_retries,
        })
    }
}

// --- Configuration ---

pub fn trade_settings() -> TradeSettings {
    TradeSettings {
        spend_mint: NATIVE_MINT,
        spend_decimals: 9,
        spend_amount: 0.01,
        max_lamports: 100_000,
        send_max_retries: 3,
        direction: SwapDirection::ExactIn,
        settlement_delay: Duration::from_millis(1_000),
        sell_max_attempts: 5,
        sell_retry_base_delay: Duration::from_millis(3_000),
    }
}

pub fn orchestrator(
    ledger: Arc<MockLedger>,
    builder: Arc<MockSwapBuilder>,
    trade: TradeSettings,
    payer: Pubkey,
) -> (Arc<SwapOrchestrator>, mpsc::UnboundedReceiver<PipelineRun>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let orchestrator = SwapOrchestrator::new(ledger, builder, trade, payer, tx);
    (Arc::new(orchestrator), rx)
}

// --- Mints ---

pub fn safe_mint(address: Pubkey) -> MintAccount {
    MintAccount {
        address,
        owner_program: TOKEN_PROGRAM_ID,
        mint_authority: None,
        freeze_authority: None,
        is_initialized: true,
        decimals: 6,
        supply: 1_000_000_000,
    }
}

// --- Transaction d'initialisation de pool ---

/// Une transaction `initialize2` complète, cohérente avec la table de comptes V4.
#[derive(Debug, Clone)]
pub struct LpInitFixture {
    pub signature: Signature,
    pub pool_id: Pubkey,
    pub authority: Pubkey,
    pub open_orders: Pubkey,
    pub lp_mint: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub target_orders: Pubkey,
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub lp_vault: Pubkey,
    pub creator: Pubkey,
    pub token_decimals: u8,
    pub lp_decimals: u8,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub lp_reserve: u64,
    pub open_time: u64,
}

impl LpInitFixture {
    /// Pool TOKEN/WSOL : le token est en base.
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            pool_id: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            open_orders: Pubkey::new_unique(),
            lp_mint: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: NATIVE_MINT,
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            target_orders: Pubkey::new_unique(),
            market_program_id: Pubkey::new_unique(),
            market_id: Pubkey::new_unique(),
            lp_vault: Pubkey::new_unique(),
            creator: Pubkey::new_unique(),
            token_decimals: 6,
            lp_decimals: 9,
            base_reserve: 500_000_000_000,
            quote_reserve: 2_000_000_000,
            lp_reserve: 31_622_776_601,
            open_time: 1_700_000_000,
        }
    }

    /// Pool WSOL/TOKEN : le SOL natif est en base.
    pub fn native_base(signature: Signature) -> Self {
        let mut fixture = Self::new(signature);
        fixture.quote_mint = fixture.base_mint;
        fixture.base_mint = NATIVE_MINT;
        std::mem::swap(&mut fixture.base_reserve, &mut fixture.quote_reserve);
        fixture
    }

    pub fn token_mint(&self) -> Pubkey {
        if self.base_mint == NATIVE_MINT { self.quote_mint } else { self.base_mint }
    }

    pub fn init_accounts(&self) -> Vec<Pubkey> {
        let mut accounts: Vec<Pubkey> = (0..21).map(|_| Pubkey::new_unique()).collect();
        accounts[4] = self.pool_id;
        accounts[5] = self.authority;
        accounts[6] = self.open_orders;
        accounts[7] = self.lp_mint;
        accounts[8] = self.base_mint;
        accounts[9] = self.quote_mint;
        accounts[10] = self.base_vault;
        accounts[11] = self.quote_vault;
        accounts[13] = self.target_orders;
        accounts[15] = self.market_program_id;
        accounts[16] = self.market_id;
        accounts[17] = self.creator;
        accounts
    }

    pub fn init_log_line(&self) -> String {
        format!(
            "Program log: initialize2: InitializeInstruction2 {{ nonce: 254, open_time: {}, init_pc_amount: {}, init_coin_amount: {} }}",
            self.open_time, self.quote_reserve, self.base_reserve
        )
    }

    pub fn logs(&self) -> Vec<String> {
        vec![
            format!("Program {} invoke [1]", RAYDIUM_AMM_V4_PROGRAM_ID),
            self.init_log_line(),
            format!("Program {} success", RAYDIUM_AMM_V4_PROGRAM_ID),
        ]
    }

    pub fn notification(&self) -> LogNotification {
        LogNotification { signature: self.signature, err: None, logs: self.logs() }
    }

    pub fn transaction(&self) -> ParsedTransaction {
        let token = |kind: &str, info: serde_json::Value| InnerInstruction {
            program_id: TOKEN_PROGRAM_ID,
            kind: Some(kind.to_string()),
            info,
        };

        let inner = vec![
            InnerInstruction {
                program_id: solana_sdk::system_program::id(),
                kind: Some("createAccount".to_string()),
                info: json!({ "source": self.creator.to_string(), "newAccount": self.lp_mint.to_string() }),
            },
            token(
                "initializeMint",
                json!({ "mint": self.lp_mint.to_string(), "decimals": self.lp_decimals, "mintAuthority": self.authority.to_string() }),
            ),
            token(
                "transfer",
                json!({
                    "source": Pubkey::new_unique().to_string(),
                    "destination": self.base_vault.to_string(),
                    "authority": self.creator.to_string(),
                    "amount": self.base_reserve.to_string(),
                }),
            ),
            token(
                "transfer",
                json!({
                    "source": Pubkey::new_unique().to_string(),
                    "destination": self.quote_vault.to_string(),
                    "authority": self.creator.to_string(),
                    "amount": self.quote_reserve.to_string(),
                }),
            ),
            token(
                "mintTo",
                json!({
                    "mint": self.lp_mint.to_string(),
                    "account": self.lp_vault.to_string(),
                    "mintAuthority": self.authority.to_string(),
                    "amount": self.lp_reserve.to_string(),
                }),
            ),
        ];

        ParsedTransaction {
            signature: self.signature,
            instructions: vec![
                TopLevelInstruction {
                    program_id: Pubkey::new_unique(),
                    accounts: vec![],
                },
                TopLevelInstruction {
                    program_id: RAYDIUM_AMM_V4_PROGRAM_ID,
                    accounts: self.init_accounts(),
                },
            ],
            inner_instructions: vec![InnerInstructionGroup { index: 1, instructions: inner }],
            pre_token_balances: vec![
                TokenBalance {
                    account_index: 18,
                    mint: NATIVE_MINT,
                    owner: Some(self.creator),
                    amount: 5_000_000_000,
                    decimals: 9,
                },
                TokenBalance {
                    account_index: 19,
                    mint: self.token_mint(),
                    owner: Some(self.creator),
                    amount: 1_000_000_000_000,
                    decimals: self.token_decimals,
                },
            ],
            post_token_balances: vec![],
            log_messages: self.logs(),
        }
    }

    /// Le compte de marché référencé par la pool, avec un nonce dérivable.
    pub fn market(&self) -> MarketFixture {
        MarketFixture::new(self.market_id, self.market_program_id)
    }
}

#[derive(Debug, Clone)]
pub struct MarketFixture {
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_queue: Pubkey,
    pub authority: Pubkey,
    pub data: Vec<u8>,
}

impl MarketFixture {
    pub fn new(market_id: Pubkey, program_id: Pubkey) -> Self {
        let (nonce, authority) = (0u64..256)
            .find_map(|n| {
                Pubkey::create_program_address(&[market_id.as_ref(), &n.to_le_bytes()], &program_id)
                    .ok()
                    .map(|authority| (n, authority))
            })
            .expect("aucun nonce valide");

        let (base_vault, quote_vault, bids, asks, event_queue) =
            (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());

        let mut state = MarketStateV3::zeroed();
        state.own_address = market_id.to_bytes();
        state.vault_signer_nonce = nonce;
        state.base_vault = base_vault.to_bytes();
        state.quote_vault = quote_vault.to_bytes();
        state.bids = bids.to_bytes();
        state.asks = asks.to_bytes();
        state.event_queue = event_queue.to_bytes();

        let mut data = b"serum".to_vec();
        data.extend_from_slice(bytemuck::bytes_of(&state));
        data.extend_from_slice(b"padding");

        Self { base_vault, quote_vault, bids, asks, event_queue, authority, data }
    }
}

/// Enregistre dans le ledger tout ce qu'il faut pour décoder et valider la pool.
pub fn register_valid_pool(ledger: &MockLedger, fixture: &LpInitFixture) -> MarketFixture {
    let market = fixture.market();
    ledger.add_transaction(fixture.transaction());
    ledger.add_account(fixture.market_id, market.data.clone());
    ledger.add_mint(safe_mint(fixture.token_mint()));
    market
}

/// Reçu de l'achat : le payer détient `amount` du token acheté.
pub fn settlement_transaction(signature: Signature, payer: Pubkey, mint: Pubkey, amount: u64) -> ParsedTransaction {
    ParsedTransaction {
        signature,
        instructions: vec![],
        inner_instructions: vec![],
        pre_token_balances: vec![],
        post_token_balances: vec![
            TokenBalance { account_index: 1, mint: NATIVE_MINT, owner: Some(payer), amount: 0, decimals: 9 },
            TokenBalance { account_index: 2, mint, owner: Some(payer), amount, decimals: 6 },
        ],
        log_messages: vec![],
    }
}

/// Attend qu'une condition devienne vraie (temps réel, 5 s max).
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(std::time::Instant::now() < deadline, "condition jamais remplie");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
