mod common;

use common::{orchestrator, register_valid_pool, settlement_transaction, sig, trade_settings, LpInitFixture, MockLedger, MockSwapBuilder};
use sniper::decoders::raydium::amm_v4::{fetch_pool_descriptor, PoolDescriptor};
use sniper::decoders::spl_token_decoders::NATIVE_MINT;
use sniper::execution::{PipelineStage, SwapError};
use solana_sdk::pubkey::Pubkey;
use std::{sync::Arc, time::Duration};

const BUY_SIGNATURE: u8 = 50;
const SELL_SIGNATURE: u8 = 51;
const RECEIVED: u64 = 42_000;

async fn descriptor(ledger: &MockLedger, fixture: &LpInitFixture) -> Arc<PoolDescriptor> {
    register_valid_pool(ledger, fixture);
    Arc::new(fetch_pool_descriptor(ledger, &fixture.signature).await.unwrap())
}

/// Achat confirmé sous `BUY_SIGNATURE`, reçu montrant `RECEIVED` tokens pour le payer.
fn script_settled_buy(ledger: &MockLedger, fixture: &LpInitFixture, payer: Pubkey) {
    ledger.push_confirmed_signature(sig(BUY_SIGNATURE));
    ledger.add_transaction(settlement_transaction(sig(BUY_SIGNATURE), payer, fixture.token_mint(), RECEIVED));
}

#[tokio::test(start_paused = true)]
async fn happy_path_walks_every_stage_once() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(1));
    let descriptor = descriptor(&ledger, &fixture).await;
    script_settled_buy(&ledger, &fixture, payer);
    ledger.push_confirmed_signature(sig(SELL_SIGNATURE));

    let builder = MockSwapBuilder::succeeding();
    let (orchestrator, _reports) = orchestrator(ledger.clone(), builder.clone(), trade_settings(), payer);
    let run = orchestrator.run(descriptor).await;

    assert_eq!(
        run.history,
        vec![
            PipelineStage::Discovered,
            PipelineStage::Buying,
            PipelineStage::AwaitingSettlement,
            PipelineStage::Selling,
            PipelineStage::Done,
        ]
    );
    assert_eq!(run.buy_signature, Some(sig(BUY_SIGNATURE)));
    assert_eq!(run.sell_signature, Some(sig(SELL_SIGNATURE)));
    assert_eq!(run.received_amount, Some(RECEIVED));
    assert_eq!(run.sell_attempts, 1);
    assert!(run.error.is_none());

    let calls = builder.calls.lock().unwrap();
    let (buy, _) = &calls[0];
    assert_eq!(buy.input_mint, NATIVE_MINT);
    assert_eq!(buy.output_mint, fixture.token_mint());
    assert_eq!(buy.amount, 10_000_000);
    let (sell, _) = &calls[1];
    assert_eq!(sell.input_mint, fixture.token_mint());
    assert_eq!(sell.output_mint, NATIVE_MINT);
    assert_eq!(sell.amount, RECEIVED);
}

#[tokio::test(start_paused = true)]
async fn failed_buy_never_attempts_a_sell() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(2));
    let descriptor = descriptor(&ledger, &fixture).await;

    let builder = MockSwapBuilder::scripted(vec![false], true);
    let (orchestrator, _reports) = orchestrator(ledger.clone(), builder.clone(), trade_settings(), payer);
    let run = orchestrator.run(descriptor).await;

    assert_eq!(run.stage, PipelineStage::Failed);
    assert_eq!(run.failed_during, Some(PipelineStage::Buying));
    assert!(matches!(run.error, Some(SwapError::Build(_))));
    assert_eq!(builder.call_count(), 1);
    assert_eq!(ledger.sent.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(run.sell_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn missing_buy_receipt_fails_during_settlement() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(3));
    let descriptor = descriptor(&ledger, &fixture).await;
    ledger.push_confirmed_signature(sig(BUY_SIGNATURE));

    let builder = MockSwapBuilder::succeeding();
    let (orchestrator, _reports) = orchestrator(ledger.clone(), builder.clone(), trade_settings(), payer);
    let run = orchestrator.run(descriptor).await;

    assert_eq!(run.failed_during, Some(PipelineStage::AwaitingSettlement));
    assert!(matches!(run.error, Some(SwapError::Settlement(_))));
    assert_eq!(builder.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_received_balance_fails_during_settlement() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(4));
    let descriptor = descriptor(&ledger, &fixture).await;
    ledger.push_confirmed_signature(sig(BUY_SIGNATURE));
    // Le solde reçu appartient à un autre propriétaire.
    ledger.add_transaction(settlement_transaction(sig(BUY_SIGNATURE), Pubkey::new_unique(), fixture.token_mint(), RECEIVED));

    let builder = MockSwapBuilder::succeeding();
    let (orchestrator, _reports) = orchestrator(ledger.clone(), builder.clone(), trade_settings(), payer);
    let run = orchestrator.run(descriptor).await;

    assert_eq!(run.failed_during, Some(PipelineStage::AwaitingSettlement));
    assert_eq!(builder.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn settlement_waits_for_the_configured_delay() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(5));
    let descriptor = descriptor(&ledger, &fixture).await;
    script_settled_buy(&ledger, &fixture, payer);

    let builder = MockSwapBuilder::succeeding();
    let (orchestrator, _reports) = orchestrator(ledger.clone(), builder.clone(), trade_settings(), payer);
    orchestrator.run(descriptor).await;

    let instants = builder.call_instants();
    assert_eq!(instants[1] - instants[0], Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn sell_retries_with_linear_backoff_then_gives_up() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(6));
    let descriptor = descriptor(&ledger, &fixture).await;
    script_settled_buy(&ledger, &fixture, payer);

    // L'achat passe, toutes les ventes échouent.
    let builder = MockSwapBuilder::scripted(vec![true], false);
    let (orchestrator, _reports) = orchestrator(ledger.clone(), builder.clone(), trade_settings(), payer);
    let run = orchestrator.run(descriptor).await;

    assert_eq!(run.stage, PipelineStage::Failed);
    assert_eq!(run.failed_during, Some(PipelineStage::Selling));
    assert_eq!(run.sell_attempts, 5);
    match &run.error {
        Some(SwapError::RetriesExhausted { attempts, last }) => {
            assert_eq!(*attempts, 5);
            assert!(matches!(**last, SwapError::Build(_)));
        }
        other => panic!("attendu RetriesExhausted, obtenu {other:?}"),
    }

    // 1 achat + 5 ventes.
    let instants = builder.call_instants();
    assert_eq!(instants.len(), 6);
    let sell_gaps: Vec<Duration> = instants[1..].windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(
        sell_gaps,
        vec![
            Duration::from_secs(3),
            Duration::from_secs(6),
            Duration::from_secs(9),
            Duration::from_secs(12),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn sell_recovers_after_transient_failures() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(7));
    let descriptor = descriptor(&ledger, &fixture).await;
    script_settled_buy(&ledger, &fixture, payer);

    let builder = MockSwapBuilder::scripted(vec![true, false, false], true);
    let (orchestrator, _reports) = orchestrator(ledger.clone(), builder.clone(), trade_settings(), payer);
    let run = orchestrator.run(descriptor).await;

    assert_eq!(run.stage, PipelineStage::Done);
    assert_eq!(run.sell_attempts, 3);
    assert_eq!(builder.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn launched_run_is_reported_to_the_supervisor_channel() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let fixture = LpInitFixture::new(sig(8));
    let descriptor = descriptor(&ledger, &fixture).await;
    script_settled_buy(&ledger, &fixture, payer);

    let (orchestrator, mut reports) = orchestrator(ledger.clone(), MockSwapBuilder::succeeding(), trade_settings(), payer);
    orchestrator.launch(Arc::clone(&descriptor)).await.unwrap();

    let run = reports.recv().await.unwrap();
    assert_eq!(run.stage, PipelineStage::Done);
    assert_eq!(run.descriptor.id, descriptor.id);
    assert_eq!(run.outcome_label(), "done");
}

#[tokio::test(start_paused = true)]
async fn supervisor_counts_terminal_outcomes() {
    use sniper::execution::supervisor::record_outcome;
    use sniper::monitoring::metrics::PIPELINE_OUTCOMES;

    let ledger = MockLedger::new();
    let fixture = LpInitFixture::new(sig(9));
    let descriptor = descriptor(&ledger, &fixture).await;
    let (orchestrator, _reports) =
        orchestrator(ledger.clone(), MockSwapBuilder::scripted(vec![false], true), trade_settings(), Pubkey::new_unique());
    let run = orchestrator.run(descriptor).await;

    let counter = PIPELINE_OUTCOMES.with_label_values(&["failed_buying"]);
    let before = counter.get();
    record_outcome(&run);
    assert_eq!(counter.get(), before + 1);
}
