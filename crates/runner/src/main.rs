use std::sync::Arc;
use std::time::Duration;

use metrics::{create_metrics, SharedMetrics};
use model::{unix_millis, Bar, BarType, MarketEvent, QuoteType, Resolution};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategy_core::StrategyEngine;
use strategy_runner::examples::{PriceThresholdConfig, PriceThresholdStrategy};
use strategy_runner::{
    DryRunConfig, DryRunExecutionClient, RunnerConfig, StrategyHandle, StrategyRunner,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Largest per-bar move of the synthetic feed, in basis points.
const MAX_MOVE_BPS: i64 = 40;

#[tokio::main]
async fn main() {
    common::init_logging();

    let symbol = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "BTCUSDT".to_string());
    let config = RunnerConfig::from_env();
    let start_price: Decimal = common::env_or("FEED_START_PRICE", dec!(50000));
    let bar_interval = Duration::from_millis(common::env_or("FEED_INTERVAL_MS", 1000u64));

    let bar_type = BarType::new(symbol.clone(), 1, Resolution::Second, QuoteType::Last);
    let strategy = PriceThresholdStrategy::new(PriceThresholdConfig {
        bar_type: bar_type.clone(),
        buy_threshold: common::env_or("BUY_THRESHOLD", start_price * dec!(0.995)),
        sell_threshold: common::env_or("SELL_THRESHOLD", start_price * dec!(1.005)),
        quantity: common::env_or("ORDER_QUANTITY", dec!(0.01)),
        cooldown_ms: common::env_or("COOLDOWN_MS", 5_000i64),
        sma_period: common::env_or("SMA_PERIOD", 20usize),
        heartbeat_interval: config.health_log_interval,
    });

    info!(symbol = %symbol, start_price = %start_price, "Starting paper trading runner");

    // Create metrics
    let metrics = create_metrics();

    let engine = match StrategyEngine::new(strategy, config.strategy.clone()) {
        Ok(engine) => engine.with_metrics(metrics.clone()),
        Err(e) => {
            error!(error = %e, "Invalid strategy configuration");
            return;
        }
    };

    let (mut runner, handle) = StrategyRunner::new(&config, engine);
    let client = Arc::new(DryRunExecutionClient::new(
        DryRunConfig::default(),
        handle.event_sender(),
    ));
    runner.engine_mut().register_execution_client(client.clone());

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let runner_handle = tokio::spawn(runner.run(shutdown_rx));

    // Spawn ctrl_c handler
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx_clone.send(true);
        }
    });

    tokio::spawn(report_health(
        metrics.clone(),
        config.health_log_interval,
        shutdown_tx.subscribe(),
    ));

    let feed_handle = tokio::spawn(run_feed(
        handle.clone(),
        client.clone(),
        bar_type,
        start_price,
        bar_interval,
        shutdown_tx.subscribe(),
    ));

    if let Err(e) = handle.start().await {
        error!(error = %e, "Failed to start strategy");
        let _ = shutdown_tx.send(true);
    }

    match runner_handle.await {
        Ok(Ok(engine)) => {
            let ctx = engine.context();
            info!(
                open_positions = ctx.positions().len(),
                orders = ctx.orders().len(),
                cash = %client.cash(),
                "Strategy runner finished"
            );
        }
        Ok(Err(e)) => error!(error = %e, "Strategy runner error"),
        Err(e) => error!(error = %e, "Strategy runner task failed"),
    }

    let _ = feed_handle.await;

    // Print final metrics
    let snapshot = metrics.snapshot();
    println!("\n{}", snapshot);

    info!("Shutdown complete");
}

/// Periodic health reporter.
async fn report_health(
    metrics: SharedMetrics,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let snapshot = metrics.snapshot();
                let status = snapshot.health_status();
                info!(
                    status = %status,
                    bars = snapshot.bars_received,
                    events = snapshot.events_dispatched,
                    orders = snapshot.orders_submitted,
                    closed_positions = snapshot.positions_closed,
                    errors = snapshot.callback_errors,
                    warnings = snapshot.ledger_warnings,
                    "Health check"
                );
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

/// Synthetic random-walk bar feed.
async fn run_feed(
    handle: StrategyHandle,
    client: Arc<DryRunExecutionClient>,
    bar_type: BarType,
    start_price: Decimal,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut rng = StdRng::from_entropy();
    let mut interval = tokio::time::interval(period);
    let mut price = start_price;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let open = price;
                let bps = rng.gen_range(-MAX_MOVE_BPS..=MAX_MOVE_BPS);
                price = (price + price * Decimal::new(bps, 4)).round_dp(2);
                let spread = price * Decimal::new(rng.gen_range(0..=10), 4);
                let bar = Bar::new(
                    open,
                    open.max(price) + spread,
                    open.min(price) - spread,
                    price,
                    Decimal::new(rng.gen_range(1..=500), 2),
                    unix_millis(),
                );

                client.update_price(&bar_type.symbol, price);
                if let Err(e) = handle.send_market(MarketEvent::Bar(bar_type.clone(), bar)).await {
                    warn!(error = %e, "Market channel closed, stopping feed");
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
