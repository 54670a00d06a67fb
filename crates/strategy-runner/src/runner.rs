//! Strategy runner - main execution loop.
//!
//! The runner owns a [`StrategyEngine`] and is the only task that touches it.
//! Market data, execution events and lifecycle commands all arrive over
//! channels held by a [`StrategyHandle`]; alerts and timers are fired from
//! the same loop, so every mutation of strategy state is serialized.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use model::MarketEvent;
use strategy_core::{Event, Strategy, StrategyEngine, StrategyError};

use crate::config::RunnerConfig;
use crate::error::RunnerError;

type Reply = oneshot::Sender<Result<(), StrategyError>>;

/// Lifecycle commands handled by the runner loop.
#[derive(Debug)]
pub enum RunnerCommand {
    Start(Reply),
    Stop(Reply),
    Reset(Reply),
}

impl RunnerCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Stop(_) => "stop",
            Self::Reset(_) => "reset",
        }
    }
}

/// Producer side of a running strategy.
#[derive(Debug, Clone)]
pub struct StrategyHandle {
    market_tx: mpsc::Sender<MarketEvent>,
    event_tx: mpsc::Sender<Event>,
    command_tx: mpsc::Sender<RunnerCommand>,
}

impl StrategyHandle {
    /// Send a tick or bar, waiting for channel capacity.
    pub async fn send_market(&self, event: MarketEvent) -> Result<(), RunnerError> {
        self.market_tx
            .send(event)
            .await
            .map_err(|_| RunnerError::ChannelClosed)
    }

    /// Send a tick or bar without waiting; fails if the channel is full.
    pub fn try_send_market(&self, event: MarketEvent) -> Result<(), RunnerError> {
        self.market_tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => RunnerError::ChannelFull("market"),
            TrySendError::Closed(_) => RunnerError::ChannelClosed,
        })
    }

    /// Send an order, account or time event, waiting for channel capacity.
    pub async fn send_event(&self, event: Event) -> Result<(), RunnerError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RunnerError::ChannelClosed)
    }

    /// Sender for execution clients that report back into the runner.
    pub fn event_sender(&self) -> mpsc::Sender<Event> {
        self.event_tx.clone()
    }

    pub fn market_sender(&self) -> mpsc::Sender<MarketEvent> {
        self.market_tx.clone()
    }

    pub async fn start(&self) -> Result<(), RunnerError> {
        self.command(RunnerCommand::Start).await
    }

    pub async fn stop(&self) -> Result<(), RunnerError> {
        self.command(RunnerCommand::Stop).await
    }

    pub async fn reset(&self) -> Result<(), RunnerError> {
        self.command(RunnerCommand::Reset).await
    }

    async fn command(&self, make: fn(Reply) -> RunnerCommand) -> Result<(), RunnerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| RunnerError::ChannelClosed)?;
        let result = reply_rx.await.map_err(|_| RunnerError::ChannelClosed)?;
        Ok(result?)
    }
}

/// The strategy runner drives one strategy engine.
pub struct StrategyRunner<S: Strategy> {
    engine: StrategyEngine<S>,
    market_rx: mpsc::Receiver<MarketEvent>,
    event_rx: mpsc::Receiver<Event>,
    command_rx: mpsc::Receiver<RunnerCommand>,
}

impl<S: Strategy> StrategyRunner<S> {
    /// Create a runner and the handle feeding it.
    pub fn new(config: &RunnerConfig, engine: StrategyEngine<S>) -> (Self, StrategyHandle) {
        let (market_tx, market_rx) = mpsc::channel(config.market_channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (command_tx, command_rx) = mpsc::channel(config.command_channel_capacity);

        let runner = Self {
            engine,
            market_rx,
            event_rx,
            command_rx,
        };
        let handle = StrategyHandle {
            market_tx,
            event_tx,
            command_tx,
        };
        (runner, handle)
    }

    pub fn engine(&self) -> &StrategyEngine<S> {
        &self.engine
    }

    /// Mutable engine access for wiring before `run`.
    pub fn engine_mut(&mut self) -> &mut StrategyEngine<S> {
        &mut self.engine
    }

    /// Run the strategy loop.
    ///
    /// This method runs until shutdown is signaled or every channel closes,
    /// stops the strategy if it is still running, and hands the engine back.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<StrategyEngine<S>, RunnerError> {
        info!(strategy = %self.engine.context().identity(), "starting strategy runner");

        loop {
            // Alerts are only polled while running; they stay queued otherwise.
            let deadline = if self.engine.is_running() {
                self.engine.next_alert_deadline()
            } else {
                None
            };

            tokio::select! {
                biased;

                // Shutdown signal (highest priority)
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("shutdown signal received");
                        break;
                    }
                }

                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command).await;
                }

                // Alerts and timers
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let fired = self.engine.fire_due_alerts(Instant::now()).await;
                    debug!(fired, "time events fired");
                }

                // Execution events (higher priority than market data)
                Some(event) = self.event_rx.recv() => {
                    self.engine.dispatch(event).await;
                }

                // Market data
                Some(event) = self.market_rx.recv() => {
                    self.engine.handle_market_event(event).await;
                }

                // All channels closed
                else => {
                    warn!("all channels closed");
                    break;
                }
            }
        }

        if self.engine.is_running() {
            if let Err(e) = self.engine.stop().await {
                error!(error = %e, "error stopping strategy during shutdown");
            }
        }

        info!("strategy runner stopped");
        Ok(self.engine)
    }

    async fn handle_command(&mut self, command: RunnerCommand) {
        debug!(command = command.name(), "handling command");
        let (result, reply) = match command {
            RunnerCommand::Start(reply) => (self.engine.start().await, reply),
            RunnerCommand::Stop(reply) => (self.engine.stop().await, reply),
            RunnerCommand::Reset(reply) => (self.engine.reset().await, reply),
        };
        if reply.send(result).is_err() {
            debug!("command caller went away before the reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dry_run::{DryRunConfig, DryRunExecutionClient};
    use async_trait::async_trait;
    use metrics::SharedMetrics;
    use model::{Bar, BarType, QuoteType, Resolution, Tick};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;
    use strategy_core::{StrategyConfig, StrategyContext};

    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        time_labels: Vec<String>,
    }

    /// Schedules a heartbeat and a one-shot alert on start; the alert
    /// schedules a second alert when it fires.
    struct Scheduling {
        log: Arc<Mutex<Log>>,
    }

    #[async_trait]
    impl Strategy for Scheduling {
        fn name(&self) -> &str {
            "Scheduling"
        }

        async fn on_start(&mut self, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
            self.log.lock().calls.push("on_start".to_string());
            let now_ms = ctx.now_ms();
            ctx.set_timer("beat", now_ms + 1, Duration::from_millis(100), 0, true)?;
            ctx.set_time_alert("once", now_ms + 50, 0)
        }

        async fn on_tick(&mut self, _tick: &Tick, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
            self.log.lock().calls.push("on_tick".to_string());
            Ok(())
        }

        async fn on_bar(
            &mut self,
            _bar_type: &BarType,
            _bar: &Bar,
            _ctx: &mut StrategyContext,
        ) -> Result<(), StrategyError> {
            self.log.lock().calls.push("on_bar".to_string());
            Ok(())
        }

        async fn on_event(&mut self, event: &Event, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
            if let Event::Time(time) = event {
                self.log.lock().time_labels.push(time.label.clone());
                if time.label == "once" {
                    let at = ctx.now_ms() + 50;
                    ctx.set_time_alert("late", at, 0)?;
                }
            }
            Ok(())
        }

        async fn on_stop(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
            self.log.lock().calls.push("on_stop".to_string());
            Ok(())
        }

        async fn on_reset(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
            self.log.lock().calls.push("on_reset".to_string());
            Ok(())
        }
    }

    fn runner() -> (StrategyRunner<Scheduling>, StrategyHandle, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let engine = StrategyEngine::new(
            Scheduling { log: log.clone() },
            StrategyConfig::default(),
        )
        .unwrap();
        let (mut runner, handle) = StrategyRunner::new(&RunnerConfig::default(), engine);
        let client = DryRunExecutionClient::new(DryRunConfig::default(), handle.event_sender());
        runner
            .engine_mut()
            .register_execution_client(Arc::new(client));
        (runner, handle, log)
    }

    fn count(labels: &[String], label: &str) -> usize {
        labels.iter().filter(|l| l.as_str() == label).count()
    }

    #[tokio::test]
    async fn test_runner_shutdown() {
        let (runner, _handle, log) = runner();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Immediately signal shutdown
        shutdown_tx.send(true).unwrap();

        let engine = runner.run(shutdown_rx).await.unwrap();
        assert!(!engine.is_running());
        assert!(log.lock().calls.is_empty());
    }

    /// Yield to the runner task until the metrics show `bars` bars and `ticks` ticks.
    async fn wait_for_market(metrics: &SharedMetrics, bars: u64, ticks: u64) {
        while metrics.bars_received() < bars || metrics.ticks_received() < ticks {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_market_data_reaches_running_strategy() {
        let (runner, handle, log) = runner();
        let metrics = runner.engine().metrics().clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(runner.run(shutdown_rx));

        let bar_type = BarType::new("BTCUSDT", 1, Resolution::Minute, QuoteType::Last);
        let bar = Bar::new(dec!(1), dec!(1), dec!(1), dec!(1), dec!(1), 1);

        // Stored but not delivered while stopped.
        handle
            .send_market(MarketEvent::Bar(bar_type.clone(), bar.clone()))
            .await
            .unwrap();
        wait_for_market(&metrics, 1, 0).await;

        handle.start().await.unwrap();
        handle
            .send_market(MarketEvent::Bar(bar_type.clone(), bar))
            .await
            .unwrap();
        handle
            .send_market(MarketEvent::Tick(Tick::new("BTCUSDT", dec!(1), dec!(2), 2)))
            .await
            .unwrap();
        wait_for_market(&metrics, 2, 1).await;

        shutdown_tx.send(true).unwrap();
        let engine = task.await.unwrap().unwrap();

        assert_eq!(log.lock().calls, vec!["on_start", "on_bar", "on_tick", "on_stop"]);
        assert_eq!(engine.context().bars(&bar_type).unwrap().len(), 2);
        assert_eq!(engine.metrics().bars_received(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alerts_fire_including_late_ones_and_timers_stop() {
        let (runner, handle, log) = runner();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(runner.run(shutdown_rx));

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;

        {
            let log = log.lock();
            assert_eq!(count(&log.time_labels, "once"), 1);
            assert_eq!(count(&log.time_labels, "late"), 1);
            assert_eq!(count(&log.time_labels, "beat"), 3);
        }

        handle.stop().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count(&log.lock().time_labels, "beat"), 3);

        shutdown_tx.send(true).unwrap();
        let engine = task.await.unwrap().unwrap();
        assert!(engine.context().scheduler().is_empty());
        assert_eq!(engine.metrics().time_events_fired(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_stays_queued_across_stop_and_start() {
        let (mut runner, handle, log) = runner();
        let now_ms = runner.engine().context().now_ms();
        runner
            .engine_mut()
            .context_mut()
            .set_time_alert("held", now_ms + 500, 0)
            .unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(runner.run(shutdown_rx));

        // Never runs while the deadline passes.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count(&log.lock().time_labels, "held"), 0);

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count(&log.lock().time_labels, "held"), 1);

        // Stopped again before the on_start alert is due.
        handle.stop().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count(&log.lock().time_labels, "once"), 0);

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count(&log.lock().time_labels, "once"), 1);
        assert_eq!(count(&log.lock().time_labels, "held"), 1);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reset_while_running_is_ignored() {
        let (runner, handle, log) = runner();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(runner.run(shutdown_rx));

        handle.start().await.unwrap();
        handle.reset().await.unwrap();
        handle.stop().await.unwrap();
        handle.reset().await.unwrap();

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(log.lock().calls, vec!["on_start", "on_stop", "on_reset"]);
    }

    #[tokio::test]
    async fn test_try_send_market_reports_full_channel() {
        let log = Arc::new(Mutex::new(Log::default()));
        let engine =
            StrategyEngine::new(Scheduling { log }, StrategyConfig::default()).unwrap();
        let config = RunnerConfig::default().with_channel_capacity(1);
        let (_runner, handle) = StrategyRunner::new(&config, engine);

        let tick = || MarketEvent::Tick(Tick::new("BTCUSDT", dec!(1), dec!(2), 1));
        handle.try_send_market(tick()).unwrap();
        assert!(matches!(
            handle.try_send_market(tick()),
            Err(RunnerError::ChannelFull("market"))
        ));
    }

    #[tokio::test]
    async fn test_handle_errors_after_runner_exit() {
        let (runner, handle, _log) = runner();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        drop(runner.run(shutdown_rx).await.unwrap());

        assert!(matches!(handle.start().await, Err(RunnerError::ChannelClosed)));
    }
}
