use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe metrics collector for a strategy runtime.
#[derive(Debug)]
pub struct RuntimeMetrics {
    // Counters
    ticks_received: AtomicU64,
    bars_received: AtomicU64,
    events_dispatched: AtomicU64,
    time_events_fired: AtomicU64,
    orders_submitted: AtomicU64,
    positions_closed: AtomicU64,
    ledger_warnings: AtomicU64,
    callback_errors: AtomicU64,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_market_data_time: Option<Instant>,
    last_error_time: Option<Instant>,
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self {
            ticks_received: AtomicU64::new(0),
            bars_received: AtomicU64::new(0),
            events_dispatched: AtomicU64::new(0),
            time_events_fired: AtomicU64::new(0),
            orders_submitted: AtomicU64::new(0),
            positions_closed: AtomicU64::new(0),
            ledger_warnings: AtomicU64::new(0),
            callback_errors: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_market_data_time: None,
                last_error_time: None,
            }),
        }
    }

    // --- Increment methods ---

    pub fn inc_ticks_received(&self) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_market_data_time = Some(Instant::now());
    }

    pub fn inc_bars_received(&self) {
        self.bars_received.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_market_data_time = Some(Instant::now());
    }

    pub fn inc_events_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_time_events_fired(&self) {
        self.time_events_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_submitted(&self) {
        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_positions_closed(&self) {
        self.positions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ledger_warnings(&self) {
        self.ledger_warnings.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_callback_errors(&self) {
        self.callback_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    // --- Getter methods ---

    pub fn ticks_received(&self) -> u64 {
        self.ticks_received.load(Ordering::Relaxed)
    }

    pub fn bars_received(&self) -> u64 {
        self.bars_received.load(Ordering::Relaxed)
    }

    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched.load(Ordering::Relaxed)
    }

    pub fn time_events_fired(&self) -> u64 {
        self.time_events_fired.load(Ordering::Relaxed)
    }

    pub fn orders_submitted(&self) -> u64 {
        self.orders_submitted.load(Ordering::Relaxed)
    }

    pub fn positions_closed(&self) -> u64 {
        self.positions_closed.load(Ordering::Relaxed)
    }

    pub fn ledger_warnings(&self) -> u64 {
        self.ledger_warnings.load(Ordering::Relaxed)
    }

    pub fn callback_errors(&self) -> u64 {
        self.callback_errors.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_market_data(&self) -> Option<f64> {
        self.inner
            .read()
            .last_market_data_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_error(&self) -> Option<f64> {
        self.inner
            .read()
            .last_error_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Ticks and bars per second since start.
    pub fn market_data_per_second(&self) -> f64 {
        let uptime = self.uptime_secs();
        if uptime > 0.0 {
            (self.ticks_received() + self.bars_received()) as f64 / uptime
        } else {
            0.0
        }
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks_received: self.ticks_received(),
            bars_received: self.bars_received(),
            events_dispatched: self.events_dispatched(),
            time_events_fired: self.time_events_fired(),
            orders_submitted: self.orders_submitted(),
            positions_closed: self.positions_closed(),
            ledger_warnings: self.ledger_warnings(),
            callback_errors: self.callback_errors(),
            uptime_secs: self.uptime_secs(),
            market_data_per_second: self.market_data_per_second(),
            secs_since_last_market_data: self.secs_since_last_market_data(),
            secs_since_last_error: self.secs_since_last_error(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub ticks_received: u64,
    pub bars_received: u64,
    pub events_dispatched: u64,
    pub time_events_fired: u64,
    pub orders_submitted: u64,
    pub positions_closed: u64,
    pub ledger_warnings: u64,
    pub callback_errors: u64,
    pub uptime_secs: f64,
    pub market_data_per_second: f64,
    pub secs_since_last_market_data: Option<f64>,
    pub secs_since_last_error: Option<f64>,
}

/// Health status of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Market data is flowing.
    Healthy,
    /// Market data is stale or callbacks are failing.
    Degraded,
    /// No market data for an extended period.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    /// Threshold in seconds for considering data stale (degraded).
    const STALE_THRESHOLD_SECS: f64 = 30.0;
    /// Threshold in seconds for considering the runtime unhealthy.
    const UNHEALTHY_THRESHOLD_SECS: f64 = 60.0;
    /// Recent errors within this window degrade an otherwise healthy status.
    const RECENT_ERROR_SECS: f64 = 10.0;

    /// Determine the health status based on metrics.
    pub fn health_status(&self) -> HealthStatus {
        let secs_since_data = match self.secs_since_last_market_data {
            Some(secs) => secs,
            None => {
                // Still starting up
                if self.uptime_secs < Self::STALE_THRESHOLD_SECS {
                    return HealthStatus::Healthy;
                } else if self.uptime_secs < Self::UNHEALTHY_THRESHOLD_SECS {
                    return HealthStatus::Degraded;
                } else {
                    return HealthStatus::Unhealthy;
                }
            }
        };

        if secs_since_data > Self::UNHEALTHY_THRESHOLD_SECS {
            HealthStatus::Unhealthy
        } else if secs_since_data > Self::STALE_THRESHOLD_SECS {
            HealthStatus::Degraded
        } else if self
            .secs_since_last_error
            .is_some_and(|secs| secs < Self::RECENT_ERROR_SECS)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Strategy Metrics ===")?;
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Ticks received:      {}", self.ticks_received)?;
        writeln!(f, "Bars received:       {}", self.bars_received)?;
        writeln!(f, "Market data/sec:     {:.2}", self.market_data_per_second)?;
        writeln!(f, "Events dispatched:   {}", self.events_dispatched)?;
        writeln!(f, "Time events fired:   {}", self.time_events_fired)?;
        writeln!(f, "Orders submitted:    {}", self.orders_submitted)?;
        writeln!(f, "Positions closed:    {}", self.positions_closed)?;
        writeln!(f, "Ledger warnings:     {}", self.ledger_warnings)?;
        writeln!(f, "Callback errors:     {}", self.callback_errors)?;
        if let Some(secs) = self.secs_since_last_market_data {
            writeln!(f, "Since last data:     {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_error {
            writeln!(f, "Since last error:    {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<RuntimeMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(RuntimeMetrics::new())
}
