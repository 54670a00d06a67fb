//! One-shot alerts and repeating timers.
//!
//! Both live in a single min-heap ordered by fire time. At equal fire time
//! alerts go before timers, alerts by priority (lower first), then by the
//! order they were scheduled. Repeating timers are re-armed at
//! `previous fire time + interval` when popped, so they never drift.
//!
//! The scheduler does not own a task. Whoever drives the strategy sleeps
//! until [`AlertScheduler::next_deadline`] and then drains
//! [`AlertScheduler::pop_due`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ensure_label, StrategyError};
use crate::event::TimeEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EntryKind {
    Alert,
    Timer,
}

#[derive(Debug, Clone)]
struct Entry {
    fire_time_ms: i64,
    kind: EntryKind,
    priority: i32,
    seq: u64,
    label: String,
    /// Set for repeating timers.
    interval: Option<Duration>,
}

impl Entry {
    fn key(&self) -> (i64, EntryKind, i32, u64) {
        // Timers are not ordered by priority among themselves.
        let priority = match self.kind {
            EntryKind::Alert => self.priority,
            EntryKind::Timer => 0,
        };
        (self.fire_time_ms, self.kind, priority, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest first)
        other.key().cmp(&self.key())
    }
}

/// Alert and timer queue for one strategy.
#[derive(Debug)]
pub struct AlertScheduler {
    queue: BinaryHeap<Entry>,
    seq: u64,
    /// Wall-clock millis matching `anchor`.
    anchor_ms: i64,
    anchor: Instant,
}

impl Default for AlertScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertScheduler {
    /// Anchor wall-clock time to the current monotonic instant.
    pub fn new() -> Self {
        Self::with_anchor(model::unix_millis(), Instant::now())
    }

    /// Use an explicit wall-clock/monotonic pair.
    pub fn with_anchor(anchor_ms: i64, anchor: Instant) -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
            anchor_ms,
            anchor,
        }
    }

    /// Current wall-clock millis as seen by the scheduler clock.
    pub fn now_ms(&self) -> i64 {
        self.to_ms(Instant::now())
    }

    fn to_ms(&self, instant: Instant) -> i64 {
        let elapsed = instant.saturating_duration_since(self.anchor);
        self.anchor_ms + duration_ms(elapsed)
    }

    fn deadline(&self, fire_time_ms: i64) -> Instant {
        let offset = (fire_time_ms - self.anchor_ms).max(0);
        self.anchor + Duration::from_millis(offset as u64)
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn validate(
        &self,
        label: &str,
        time_ms: i64,
        priority: i32,
        now_ms: i64,
    ) -> Result<(), StrategyError> {
        ensure_label(label, "label")?;
        if time_ms <= now_ms {
            return Err(StrategyError::AlertNotInFuture {
                label: label.to_string(),
                time_ms,
                now_ms,
            });
        }
        if priority < 0 {
            return Err(StrategyError::NegativePriority(priority));
        }
        Ok(())
    }

    /// Schedule a one-shot alert at `fire_time_ms`.
    pub fn set_time_alert(
        &mut self,
        label: &str,
        fire_time_ms: i64,
        priority: i32,
    ) -> Result<(), StrategyError> {
        self.validate(label, fire_time_ms, priority, self.now_ms())?;
        self.push_alert(label, fire_time_ms, priority);
        Ok(())
    }

    fn push_alert(&mut self, label: &str, fire_time_ms: i64, priority: i32) {
        let seq = self.next_seq();
        debug!(label, fire_time_ms, priority, "alert scheduled");
        self.queue.push(Entry {
            fire_time_ms,
            kind: EntryKind::Alert,
            priority,
            seq,
            label: label.to_string(),
            interval: None,
        });
    }

    /// Schedule a timer first firing at `start_time_ms + interval`.
    ///
    /// With `repeat` the timer keeps firing every `interval` until cancelled;
    /// without it this is a one-shot alert with the given priority.
    pub fn set_timer(
        &mut self,
        label: &str,
        start_time_ms: i64,
        interval: Duration,
        priority: i32,
        repeat: bool,
    ) -> Result<(), StrategyError> {
        self.validate(label, start_time_ms, priority, self.now_ms())?;
        let interval_ms = duration_ms(interval);
        if interval_ms == 0 {
            return Err(StrategyError::InvalidInterval(label.to_string()));
        }

        let Some(fire_time_ms) = start_time_ms.checked_add(interval_ms) else {
            return Err(StrategyError::InvalidInterval(label.to_string()));
        };
        if !repeat {
            self.push_alert(label, fire_time_ms, priority);
            return Ok(());
        }

        let seq = self.next_seq();
        debug!(label, fire_time_ms, interval_ms, "repeating timer scheduled");
        self.queue.push(Entry {
            fire_time_ms,
            kind: EntryKind::Timer,
            priority,
            seq,
            label: label.to_string(),
            interval: Some(interval),
        });
        Ok(())
    }

    /// Pop the next entry due at `now`.
    ///
    /// A repeating timer is pushed back one interval later when `rearm` is
    /// set and dropped otherwise.
    pub fn pop_due(&mut self, now: Instant, rearm: bool) -> Option<TimeEvent> {
        let due = self
            .queue
            .peek()
            .is_some_and(|next| self.deadline(next.fire_time_ms) <= now);
        if !due {
            return None;
        }

        let mut entry = self.queue.pop()?;
        let event = TimeEvent::new(entry.label.clone(), entry.fire_time_ms);

        if let Some(interval) = entry.interval {
            if !rearm {
                debug!(label = %entry.label, "repeating timer not re-armed");
            } else if let Some(next_ms) = entry.fire_time_ms.checked_add(duration_ms(interval)) {
                entry.fire_time_ms = next_ms;
                entry.seq = self.next_seq();
                self.queue.push(entry);
            } else {
                warn!(label = %entry.label, "repeating timer ran past the end of time, dropped");
            }
        }

        Some(event)
    }

    /// Instant the earliest entry becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue
            .peek()
            .map(|next| self.deadline(next.fire_time_ms))
    }

    /// Remove every alert and timer with `label`.
    pub fn cancel(&mut self, label: &str) -> bool {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.label != label);
        before != self.queue.len()
    }

    /// Remove every repeating timer, returning how many were removed.
    pub fn cancel_repeating(&mut self) -> usize {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.kind != EntryKind::Timer);
        before - self.queue.len()
    }

    /// Marker for [`cancel_since`](Self::cancel_since).
    pub fn mark(&self) -> u64 {
        self.seq
    }

    /// Remove every entry scheduled after `mark` was taken.
    pub fn cancel_since(&mut self, mark: u64) -> usize {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.seq <= mark);
        before - self.queue.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.queue.iter().any(|entry| entry.label == label)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn scheduler() -> (AlertScheduler, Instant) {
        let now = Instant::now();
        (AlertScheduler::with_anchor(T0, now), now)
    }

    fn drain(scheduler: &mut AlertScheduler, now: Instant, rearm: bool) -> Vec<TimeEvent> {
        std::iter::from_fn(|| scheduler.pop_due(now, rearm)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_alert_rejected() {
        let (mut scheduler, _) = scheduler();
        let now_ms = scheduler.now_ms();

        assert!(matches!(
            scheduler.set_time_alert("late", now_ms, 0),
            Err(StrategyError::AlertNotInFuture { .. })
        ));
        assert!(matches!(
            scheduler.set_time_alert("late", now_ms - 1_000, 0),
            Err(StrategyError::AlertNotInFuture { .. })
        ));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_arguments_rejected() {
        let (mut scheduler, _) = scheduler();

        assert!(matches!(
            scheduler.set_time_alert("a", T0 + 10, -1),
            Err(StrategyError::NegativePriority(-1))
        ));
        assert!(matches!(
            scheduler.set_time_alert(" ", T0 + 10, 0),
            Err(StrategyError::InvalidLabel { .. })
        ));
        assert!(matches!(
            scheduler.set_timer("t", T0 + 10, Duration::ZERO, 0, true),
            Err(StrategyError::InvalidInterval(_))
        ));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_alert_fires_once() {
        let (mut scheduler, start) = scheduler();
        scheduler.set_time_alert("wake", T0 + 500, 1).unwrap();

        assert!(scheduler.pop_due(start, true).is_none());
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(500))
        );

        let fired = drain(&mut scheduler, start + Duration::from_millis(500), true);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].label, "wake");
        assert_eq!(fired[0].fire_time_ms, T0 + 500);

        assert!(drain(&mut scheduler, start + Duration::from_secs(60), true).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_alerts_by_priority_then_insertion() {
        let (mut scheduler, start) = scheduler();
        scheduler.set_time_alert("p2", T0 + 100, 2).unwrap();
        scheduler.set_time_alert("p0-first", T0 + 100, 0).unwrap();
        scheduler.set_time_alert("p0-second", T0 + 100, 0).unwrap();
        scheduler.set_time_alert("early", T0 + 50, 9).unwrap();
        scheduler
            .set_timer("timer", T0 + 50, Duration::from_millis(50), 0, true)
            .unwrap();

        let labels: Vec<String> = drain(&mut scheduler, start + Duration::from_millis(100), false)
            .into_iter()
            .map(|e| e.label)
            .collect();

        assert_eq!(labels, vec!["early", "p0-first", "p0-second", "p2", "timer"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_timer_rearms_from_fire_time() {
        let (mut scheduler, start) = scheduler();
        scheduler
            .set_timer("beat", T0 + 1, Duration::from_millis(100), 0, true)
            .unwrap();

        // Drive late: both fires up to 250ms are caught up in order.
        let fired = drain(&mut scheduler, start + Duration::from_millis(250), true);
        let times: Vec<i64> = fired.iter().map(|e| e.fire_time_ms).collect();
        assert_eq!(times, vec![T0 + 101, T0 + 201]);
        assert_ne!(fired[0].event_id, fired[1].event_id);

        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(301))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_dropped_without_rearm() {
        let (mut scheduler, start) = scheduler();
        scheduler
            .set_timer("beat", T0 + 1, Duration::from_millis(10), 0, true)
            .unwrap();

        let fired = drain(&mut scheduler, start + Duration::from_millis(11), false);
        assert_eq!(fired.len(), 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_repeating_timer_is_an_alert() {
        let (mut scheduler, start) = scheduler();
        scheduler
            .set_timer("once", T0 + 10, Duration::from_millis(20), 3, false)
            .unwrap();

        let fired = drain(&mut scheduler, start + Duration::from_secs(1), true);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].fire_time_ms, T0 + 30);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let (mut scheduler, _) = scheduler();
        scheduler.set_time_alert("a", T0 + 10, 0).unwrap();
        scheduler
            .set_timer("t1", T0 + 1, Duration::from_millis(10), 0, true)
            .unwrap();
        scheduler
            .set_timer("t2", T0 + 1, Duration::from_millis(10), 0, true)
            .unwrap();

        assert!(scheduler.cancel("t1"));
        assert!(!scheduler.cancel("t1"));
        assert_eq!(scheduler.cancel_repeating(), 1);
        assert!(scheduler.contains("a"));
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_rejected_without_overflow() {
        let (mut scheduler, _) = scheduler();

        assert!(matches!(
            scheduler.set_timer("t", T0 + 1, Duration::MAX, 0, true),
            Err(StrategyError::InvalidInterval(_))
        ));
        assert!(matches!(
            scheduler.set_timer("t", T0 + 1, Duration::MAX, 0, false),
            Err(StrategyError::InvalidInterval(_))
        ));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_dropped_when_next_fire_overflows() {
        let (mut scheduler, start) = scheduler();
        // First fire lands at i64::MAX - 1; the next one cannot be represented.
        let interval = Duration::from_millis((i64::MAX - 1 - (T0 + 1)) as u64);
        scheduler.set_timer("edge", T0 + 1, interval, 0, true).unwrap();

        let fired = drain(&mut scheduler, start + Duration::from_millis(u64::MAX / 2), true);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].fire_time_ms, i64::MAX - 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_since_mark() {
        let (mut scheduler, _) = scheduler();
        scheduler.set_time_alert("kept", T0 + 10, 0).unwrap();
        let mark = scheduler.mark();
        scheduler.set_time_alert("added", T0 + 20, 0).unwrap();
        scheduler
            .set_timer("beat", T0 + 1, Duration::from_millis(10), 0, true)
            .unwrap();

        assert_eq!(scheduler.cancel_since(mark), 2);
        assert!(scheduler.contains("kept"));
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_ms_follows_paused_clock() {
        let (scheduler, _) = scheduler();
        assert_eq!(scheduler.now_ms(), T0);

        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(scheduler.now_ms(), T0 + 1_500);
    }
}
