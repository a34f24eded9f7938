//! Fixed-period tick scheduler for Matchloop.
//!
//! Every running session owns one [`TickScheduler`] per round. The
//! scheduler blocks the session task until the next tick boundary and
//! reports how much wall time actually passed since the previous tick, so
//! the game's `update` sees a real `dt` even when a tick fires late.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside a session task's
//! `tokio::select!` loop next to a cancellation token:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         _ = cancel.cancelled() => break,
//!         tick = scheduler.wait_for_tick() => {
//!             session.drain_events(..);
//!             session.drain_inputs();
//!             session.update(tick.elapsed);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires later than its scheduled boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickPolicy {
    /// Skip the missed tick(s) and resume from now.
    /// Safest default, prevents death spirals.
    #[default]
    Skip,
    /// Run up to `max_catchup` extra ticks immediately.
    CatchUp {
        /// Hard cap on consecutive catch-up ticks.
        max_catchup: u32,
    },
    /// Keep the original cadence; the next tick fires at its originally
    /// scheduled time.
    Drop,
}

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Tick period in milliseconds.
    pub interval_ms: u64,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Budget warning threshold (0.0–1.0). A tracing warning is emitted
    /// when tick execution exceeds this fraction of the interval.
    pub budget_warn_threshold: f64,
    /// Budget critical threshold (0.0–1.0).
    pub budget_critical_threshold: f64,
    /// Enable per-tick metrics collection.
    pub metrics_enabled: bool,
    /// Random jitter (0–max µs) added to the *first* tick so sessions
    /// launched at the same instant don't tick in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// Shortest accepted tick period.
    pub const MIN_INTERVAL_MS: u64 = 1;

    /// Longest accepted tick period.
    pub const MAX_INTERVAL_MS: u64 = 60_000;

    /// Create a config for a specific period with default settings.
    pub fn with_interval_ms(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ..Default::default()
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. Rules:
    /// - `interval_ms` clamped to
    ///   [`MIN_INTERVAL_MS`](Self::MIN_INTERVAL_MS)..=[`MAX_INTERVAL_MS`](Self::MAX_INTERVAL_MS).
    /// - Thresholds clamped to `0.0..=1.0`.
    /// - `budget_warn_threshold` forced ≤ `budget_critical_threshold`.
    pub fn validated(mut self) -> Self {
        let clamped = self
            .interval_ms
            .clamp(Self::MIN_INTERVAL_MS, Self::MAX_INTERVAL_MS);
        if clamped != self.interval_ms {
            warn!(
                requested_ms = self.interval_ms,
                clamped_ms = clamped,
                "tick interval out of range, clamping"
            );
            self.interval_ms = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }

    /// Duration of a single tick.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1 for each scheduler).
    pub tick: u64,
    /// The configured period.
    pub interval: Duration,
    /// Wall time since the previous tick, or since the scheduler was
    /// created for the first tick. This is the `dt` handed to game logic.
    pub elapsed: Duration,
    /// `true` if this tick fired late (more than 10% of the interval).
    pub overrun: bool,
    /// How many ticks were skipped due to overrun (0 in normal operation).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the tick scheduler.
///
/// All timing values refer to the work done between
/// [`TickScheduler::wait_for_tick`] and [`TickScheduler::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Total overruns detected.
    pub total_overruns: u64,
    /// Total ticks skipped (from Skip/CatchUp policies).
    pub total_skipped: u64,
    /// Exponential moving average of tick execution time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Maximum tick execution time observed.
    pub max_tick_time: Duration,
    /// Most recent budget utilization (0.0–∞). >1.0 means overrun.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler.
///
/// Drives one round of a single session's loop. A fresh scheduler is built
/// every time a session (re)starts, so tick numbering and `elapsed` are
/// measured from the moment the round began.
pub struct TickScheduler {
    config: TickConfig,
    interval: Duration,
    tick_count: u64,
    /// When the next tick should fire (Tokio instant for `sleep_until`).
    next_tick: TokioInstant,
    /// When the previous tick fired (or the scheduler was created).
    last_tick: TokioInstant,
    /// Wall-clock instant when the current tick's work started.
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    ///
    /// The first tick is scheduled one interval from now, plus optional
    /// jitter.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let interval = config.interval();

        let jitter = if config.initial_jitter_us > 0 {
            let us = rand::rng().random_range(0..config.initial_jitter_us);
            Duration::from_micros(us)
        } else {
            Duration::ZERO
        };
        let now = TokioInstant::now();

        debug!(
            interval_ms = config.interval_ms,
            policy = ?config.policy,
            jitter_us = jitter.as_micros() as u64,
            "tick scheduler created"
        );

        Self {
            config,
            interval,
            tick_count: 0,
            next_tick: now + interval + jitter,
            last_tick: now,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler for a specific period with default settings.
    pub fn with_interval_ms(interval_ms: u64) -> Self {
        Self::new(TickConfig::with_interval_ms(interval_ms))
    }

    /// Wait until the next tick is due. Returns [`TickInfo`] for the tick.
    ///
    /// This is the only place a session task suspends. The future is
    /// cancel-safe: dropping it inside `tokio::select!` leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let tick_dur = self.interval;

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        // Detect overrun: did we wake up significantly late?
        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > tick_dur / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = late_by.as_nanos() as u64 / tick_dur.as_nanos() as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                // Always schedule from now, not from the missed deadline.
                now + tick_dur
            }
            TickPolicy::CatchUp { max_catchup } => {
                if overrun {
                    let behind = late_by.as_nanos() as u64 / tick_dur.as_nanos() as u64;
                    ticks_skipped = behind.saturating_sub(max_catchup as u64);
                    if behind > 0 {
                        warn!(
                            tick = self.tick_count,
                            behind,
                            catching_up = behind.min(max_catchup as u64),
                            skipping = ticks_skipped,
                            "tick overrun, catch-up capped at {max_catchup}"
                        );
                    }
                    if behind <= max_catchup as u64 {
                        next + tick_dur
                    } else {
                        now + tick_dur
                    }
                } else {
                    next + tick_dur
                }
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, keeping original cadence"
                    );
                }
                next + tick_dur
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            interval: tick_dur,
            elapsed,
            overrun,
            ticks_skipped,
        }
    }

    /// Record that the work for the current tick has finished.
    ///
    /// Call this after the session's `update` returns to enable budget
    /// monitoring and metrics. A call without a preceding
    /// `wait_for_tick` is ignored.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let budget = self.interval;

        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "CRITICAL: tick exceeded budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            // Exponential moving average (α = 0.1).
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The fixed tick period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The configuration in effect (after validation).
    pub fn config(&self) -> &TickConfig {
        &self.config
    }
}
