use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Debounce helper to prevent rapid repeated triggers
#[derive(Debug, Clone)]
pub struct Debouncer {
    last_trigger: Option<Instant>,
    debounce_duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with specified duration in milliseconds
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            last_trigger: None,
            debounce_duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Check if enough time has passed since last trigger
    /// Returns true if we should trigger, false if still in debounce period
    pub fn should_trigger(&mut self) -> bool {
        self.should_trigger_at(Instant::now())
    }

    /// Same as [`should_trigger`](Self::should_trigger) with an explicit clock.
    pub fn should_trigger_at(&mut self, now: Instant) -> bool {
        match self.last_trigger {
            None => {
                self.last_trigger = Some(now);
                true
            }
            Some(last) => {
                if now.saturating_duration_since(last) >= self.debounce_duration {
                    self.last_trigger = Some(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Reset the debouncer
    pub fn reset(&mut self) {
        self.last_trigger = None;
    }

    pub fn duration(&self) -> Duration {
        self.debounce_duration
    }
}

/// Timing measurements for a single resolved throw
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionTiming {
    pub scan_ms: f64,
    pub cycle_ms: f64,
    pub total_ms: f64,
}

/// Throws kept for the latency report
pub const RESOLUTION_WINDOW: usize = 500;

/// Statistics collector for throw-resolution latency over the last
/// [`RESOLUTION_WINDOW`] throws
#[derive(Debug, Default)]
pub struct ResolutionStats {
    timings: VecDeque<ResolutionTiming>,
}

impl ResolutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, timing: ResolutionTiming) {
        if self.timings.len() == RESOLUTION_WINDOW {
            self.timings.pop_front();
        }
        self.timings.push_back(timing);
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx]
    }

    /// (mean, p50, p95, p99) for one stage
    pub fn stage_stats(&self, extract: impl Fn(&ResolutionTiming) -> f64) -> (f64, f64, f64, f64) {
        if self.timings.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut values: Vec<f64> = self.timings.iter().map(&extract).collect();
        values.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let p50 = Self::percentile(&values, 50.0);
        let p95 = Self::percentile(&values, 95.0);
        let p99 = Self::percentile(&values, 99.0);

        (mean, p50, p95, p99)
    }

    /// Log a report of per-stage latency
    pub fn log_report(&self) {
        if self.timings.is_empty() {
            tracing::info!(target: "five_pin_lane::machine", "No throws resolved");
            return;
        }

        tracing::info!(target: "five_pin_lane::machine", "Throw resolution over {} throws:", self.timings.len());
        Self::log_row("Scan", self.stage_stats(|t| t.scan_ms));
        Self::log_row("Machine cycle", self.stage_stats(|t| t.cycle_ms));
        Self::log_row("Total", self.stage_stats(|t| t.total_ms));
    }

    fn log_row(name: &str, stats: (f64, f64, f64, f64)) {
        tracing::info!(
            target: "five_pin_lane::machine",
            "  {:<13} mean {:>7.1} ms  p50 {:>7.1} ms  p95 {:>7.1} ms  p99 {:>7.1} ms",
            name,
            stats.0,
            stats.1,
            stats.2,
            stats.3
        );
    }
}

/// Wall-clock seconds since the Unix epoch, as sent on the sensor stream.
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
