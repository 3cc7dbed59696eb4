//! Adaptive frame pacing.
//!
//! Inference is the expensive step, so frames are only submitted every
//! `interval`. The interval is re-derived from measured processing cost
//! every `adjust_window` processed frames:
//!
//! ```text
//! interval = clamp(mean_cost / headroom, 1000 / max_fps, 1000 / min_fps)
//! ```
//!
//! Slow machines settle near `min_fps`, fast ones near `max_fps`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::limit::ConfigError;

// ════════════════════════════════════════════════════════════════════════════
// SchedulerConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Initial sampling rate before any measurement.
    pub target_fps:    f64,
    pub min_fps:       f64,
    pub max_fps:       f64,
    /// Processed frames per re-evaluation.
    pub adjust_window: usize,
    /// Fraction of the frame budget processing may use (0, 1].
    pub headroom:      f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            target_fps:    15.0,
            min_fps:       5.0,
            max_fps:       24.0,
            adjust_window: 30,
            headroom:      0.8,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let range_ok = self.min_fps > 0.0
            && self.min_fps <= self.target_fps
            && self.target_fps <= self.max_fps;
        if !range_ok {
            return Err(ConfigError::FpsRange {
                min:    self.min_fps,
                target: self.target_fps,
                max:    self.max_fps,
            });
        }
        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return Err(ConfigError::Headroom(self.headroom));
        }
        if self.adjust_window == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        Ok(())
    }

    /// Shortest allowed interval, in milliseconds.
    pub fn min_interval_ms(&self) -> f64 { 1000.0 / self.max_fps }

    /// Longest allowed interval, in milliseconds.
    pub fn max_interval_ms(&self) -> f64 { 1000.0 / self.min_fps }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameScheduler
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct FrameScheduler {
    config:         SchedulerConfig,
    interval_ms:    f64,
    samples:        Vec<f64>,
    processed:      u64,
    last_processed: Option<Duration>,
}

impl FrameScheduler {
    /// Refuses a config that [`SchedulerConfig::validate`] rejects.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(FrameScheduler {
            interval_ms:    1000.0 / config.target_fps,
            samples:        Vec::with_capacity(config.adjust_window),
            processed:      0,
            last_processed: None,
            config,
        })
    }

    pub fn interval_ms(&self) -> f64 { self.interval_ms }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_ms / 1000.0)
    }

    /// Frames whose processing cost has been recorded.
    pub fn processed(&self) -> u64 { self.processed }

    /// Gate for the frame arriving at `now`.
    ///
    /// Returns false, leaving state untouched, if less than the current
    /// interval has passed since the last admitted frame. Otherwise stamps
    /// `now` as the last admitted frame and returns true.
    pub fn admit(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last_processed {
            let since_ms = now.saturating_sub(last).as_secs_f64() * 1000.0;
            if since_ms < self.interval_ms {
                return false;
            }
        }
        self.last_processed = Some(now);
        true
    }

    /// Record how long an admitted frame took, re-deriving the interval when
    /// the window fills.
    pub fn record(&mut self, cost: Duration) {
        self.samples.push(cost.as_secs_f64() * 1000.0);
        self.processed += 1;

        if self.processed % self.config.adjust_window as u64 == 0 {
            let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
            self.samples.clear();

            let previous = self.interval_ms;
            self.interval_ms = (mean / self.config.headroom)
                .clamp(self.config.min_interval_ms(), self.config.max_interval_ms());
            debug!(
                mean_ms = mean,
                from_ms = previous,
                to_ms = self.interval_ms,
                "frame interval adjusted"
            );
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
