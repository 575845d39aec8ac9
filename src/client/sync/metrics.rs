//! # Sync Metrics
//!
//! Counters and timings for sync cycles. Skipped triggers are counted
//! separately and never enter the success rate.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetrics {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub last_duration: Option<Duration>,
    pub average_duration: Duration,
    last_start: Option<Instant>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&mut self) {
        self.last_start = Some(Instant::now());
        self.started += 1;
    }

    pub fn record_success(&mut self) {
        self.completed += 1;
        self.finish();
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
        self.finish();
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Completed cycles over finished cycles
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.completed as f64 / finished as f64
        }
    }

    fn finish(&mut self) {
        if let Some(start) = self.last_start.take() {
            let duration = start.elapsed();
            self.last_duration = Some(duration);

            // Rolling average over finished cycles
            let finished = (self.completed + self.failed) as u32;
            let total = self.average_duration * (finished - 1) + duration;
            self.average_duration = total / finished;
        }
    }
}
