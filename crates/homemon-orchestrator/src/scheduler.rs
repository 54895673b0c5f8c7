use std::time::Duration;

use async_trait::async_trait;
use homemon_types::{config::interval_from_minutes, Result};
use tokio::time::sleep;
use tracing::debug;

/// Work driven by the [`Scheduler`], one tick at a time.
#[async_trait]
pub trait PeriodicTask: Send {
    async fn tick(&mut self, index: u64);
}

/// Fixed-interval loop: run, sleep, run again. No drift correction and no
/// catch-up; the sleep only starts once the previous tick has returned.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
        }
    }

    pub fn from_minutes(minutes: f64) -> Result<Self> {
        interval_from_minutes(minutes).map(Self::new)
    }

    /// Stop after `cycles` ticks instead of looping forever.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the number of ticks executed; only returns at all when bounded.
    pub async fn run<T: PeriodicTask + ?Sized>(&self, task: &mut T) -> u64 {
        let mut index = 0;
        loop {
            task.tick(index).await;
            index += 1;
            if self.max_cycles.is_some_and(|max| index >= max) {
                return index;
            }
            debug!("Sleeping {:?} before cycle {}", self.interval, index);
            sleep(self.interval).await;
        }
    }
}
