use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};

/// Source of host-local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Deterministic clock: every read returns the current instant and then
/// advances by `step`.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<NaiveDateTime>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    pub fn fixed(at: NaiveDateTime) -> Self {
        Self::new(at, Duration::zero())
    }

    pub fn peek(&self) -> NaiveDateTime {
        self.current.lock().map(|t| *t).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        match self.current.lock() {
            Ok(mut guard) => {
                let now = *guard;
                *guard = now + self.step;
                now
            }
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
