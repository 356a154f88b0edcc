//! Time provider abstraction so scan timing can be tested deterministically

#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

/// Source of monotonic and wall-clock time
pub trait TimeProvider: Send + Sync {
    /// Current monotonic time, for measuring intervals
    fn now(&self) -> Instant;

    /// Current wall-clock time, for timestamps
    fn system_time(&self) -> SystemTime;
}

/// Production time provider using the system clocks
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Seconds in `duration` rounded to two decimal places
pub fn round_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

/// Time provider whose clock only moves when told to
#[derive(Clone)]
#[cfg(test)]
pub struct MockTimeProvider {
    current_instant: Arc<Mutex<Instant>>,
    current_system_time: Arc<Mutex<SystemTime>>,
}

#[cfg(test)]
impl MockTimeProvider {
    pub fn new() -> Self {
        Self {
            current_instant: Arc::new(Mutex::new(Instant::now())),
            current_system_time: Arc::new(Mutex::new(SystemTime::now())),
        }
    }

    /// Advance both clocks by `duration`
    pub fn advance_time(&self, duration: Duration) {
        *self.current_instant.lock().unwrap() += duration;
        *self.current_system_time.lock().unwrap() += duration;
    }

    pub fn set_system_time(&self, system_time: SystemTime) {
        *self.current_system_time.lock().unwrap() = system_time;
    }
}

#[cfg(test)]
impl TimeProvider for MockTimeProvider {
    fn now(&self) -> Instant {
        *self.current_instant.lock().unwrap()
    }

    fn system_time(&self) -> SystemTime {
        *self.current_system_time.lock().unwrap()
    }
}
