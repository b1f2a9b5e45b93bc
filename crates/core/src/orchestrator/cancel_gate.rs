use std::time::{Duration, Instant};

/// Rate limiter for cancellation checks made from progress ticks.
///
/// The first call always passes; later calls pass once `interval` has elapsed
/// since the last passing call.
#[derive(Debug, Clone)]
pub struct CancelGate {
    interval: Duration,
    last_check: Option<Instant>,
}

impl CancelGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_check: None,
        }
    }

    pub fn should_check(&mut self, now: Instant) -> bool {
        let due = match self.last_check {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last_check = Some(now);
        }
        due
    }
}
