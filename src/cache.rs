use embassy_time::{Duration, Instant};

/// Validity flag plus timestamp of a cached value
#[derive(Clone, Copy, Debug)]
pub(crate) struct Freshness {
    valid: bool,
    at: Instant,
}

impl Freshness {
    pub(crate) const fn new() -> Self {
        Self { valid: false, at: Instant::from_ticks(0) }
    }

    /// A value that was never fetched, or is older than `max_age`, has to come from the sensor
    pub(crate) fn needs_refresh(&self, now: Instant, max_age: Duration) -> bool {
        !self.valid || now > self.at + max_age
    }

    pub(crate) fn mark(&mut self, now: Instant) {
        self.valid = true;
        self.at = now;
    }
}
