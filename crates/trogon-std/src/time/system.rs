use std::time::Duration;

use super::{GetElapsed, GetNow};

/// Delegates to `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl GetNow for SystemClock {
    type Instant = std::time::Instant;

    #[inline]
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }
}

impl GetElapsed for SystemClock {
    #[inline]
    fn elapsed(&self, since: std::time::Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_elapsed_is_small() {
        let clock = SystemClock;
        let start = clock.now();
        assert!(clock.elapsed(start) < Duration::from_secs(1));
    }
}
