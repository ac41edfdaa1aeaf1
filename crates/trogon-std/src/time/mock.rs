use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{GetElapsed, GetNow};

/// Clones share the same timeline.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    current: Arc<Mutex<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) += duration;
    }

    fn current(&self) -> Duration {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A `Duration` offset from an arbitrary epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(pub Duration);

impl GetNow for MockClock {
    type Instant = MockInstant;

    fn now(&self) -> MockInstant {
        MockInstant(self.current())
    }
}

impl GetElapsed for MockClock {
    fn elapsed(&self, since: MockInstant) -> Duration {
        self.current().saturating_sub(since.0)
    }
}
