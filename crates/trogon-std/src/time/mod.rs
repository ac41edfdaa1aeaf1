//! Monotonic time sources.
//!
//! Production code uses [`SystemClock`]; tests drive a `MockClock` whose
//! time only moves when told to, so expiry boundaries are deterministic.

mod system;

#[cfg(any(test, feature = "test-support"))]
mod mock;

use std::time::Duration;

pub use system::SystemClock;

#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockClock, MockInstant};

/// Uses an associated type so each implementation can define its own
/// instant representation.
pub trait GetNow {
    type Instant: Copy + Send + Sync;

    fn now(&self) -> Self::Instant;
}

pub trait GetElapsed: GetNow {
    fn elapsed(&self, since: Self::Instant) -> Duration;
}
