//! Thin abstractions over `std` so services can be tested without touching
//! the process environment or waiting on the wall clock.
//!
//! | Concern | Trait(s) | Production | Test |
//! |---------|----------|------------|------|
//! | Env vars | [`ReadEnv`] | [`SystemEnv`] | `InMemoryEnv`* |
//! | Time | [`GetNow`], [`GetElapsed`] | [`SystemClock`] | `MockClock`* |
//!
//! *Available with `#[cfg(test)]` or the `"test-support"` feature.
//!
//! Every type here is `Send + Sync`; the test doubles are `Mutex`-backed so
//! they work under a multi-threaded `#[tokio::test]`.

pub mod env;
pub mod time;

pub use env::{ReadEnv, SystemEnv};
pub use time::{GetElapsed, GetNow, SystemClock};
