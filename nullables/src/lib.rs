//! Nullable infrastructure for deterministic testing.
//!
//! The only non-deterministic input to the round state machine is the
//! current time. [`NullClock`] replaces the system clock in tests and in
//! scripted replays so that time moves exactly when told to.

pub mod clock;

pub use clock::NullClock;
