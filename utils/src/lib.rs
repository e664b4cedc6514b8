//! Shared utilities for the medvote workspace.

pub mod logging;
pub mod time;

pub use logging::{init_tracing, LogFormat};
pub use time::{describe_window, format_duration};
