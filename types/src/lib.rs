//! Fundamental types for median-elimination voting rounds.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! candidate identities, vote amounts, timestamps and the clock abstraction.

pub mod address;
pub mod amount;
pub mod error;
pub mod time;

pub use address::CandidateId;
pub use amount::VoteAmount;
pub use error::TypesError;
pub use time::{Clock, SystemClock, Timestamp};
