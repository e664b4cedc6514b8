//! Multi-round median-elimination voting.
//!
//! Candidates register once, before the first round. Each round opens after
//! a delay, accepts weighted votes during its active window, and is then
//! finalized: a threshold (supplied, or the lower median of the round's
//! votes) decides which candidates are eliminated from that round onward.
//!
//! ## Module overview
//!
//! - [`manager`]: round creation, time-derived status and finalization.
//! - [`registry`]: candidate registration and carry-forward status.
//! - [`ledger`]: append-only per-round vote records and totals.
//! - [`median`]: lower-median threshold and the elimination rule.
//! - [`events`]: notifications published after every committed change.
//! - [`digest`]: Blake2b chain over all round outcomes.
//! - [`config`]: one-time configuration, loadable from TOML.
//! - [`snapshot`]: bincode snapshots of the whole state.

pub mod config;
pub mod digest;
pub mod error;
pub mod events;
pub mod ledger;
pub mod manager;
pub mod median;
pub mod registry;
pub mod round;
pub mod snapshot;

pub use config::RoundsConfig;
pub use digest::OutcomeDigest;
pub use error::RoundsError;
pub use events::{EventBus, RoundEvent};
pub use ledger::{VoteLedger, VoteRecord};
pub use manager::{RoundManager, RoundOutcome, Standing};
pub use median::{EliminationDirection, MedianEngine, MedianInput, ThresholdSource};
pub use registry::{CandidateEntry, CandidateRegistry, CandidateStatus};
pub use round::{Finalization, Round, RoundStatus};
pub use snapshot::RoundsSnapshot;
