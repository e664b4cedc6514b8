//! Rounds and their time-derived status.

use medvote_types::{CandidateId, Timestamp, VoteAmount};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::digest::OutcomeDigest;
use crate::error::RoundsError;

/// Where a round sits in its lifecycle.
///
/// `DoesNotExist -> Pending -> Active -> Ended -> Finalized`, strictly
/// forward. Everything but `Finalized` is derived from the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundStatus {
    DoesNotExist,
    /// Created, voting has not opened yet.
    Pending,
    /// Inside the `[active_at, ends_at)` window.
    Active,
    /// Past `ends_at`, waiting for finalization.
    Ended,
    Finalized,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoesNotExist => "DOES_NOT_EXIST",
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Ended => "ENDED",
            Self::Finalized => "FINALIZED",
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The permanent result of finalizing a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finalization {
    pub median_threshold: VoteAmount,
    pub finalized_at: Timestamp,
    /// Candidates eliminated by this round, in registration order.
    pub eliminated: Vec<CandidateId>,
    pub outcome_digest: OutcomeDigest,
}

/// A single time-boxed voting round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub index: u64,
    pub start_time: Timestamp,
    pub active_at: Timestamp,
    pub ends_at: Timestamp,
    /// Set exactly once; its presence is what makes the round finalized.
    finalization: Option<Finalization>,
}

impl Round {
    /// Open round `index` at `now`.
    ///
    /// `active_at = now + delay_secs`, `ends_at = active_at + duration_secs`.
    pub fn open(
        index: u64,
        now: Timestamp,
        delay_secs: u64,
        duration_secs: u64,
    ) -> Result<Self, RoundsError> {
        let active_at = now
            .checked_add_secs(delay_secs)
            .ok_or(RoundsError::WindowOverflow)?;
        let ends_at = active_at
            .checked_add_secs(duration_secs)
            .ok_or(RoundsError::WindowOverflow)?;
        Ok(Self {
            index,
            start_time: now,
            active_at,
            ends_at,
            finalization: None,
        })
    }

    pub fn status_at(&self, now: Timestamp) -> RoundStatus {
        if self.finalization.is_some() {
            RoundStatus::Finalized
        } else if now < self.active_at {
            RoundStatus::Pending
        } else if now < self.ends_at {
            RoundStatus::Active
        } else {
            RoundStatus::Ended
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalization.is_some()
    }

    pub fn median_threshold(&self) -> Option<VoteAmount> {
        self.finalization.as_ref().map(|f| f.median_threshold)
    }

    pub fn outcome_digest(&self) -> Option<OutcomeDigest> {
        self.finalization.as_ref().map(|f| f.outcome_digest)
    }

    pub fn finalization(&self) -> Option<&Finalization> {
        self.finalization.as_ref()
    }

    /// Caller must have checked the round is `Ended`.
    pub(crate) fn finalize(&mut self, finalization: Finalization) {
        debug_assert!(self.finalization.is_none(), "round finalized twice");
        self.finalization = Some(finalization);
    }
}
