//! Median threshold computation and the elimination rule.
//!
//! The median is the lower median: for `n` amounts sorted ascending, the
//! element at index `(n - 1) / 2`. No averaging ever happens, so the
//! threshold is always one of the submitted amounts.

use medvote_types::{CandidateId, VoteAmount};
use serde::{Deserialize, Serialize};

use crate::error::RoundsError;
use crate::registry::CandidateRegistry;

/// Which side of the threshold loses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationDirection {
    /// Eliminate totals strictly below the threshold. A total equal to the
    /// threshold survives.
    #[default]
    EliminateBottom,
    /// Eliminate totals at or above the threshold. A total equal to the
    /// threshold is eliminated.
    EliminateTop,
}

impl EliminationDirection {
    pub fn from_eliminate_top(eliminate_top: bool) -> Self {
        if eliminate_top {
            Self::EliminateTop
        } else {
            Self::EliminateBottom
        }
    }

    pub fn eliminate_top(&self) -> bool {
        matches!(self, Self::EliminateTop)
    }

    pub fn is_eliminated(&self, total: VoteAmount, threshold: VoteAmount) -> bool {
        match self {
            Self::EliminateTop => total >= threshold,
            Self::EliminateBottom => total < threshold,
        }
    }
}

/// The amounts a computed threshold is taken over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedianInput {
    /// Every recorded vote entry of the round, one amount per entry.
    #[default]
    VoteEntries,
    /// One accumulated total per candidate still eligible in the round.
    CandidateTotals,
}

/// Where the finalization threshold comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdSource {
    /// Use this value as-is. Works for rounds without any votes.
    Supplied(VoteAmount),
    /// Take the lower median of the round's amounts.
    ComputedFromVotes,
}

/// Stateless median and elimination logic.
pub struct MedianEngine;

impl MedianEngine {
    /// Lower median of `amounts`. Input order does not matter.
    pub fn compute_median(amounts: &[VoteAmount]) -> Result<VoteAmount, RoundsError> {
        if amounts.is_empty() {
            return Err(RoundsError::EmptyRound);
        }
        let mut sorted = amounts.to_vec();
        let mid = (sorted.len() - 1) / 2;
        let (_, median, _) = sorted.select_nth_unstable(mid);
        Ok(*median)
    }

    pub fn resolve_threshold(
        source: ThresholdSource,
        amounts: &[VoteAmount],
    ) -> Result<VoteAmount, RoundsError> {
        match source {
            ThresholdSource::Supplied(value) => Ok(value),
            ThresholdSource::ComputedFromVotes => Self::compute_median(amounts),
        }
    }

    /// Candidates from `candidate_totals` that the rule eliminates, in input order.
    pub fn select_eliminated(
        candidate_totals: &[(CandidateId, VoteAmount)],
        threshold: VoteAmount,
        direction: EliminationDirection,
    ) -> Vec<CandidateId> {
        candidate_totals
            .iter()
            .filter(|(_, total)| direction.is_eliminated(*total, threshold))
            .map(|(candidate, _)| *candidate)
            .collect()
    }

    /// Eliminate, from `round` onward, every candidate the rule selects.
    ///
    /// Returns the candidates that actually transitioned; those already
    /// eliminated are skipped.
    pub fn apply_elimination(
        registry: &mut CandidateRegistry,
        round: u64,
        candidate_totals: &[(CandidateId, VoteAmount)],
        threshold: VoteAmount,
        direction: EliminationDirection,
    ) -> Vec<CandidateId> {
        Self::select_eliminated(candidate_totals, threshold, direction)
            .into_iter()
            .filter(|candidate| registry.eliminate(candidate, round))
            .collect()
    }
}
