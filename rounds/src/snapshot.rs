//! Whole-state snapshots, encoded with bincode.
//!
//! A snapshot carries the full history: configuration, candidates with
//! their elimination points, every round and every vote record. Restoring
//! it yields a manager that answers every query identically.

use medvote_types::Clock;
use serde::{Deserialize, Serialize};

use crate::config::RoundsConfig;
use crate::digest::OutcomeDigest;
use crate::error::RoundsError;
use crate::ledger::{VoteLedger, VoteRecord};
use crate::manager::RoundManager;
use crate::registry::{CandidateEntry, CandidateRegistry};
use crate::round::Round;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundsSnapshot {
    pub config: Option<RoundsConfig>,
    pub registration_closed: bool,
    pub candidates: Vec<CandidateEntry>,
    pub rounds: Vec<Round>,
    pub votes: Vec<VoteRecord>,
}

impl RoundsSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RoundsError> {
        bincode::serialize(self).map_err(|e| RoundsError::Snapshot(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RoundsError> {
        bincode::deserialize(bytes).map_err(|e| RoundsError::Snapshot(e.to_string()))
    }
}

impl<C: Clock> RoundManager<C> {
    pub fn snapshot(&self) -> RoundsSnapshot {
        RoundsSnapshot {
            config: self.config.clone(),
            registration_closed: self.registry.is_closed(),
            candidates: self.registry.entries().to_vec(),
            rounds: self.rounds.clone(),
            votes: self.ledger.all_records().cloned().collect(),
        }
    }

    /// Rebuild a manager from `snapshot`. The event log starts empty.
    ///
    /// The snapshot must describe a state the manager could have reached:
    /// see [`RoundsSnapshot::check`].
    pub fn restore(snapshot: RoundsSnapshot, clock: C) -> Result<Self, RoundsError> {
        snapshot.check()?;
        let registry =
            CandidateRegistry::from_entries(snapshot.candidates, snapshot.registration_closed)?;

        let mut ledger = VoteLedger::new();
        for record in &snapshot.votes {
            ledger.record_ballot(
                record.round,
                record.voter,
                &[(record.candidate, record.amount)],
            )?;
        }
        for round in snapshot.rounds.iter().filter(|r| r.is_finalized()) {
            ledger.freeze(round.index);
        }

        Ok(Self::from_parts(
            clock,
            snapshot.config,
            registry,
            ledger,
            snapshot.rounds,
        ))
    }
}

fn inconsistent(message: String) -> RoundsError {
    RoundsError::Snapshot(message)
}

impl RoundsSnapshot {
    /// Reject snapshots that no sequence of manager calls could produce.
    ///
    /// Checks the configuration, registration closing, round indices and
    /// windows, the finalize-before-next guard, the round limit, the
    /// elimination points and the outcome digest chain.
    pub fn check(&self) -> Result<(), RoundsError> {
        let Some(config) = &self.config else {
            if self.candidates.is_empty() && self.rounds.is_empty() && self.votes.is_empty() {
                return Ok(());
            }
            return Err(inconsistent("state present without a configuration".into()));
        };
        config.validate()?;

        if !self.rounds.is_empty() && !self.registration_closed {
            return Err(inconsistent("registration open after a round started".into()));
        }
        if let Some(max) = config.max_rounds {
            if self.rounds.len() as u64 > max {
                return Err(inconsistent(format!(
                    "{} rounds exceed the limit of {max}",
                    self.rounds.len()
                )));
            }
        }

        let mut previous_digest = OutcomeDigest::GENESIS;
        for (position, round) in self.rounds.iter().enumerate() {
            if round.index != position as u64 {
                return Err(inconsistent(format!(
                    "round at position {position} has index {}",
                    round.index
                )));
            }
            let expected = Round::open(
                round.index,
                round.start_time,
                config.round_delay_secs,
                config.round_duration_secs,
            )?;
            if round.active_at != expected.active_at || round.ends_at != expected.ends_at {
                return Err(inconsistent(format!(
                    "round {} window does not match the configuration",
                    round.index
                )));
            }
            let is_last = position + 1 == self.rounds.len();
            if config.require_finalized_previous && !is_last && !round.is_finalized() {
                return Err(inconsistent(format!(
                    "round {} was followed by another round before finalizing",
                    round.index
                )));
            }

            let Some(finalization) = round.finalization() else {
                continue;
            };
            let digest = OutcomeDigest::chain(
                &previous_digest,
                round.index,
                finalization.median_threshold,
                &finalization.eliminated,
            );
            if digest != finalization.outcome_digest {
                return Err(inconsistent(format!(
                    "round {} outcome digest does not match its outcome",
                    round.index
                )));
            }
            previous_digest = digest;
        }

        for entry in &self.candidates {
            let Some(from) = entry.eliminated_from else {
                continue;
            };
            let listed = usize::try_from(from)
                .ok()
                .and_then(|i| self.rounds.get(i))
                .and_then(Round::finalization)
                .is_some_and(|f| f.eliminated.contains(&entry.id));
            if !listed {
                return Err(inconsistent(format!(
                    "candidate {} eliminated from round {from} without that round eliminating it",
                    entry.id
                )));
            }
        }
        for round in &self.rounds {
            let Some(finalization) = round.finalization() else {
                continue;
            };
            for id in &finalization.eliminated {
                let matches = self
                    .candidates
                    .iter()
                    .any(|c| c.id == *id && c.eliminated_from == Some(round.index));
                if !matches {
                    return Err(inconsistent(format!(
                        "round {} eliminated {id}, which is not recorded as eliminated there",
                        round.index
                    )));
                }
            }
        }

        for record in &self.votes {
            if record.round >= self.rounds.len() as u64 {
                return Err(inconsistent(format!(
                    "vote recorded for unknown round {}",
                    record.round
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::median::ThresholdSource;
    use crate::registry::CandidateStatus;
    use crate::round::Finalization;
    use medvote_nullables::NullClock;
    use medvote_types::{CandidateId, VoteAmount};

    fn id(n: u8) -> CandidateId {
        CandidateId::from_low_byte(n)
    }

    #[test]
    fn restored_manager_answers_identically() {
        let mut m =
            RoundManager::with_config(NullClock::new(0), RoundsConfig::with_timing(60, 0)).unwrap();
        for n in 1..=3 {
            m.register_candidate(id(n)).unwrap();
        }
        m.start_next_round().unwrap();
        m.cast_vote(id(1), id(1), VoteAmount::new(5)).unwrap();
        m.cast_vote(id(2), id(2), VoteAmount::new(10)).unwrap();
        m.cast_vote(id(3), id(3), VoteAmount::new(15)).unwrap();
        m.clock().advance(60);
        m.finalize_round(ThresholdSource::ComputedFromVotes).unwrap();
        m.start_next_round().unwrap();
        m.cast_vote(id(2), id(3), VoteAmount::new(1)).unwrap();

        let bytes = m.snapshot().to_bytes().unwrap();
        let restored =
            RoundManager::restore(RoundsSnapshot::from_bytes(&bytes).unwrap(), NullClock::new(60))
                .unwrap();

        assert_eq!(restored.snapshot(), m.snapshot());
        assert_eq!(restored.candidate_status(&id(1), 0), CandidateStatus::Eliminated);
        assert_eq!(restored.candidate_votes(&id(3), 1), VoteAmount::new(1));
        assert_eq!(restored.votes_for_round(0), m.votes_for_round(0));
        assert!(restored.ledger().is_frozen(0));
        assert!(restored.registry().is_closed());
        assert!(restored.events().is_empty());
    }

    #[test]
    fn gap_in_rounds_is_rejected() {
        let mut snapshot =
            RoundManager::with_config(NullClock::new(0), RoundsConfig::default())
                .unwrap()
                .snapshot();
        snapshot.rounds.push(Round::open(1, medvote_types::Timestamp::new(0), 0, 60).unwrap());
        assert!(matches!(
            RoundManager::restore(snapshot, NullClock::new(0)),
            Err(RoundsError::Snapshot(_))
        ));
    }

    /// Three candidates; round 0 finalized at threshold 8 (ids 1 and 3 out), round 1 open.
    fn two_round_snapshot() -> RoundsSnapshot {
        let mut m =
            RoundManager::with_config(NullClock::new(0), RoundsConfig::with_timing(60, 0)).unwrap();
        for n in 1..=3 {
            m.register_candidate(id(n)).unwrap();
        }
        m.start_next_round().unwrap();
        m.cast_vote(id(1), id(1), VoteAmount::new(5)).unwrap();
        m.cast_vote(id(2), id(2), VoteAmount::new(10)).unwrap();
        m.clock().advance(60);
        m.finalize_round(ThresholdSource::Supplied(VoteAmount::new(8)))
            .unwrap();
        m.start_next_round().unwrap();
        m.snapshot()
    }

    fn assert_rejected(snapshot: RoundsSnapshot) {
        assert!(matches!(
            RoundManager::restore(snapshot, NullClock::new(0)),
            Err(RoundsError::Snapshot(_))
        ));
    }

    #[test]
    fn consistent_snapshot_passes_check() {
        assert_eq!(two_round_snapshot().check(), Ok(()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut snapshot = two_round_snapshot();
        if let Some(config) = snapshot.config.as_mut() {
            config.round_duration_secs = 0;
        }
        assert!(matches!(
            RoundManager::restore(snapshot, NullClock::new(0)),
            Err(RoundsError::InvalidConfig(_))
        ));

        let mut snapshot = two_round_snapshot();
        if let Some(config) = snapshot.config.as_mut() {
            config.max_recipients_per_ballot = 0;
        }
        assert!(matches!(
            RoundManager::restore(snapshot, NullClock::new(0)),
            Err(RoundsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reopened_registration_is_rejected() {
        let mut snapshot = two_round_snapshot();
        snapshot.registration_closed = false;
        assert_rejected(snapshot);
    }

    #[test]
    fn state_without_config_is_rejected() {
        let mut snapshot = two_round_snapshot();
        snapshot.config = None;
        assert_rejected(snapshot);
    }

    #[test]
    fn window_must_match_config() {
        let mut snapshot = two_round_snapshot();
        if let Some(config) = snapshot.config.as_mut() {
            config.round_duration_secs = 30;
        }
        assert_rejected(snapshot);
    }

    #[test]
    fn unfinalized_round_followed_by_another_is_rejected() {
        let mut snapshot = two_round_snapshot();
        let start = snapshot.rounds[1].ends_at;
        snapshot.rounds.push(Round::open(2, start, 0, 60).unwrap());
        assert_rejected(snapshot);
    }

    #[test]
    fn round_limit_is_enforced() {
        let mut snapshot = two_round_snapshot();
        if let Some(config) = snapshot.config.as_mut() {
            config.max_rounds = Some(1);
        }
        assert_rejected(snapshot);
    }

    #[test]
    fn forged_digest_is_rejected() {
        let mut snapshot = two_round_snapshot();
        let original = snapshot.rounds[0].clone();
        let Some(outcome) = original.finalization().cloned() else {
            panic!("round 0 is finalized");
        };
        let mut forged = Round::open(0, original.start_time, 0, 60).unwrap();
        forged.finalize(Finalization {
            outcome_digest: OutcomeDigest::new([7u8; 32]),
            ..outcome
        });
        snapshot.rounds[0] = forged;
        assert_rejected(snapshot);
    }

    #[test]
    fn elimination_points_must_match_outcomes() {
        let mut snapshot = two_round_snapshot();
        snapshot.candidates[0].eliminated_from = None;
        assert_rejected(snapshot);

        let mut snapshot = two_round_snapshot();
        snapshot.candidates[1].eliminated_from = Some(0);
        assert_rejected(snapshot);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(
            RoundsSnapshot::from_bytes(&[0xff, 0x01]),
            Err(RoundsError::Snapshot(_))
        ));
    }
}
