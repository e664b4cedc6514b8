//! Replay scripts: a JSON array of calls applied in order.

use anyhow::{Context, Result};
use medvote_nullables::NullClock;
use medvote_rounds::{RoundManager, ThresholdSource};
use medvote_types::{CandidateId, VoteAmount};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    pub candidate: CandidateId,
    pub amount: u64,
}

/// One call against the round manager.
///
/// Script amounts are `u64`: tagged enums buffer their fields and that
/// buffer has no 128-bit integers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Register {
        candidate: CandidateId,
    },
    StartRound,
    /// Move the clock forward.
    Advance {
        secs: u64,
    },
    Vote {
        voter: CandidateId,
        candidate: CandidateId,
        amount: u64,
    },
    Ballot {
        voter: CandidateId,
        votes: Vec<BallotEntry>,
    },
    /// Finalize the current round; without `threshold` the median is computed.
    Finalize {
        #[serde(default)]
        threshold: Option<u64>,
    },
}

pub fn parse_script(json: &str) -> Result<Vec<Step>> {
    serde_json::from_str(json).context("script must be a JSON array of steps")
}

/// Apply `step` to `manager`, advancing `clock` for `advance` steps.
pub fn apply(step: &Step, manager: &mut RoundManager<Rc<NullClock>>, clock: &NullClock) -> Result<()> {
    match step {
        Step::Register { candidate } => manager.register_candidate(*candidate)?,
        Step::StartRound => {
            manager.start_next_round()?;
        }
        Step::Advance { secs } => clock.advance(*secs),
        Step::Vote {
            voter,
            candidate,
            amount,
        } => manager.cast_vote(*voter, *candidate, VoteAmount::from(*amount))?,
        Step::Ballot { voter, votes } => {
            let entries: Vec<_> = votes
                .iter()
                .map(|e| (e.candidate, VoteAmount::from(e.amount)))
                .collect();
            manager.cast_ballot(*voter, &entries)?;
        }
        Step::Finalize { threshold } => {
            let source = threshold
                .map(|t| ThresholdSource::Supplied(VoteAmount::from(t)))
                .unwrap_or(ThresholdSource::ComputedFromVotes);
            manager.finalize_round(source)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medvote_rounds::{CandidateStatus, RoundEvent, RoundsConfig};

    const SCRIPT: &str = r#"[
        {"op": "register", "candidate": "0x0000000000000000000000000000000000000001"},
        {"op": "register", "candidate": "0x0000000000000000000000000000000000000002"},
        {"op": "start_round"},
        {"op": "advance", "secs": 5},
        {"op": "vote", "voter": "0x0000000000000000000000000000000000000001",
         "candidate": "0x0000000000000000000000000000000000000001", "amount": 5},
        {"op": "ballot", "voter": "0x0000000000000000000000000000000000000002",
         "votes": [{"candidate": "0x0000000000000000000000000000000000000002", "amount": 10}]},
        {"op": "advance", "secs": 60},
        {"op": "finalize", "threshold": 8}
    ]"#;

    #[test]
    fn parses_every_step_kind() {
        let steps = parse_script(SCRIPT).unwrap();
        assert_eq!(steps.len(), 8);
        assert_eq!(steps[2], Step::StartRound);
        assert_eq!(
            steps[7],
            Step::Finalize {
                threshold: Some(8)
            }
        );
    }

    #[test]
    fn finalize_without_threshold_is_computed() {
        let steps = parse_script(r#"[{"op": "finalize"}]"#).unwrap();
        assert_eq!(steps, vec![Step::Finalize { threshold: None }]);
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(parse_script(r#"[{"op": "teleport"}]"#).is_err());
    }

    #[test]
    fn replays_a_full_round() {
        let clock = Rc::new(NullClock::new(0));
        let config = RoundsConfig::with_timing(60, 5);
        let mut manager = RoundManager::with_config(clock.clone(), config).unwrap();

        for step in parse_script(SCRIPT).unwrap() {
            apply(&step, &mut manager, &clock).unwrap();
        }

        let one = CandidateId::from_low_byte(1);
        assert_eq!(manager.candidate_status(&one, 0), CandidateStatus::Eliminated);
        assert!(matches!(
            manager.events().last(),
            Some(RoundEvent::RoundFinalized { round: 0, .. })
        ));
    }

    #[test]
    fn failing_step_surfaces_the_error() {
        let clock = Rc::new(NullClock::new(0));
        let mut manager =
            RoundManager::with_config(clock.clone(), RoundsConfig::default()).unwrap();
        let err = apply(&Step::Finalize { threshold: None }, &mut manager, &clock).unwrap_err();
        assert!(err.to_string().contains("no round has been started"));
    }
}
