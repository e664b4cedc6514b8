//! Append-only, per-round vote ledger.
//!
//! Votes are partitioned strictly by round index. Within a round the raw
//! records keep submission order and a running total is kept per candidate.
//! Once a round is frozen its records and totals never change again.

use medvote_types::{CandidateId, VoteAmount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::RoundsError;
use crate::round::RoundStatus;

/// One recorded vote entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub round: u64,
    pub voter: CandidateId,
    pub candidate: CandidateId,
    pub amount: VoteAmount,
}

#[derive(Clone, Debug, Default)]
struct RoundVotes {
    records: Vec<VoteRecord>,
    totals: HashMap<CandidateId, VoteAmount>,
    entries_by_voter: HashMap<CandidateId, u64>,
    frozen: bool,
}

#[derive(Clone, Debug, Default)]
pub struct VoteLedger {
    rounds: BTreeMap<u64, RoundVotes>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every `(candidate, amount)` entry of one voter in `round`.
    ///
    /// Either all entries are recorded or none: totals are computed with
    /// checked arithmetic before anything is written. Eligibility is the
    /// caller's concern; the ledger only guards arithmetic and frozen rounds.
    pub fn record_ballot(
        &mut self,
        round: u64,
        voter: CandidateId,
        entries: &[(CandidateId, VoteAmount)],
    ) -> Result<(), RoundsError> {
        if self.is_frozen(round) {
            return Err(RoundsError::RoundNotActive {
                round,
                status: RoundStatus::Finalized,
            });
        }
        let mut pending: HashMap<CandidateId, VoteAmount> = HashMap::new();
        for (candidate, amount) in entries {
            let current = pending
                .get(candidate)
                .copied()
                .unwrap_or_else(|| self.candidate_votes(candidate, round));
            let total = current
                .checked_add(*amount)
                .ok_or(RoundsError::VoteOverflow {
                    candidate: *candidate,
                    round,
                })?;
            pending.insert(*candidate, total);
        }

        let votes = self.rounds.entry(round).or_default();
        votes.totals.extend(pending);
        *votes.entries_by_voter.entry(voter).or_insert(0) += entries.len() as u64;
        votes
            .records
            .extend(entries.iter().map(|(candidate, amount)| VoteRecord {
                round,
                voter,
                candidate: *candidate,
                amount: *amount,
            }));
        Ok(())
    }

    /// Accumulated votes for `candidate` in `round`; zero if none were cast.
    pub fn candidate_votes(&self, candidate: &CandidateId, round: u64) -> VoteAmount {
        self.rounds
            .get(&round)
            .and_then(|votes| votes.totals.get(candidate))
            .copied()
            .unwrap_or(VoteAmount::ZERO)
    }

    /// Raw amounts recorded in `round`, in submission order.
    pub fn votes_for_round(&self, round: u64) -> Vec<VoteAmount> {
        self.records(round).iter().map(|r| r.amount).collect()
    }

    pub fn records(&self, round: u64) -> &[VoteRecord] {
        self.rounds
            .get(&round)
            .map(|votes| votes.records.as_slice())
            .unwrap_or(&[])
    }

    /// Number of vote entries `voter` has cast in `round`.
    pub fn entries_cast_by(&self, voter: &CandidateId, round: u64) -> u64 {
        self.rounds
            .get(&round)
            .and_then(|votes| votes.entries_by_voter.get(voter))
            .copied()
            .unwrap_or(0)
    }

    /// Freeze `round`: no further entries are accepted.
    pub fn freeze(&mut self, round: u64) {
        self.rounds.entry(round).or_default().frozen = true;
    }

    pub fn is_frozen(&self, round: u64) -> bool {
        self.rounds.get(&round).is_some_and(|votes| votes.frozen)
    }

    /// Every record across all rounds, ordered by round then submission.
    pub fn all_records(&self) -> impl Iterator<Item = &VoteRecord> {
        self.rounds.values().flat_map(|votes| votes.records.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> CandidateId {
        CandidateId::from_low_byte(n)
    }

    fn amt(raw: u128) -> VoteAmount {
        VoteAmount::new(raw)
    }

    #[test]
    fn votes_accumulate_per_candidate() {
        let mut ledger = VoteLedger::new();
        ledger.record_ballot(0, id(1), &[(id(2), amt(5))]).unwrap();
        ledger.record_ballot(0, id(1), &[(id(2), amt(7))]).unwrap();
        ledger.record_ballot(0, id(3), &[(id(2), amt(1))]).unwrap();

        assert_eq!(ledger.candidate_votes(&id(2), 0), amt(13));
        assert_eq!(ledger.votes_for_round(0), vec![amt(5), amt(7), amt(1)]);
        assert_eq!(ledger.entries_cast_by(&id(1), 0), 2);
        assert_eq!(ledger.entries_cast_by(&id(3), 0), 1);
    }

    #[test]
    fn unknown_round_or_candidate_reads_zero() {
        let ledger = VoteLedger::new();
        assert_eq!(ledger.candidate_votes(&id(1), 4), VoteAmount::ZERO);
        assert!(ledger.votes_for_round(4).is_empty());
        assert_eq!(ledger.entries_cast_by(&id(1), 4), 0);
    }

    #[test]
    fn rounds_never_mix() {
        let mut ledger = VoteLedger::new();
        ledger.record_ballot(0, id(1), &[(id(1), amt(10))]).unwrap();
        ledger.record_ballot(1, id(1), &[(id(1), amt(20))]).unwrap();

        assert_eq!(ledger.candidate_votes(&id(1), 0), amt(10));
        assert_eq!(ledger.candidate_votes(&id(1), 1), amt(20));
        assert_eq!(ledger.votes_for_round(1), vec![amt(20)]);
    }

    #[test]
    fn zero_amount_is_recorded() {
        let mut ledger = VoteLedger::new();
        ledger.record_ballot(0, id(1), &[(id(1), amt(0))]).unwrap();
        assert_eq!(ledger.records(0).len(), 1);
        assert_eq!(ledger.candidate_votes(&id(1), 0), VoteAmount::ZERO);
    }

    #[test]
    fn totals_grow_past_128_bits() {
        let mut ledger = VoteLedger::new();
        let half = amt(1u128 << 127);
        ledger.record_ballot(0, id(1), &[(id(2), half)]).unwrap();
        ledger.record_ballot(0, id(3), &[(id(2), half)]).unwrap();

        let total = ledger.candidate_votes(&id(2), 0);
        assert!(total > amt(u128::MAX));
        assert_eq!(total.to_string(), "340282366920938463463374607431768211456");
    }

    #[test]
    fn overflow_leaves_ledger_untouched() {
        let mut ledger = VoteLedger::new();
        ledger
            .record_ballot(0, id(1), &[(id(2), VoteAmount::MAX)])
            .unwrap();

        let err = ledger
            .record_ballot(0, id(3), &[(id(4), amt(1)), (id(2), amt(1))])
            .unwrap_err();
        assert_eq!(
            err,
            RoundsError::VoteOverflow {
                candidate: id(2),
                round: 0
            }
        );
        assert_eq!(ledger.candidate_votes(&id(4), 0), VoteAmount::ZERO);
        assert_eq!(ledger.records(0).len(), 1);
        assert_eq!(ledger.entries_cast_by(&id(3), 0), 0);
    }

    #[test]
    fn frozen_round_rejects_entries() {
        let mut ledger = VoteLedger::new();
        ledger.record_ballot(0, id(1), &[(id(1), amt(3))]).unwrap();
        ledger.freeze(0);

        assert!(ledger.is_frozen(0));
        assert!(matches!(
            ledger.record_ballot(0, id(1), &[(id(1), amt(3))]),
            Err(RoundsError::RoundNotActive { round: 0, .. })
        ));
        assert_eq!(ledger.candidate_votes(&id(1), 0), amt(3));
    }

    #[test]
    fn all_records_are_round_ordered() {
        let mut ledger = VoteLedger::new();
        ledger.record_ballot(1, id(1), &[(id(1), amt(2))]).unwrap();
        ledger.record_ballot(0, id(1), &[(id(1), amt(1))]).unwrap();
        let rounds: Vec<u64> = ledger.all_records().map(|r| r.round).collect();
        assert_eq!(rounds, vec![0, 1]);
    }
}
