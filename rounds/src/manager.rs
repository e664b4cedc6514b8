//! Round manager: owns the round history and orchestrates the registry,
//! the vote ledger and the median engine.
//!
//! Every operation reads the clock once, validates everything it needs,
//! and only then commits. A returned error means nothing changed, and
//! events are published only after the commit.

use medvote_types::{CandidateId, Clock, Timestamp, VoteAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::RoundsConfig;
use crate::digest::OutcomeDigest;
use crate::error::RoundsError;
use crate::events::{EventBus, RoundEvent};
use crate::ledger::{VoteLedger, VoteRecord};
use crate::median::{MedianEngine, MedianInput, ThresholdSource};
use crate::registry::{CandidateRegistry, CandidateStatus};
use crate::round::{Finalization, Round, RoundStatus};

/// What finalizing a round decided.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: u64,
    pub median_threshold: VoteAmount,
    pub eliminated: Vec<CandidateId>,
    pub outcome_digest: OutcomeDigest,
}

/// A candidate's standing in one round, as read by the payout layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub candidate: CandidateId,
    pub status: CandidateStatus,
    pub votes: VoteAmount,
}

pub struct RoundManager<C> {
    clock: C,
    pub(crate) config: Option<RoundsConfig>,
    pub(crate) registry: CandidateRegistry,
    pub(crate) ledger: VoteLedger,
    pub(crate) rounds: Vec<Round>,
    notifier: EventBus,
}

impl<C: Clock> RoundManager<C> {
    /// An uninitialized manager. Call [`RoundManager::initialize`] before use.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            config: None,
            registry: CandidateRegistry::new(),
            ledger: VoteLedger::new(),
            rounds: Vec::new(),
            notifier: EventBus::new(),
        }
    }

    /// Shorthand for [`RoundManager::new`] followed by [`RoundManager::initialize`].
    pub fn with_config(clock: C, config: RoundsConfig) -> Result<Self, RoundsError> {
        let mut manager = Self::new(clock);
        manager.initialize(config)?;
        Ok(manager)
    }

    pub(crate) fn from_parts(
        clock: C,
        config: Option<RoundsConfig>,
        registry: CandidateRegistry,
        ledger: VoteLedger,
        rounds: Vec<Round>,
    ) -> Self {
        Self {
            clock,
            config,
            registry,
            ledger,
            rounds,
            notifier: EventBus::new(),
        }
    }

    /// One-time configuration.
    pub fn initialize(&mut self, config: RoundsConfig) -> Result<(), RoundsError> {
        if self.config.is_some() {
            return Err(RoundsError::AlreadyInitialized);
        }
        config.validate()?;
        info!(
            name = %config.name,
            round_duration_secs = config.round_duration_secs,
            round_delay_secs = config.round_delay_secs,
            elimination = ?config.elimination,
            "rounds initialized"
        );
        self.config = Some(config);
        Ok(())
    }

    // ── Commands ────────────────────────────────────────────────────────

    pub fn register_candidate(&mut self, candidate: CandidateId) -> Result<(), RoundsError> {
        self.require_config()?;
        self.registry
            .register(candidate)
            .inspect_err(|e| warn!(%candidate, error = %e, "registration rejected"))?;

        info!(%candidate, total = self.registry.len(), "candidate registered");
        self.notifier
            .emit(RoundEvent::CandidateRegistered { candidate });
        Ok(())
    }

    /// Create the next round and close registration for good.
    pub fn start_next_round(&mut self) -> Result<u64, RoundsError> {
        let now = self.clock.now();
        let config = self.require_config()?;
        let index = self.rounds.len() as u64;

        if let Some(max) = config.max_rounds {
            if index >= max {
                warn!(index, max, "round limit reached");
                return Err(RoundsError::MaxRoundsReached(max));
            }
        }
        if let Some(previous) = self.rounds.last() {
            if config.require_finalized_previous && !previous.is_finalized() {
                warn!(previous = previous.index, "previous round not finalized");
                return Err(RoundsError::PreviousRoundNotOver(previous.index));
            }
        }
        let round = Round::open(
            index,
            now,
            config.round_delay_secs,
            config.round_duration_secs,
        )?;

        let event = RoundEvent::RoundStarted {
            round: index,
            start_time: round.start_time,
            active_at: round.active_at,
            end_time: round.ends_at,
        };
        info!(
            round = index,
            active_at = %round.active_at,
            ends_at = %round.ends_at,
            "round started"
        );
        self.registry.close();
        self.rounds.push(round);
        self.notifier.emit(event);
        Ok(index)
    }

    /// Vote in the current round.
    pub fn cast_vote(
        &mut self,
        voter: CandidateId,
        candidate: CandidateId,
        amount: VoteAmount,
    ) -> Result<(), RoundsError> {
        let round = self.current_round_index().unwrap_or(0);
        self.cast_ballot_in(round, voter, &[(candidate, amount)])
    }

    /// Vote in an explicitly named round.
    pub fn cast_vote_in(
        &mut self,
        round: u64,
        voter: CandidateId,
        candidate: CandidateId,
        amount: VoteAmount,
    ) -> Result<(), RoundsError> {
        self.cast_ballot_in(round, voter, &[(candidate, amount)])
    }

    /// Cast several votes in the current round as one atomic ballot.
    pub fn cast_ballot(
        &mut self,
        voter: CandidateId,
        entries: &[(CandidateId, VoteAmount)],
    ) -> Result<(), RoundsError> {
        let round = self.current_round_index().unwrap_or(0);
        self.cast_ballot_in(round, voter, entries)
    }

    pub fn cast_ballot_in(
        &mut self,
        round: u64,
        voter: CandidateId,
        entries: &[(CandidateId, VoteAmount)],
    ) -> Result<(), RoundsError> {
        let now = self.clock.now();
        self.check_ballot(now, round, voter, entries)
            .inspect_err(|e| warn!(round, %voter, error = %e, "vote rejected"))?;
        self.ledger.record_ballot(round, voter, entries)?;

        for &(candidate, amount) in entries {
            debug!(round, %voter, %candidate, %amount, "vote recorded");
            self.notifier.emit(RoundEvent::VoteCast {
                voter,
                candidate,
                round,
                amount,
            });
        }
        Ok(())
    }

    /// Finalize the current round once its window has closed.
    ///
    /// Resolves the threshold, eliminates candidates for this round onward,
    /// freezes the round's votes and seals the outcome digest.
    pub fn finalize_round(&mut self, source: ThresholdSource) -> Result<RoundOutcome, RoundsError> {
        let now = self.clock.now();
        let config = self.require_config()?;
        let round = self.rounds.last().ok_or(RoundsError::NoRounds)?;
        let index = round.index;

        match round.status_at(now) {
            RoundStatus::Ended => {}
            RoundStatus::Finalized => return Err(RoundsError::RoundAlreadyFinalized(index)),
            status => {
                warn!(round = index, %status, "finalize rejected");
                return Err(RoundsError::RoundNotEnded {
                    round: index,
                    status,
                });
            }
        }

        let totals: Vec<(CandidateId, VoteAmount)> = self
            .registry
            .eligible(index)
            .map(|c| (*c, self.ledger.candidate_votes(c, index)))
            .collect();
        let amounts = match config.median_input {
            MedianInput::VoteEntries => self.ledger.votes_for_round(index),
            MedianInput::CandidateTotals => totals.iter().map(|(_, t)| *t).collect(),
        };
        let threshold = MedianEngine::resolve_threshold(source, &amounts)
            .inspect_err(|e| warn!(round = index, error = %e, "finalize rejected"))?;
        let direction = config.elimination;
        let previous_digest = self
            .rounds
            .iter()
            .rev()
            .find_map(Round::outcome_digest)
            .unwrap_or(OutcomeDigest::GENESIS);

        // Commit. Nothing below can fail.
        let eliminated = MedianEngine::apply_elimination(
            &mut self.registry,
            index,
            &totals,
            threshold,
            direction,
        );
        let outcome_digest = OutcomeDigest::chain(&previous_digest, index, threshold, &eliminated);
        self.ledger.freeze(index);
        let last = self.rounds.len() - 1;
        self.rounds[last].finalize(Finalization {
            median_threshold: threshold,
            finalized_at: now,
            eliminated: eliminated.clone(),
            outcome_digest,
        });

        info!(
            round = index,
            %threshold,
            eliminated = eliminated.len(),
            remaining = self.registry.eligible(index).count(),
            digest = %outcome_digest,
            "round finalized"
        );
        self.notifier.emit(RoundEvent::RoundEnded { round: index });
        for &candidate in &eliminated {
            self.notifier.emit(RoundEvent::CandidateEliminated {
                candidate,
                round: index,
            });
        }
        self.notifier.emit(RoundEvent::RoundFinalized {
            round: index,
            median_threshold: threshold,
            outcome_digest,
        });

        Ok(RoundOutcome {
            round: index,
            median_threshold: threshold,
            eliminated,
            outcome_digest,
        })
    }

    /// Subscribe to every future event.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RoundEvent) + Send + Sync>) {
        self.notifier.subscribe(listener);
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn round_status(&self, index: u64) -> RoundStatus {
        let now = self.clock.now();
        self.status_at(index, now)
    }

    /// Index of the most recently started round.
    pub fn current_round_index(&self) -> Option<u64> {
        self.rounds.last().map(|r| r.index)
    }

    pub fn round(&self, index: u64) -> Option<&Round> {
        usize::try_from(index).ok().and_then(|i| self.rounds.get(i))
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn candidate_status(&self, candidate: &CandidateId, round: u64) -> CandidateStatus {
        self.registry.status(candidate, round)
    }

    /// Whether `candidate` is eliminated as of the current round.
    pub fn is_eliminated(&self, candidate: &CandidateId) -> bool {
        let round = self.current_round_index().unwrap_or(0);
        self.registry.status(candidate, round) == CandidateStatus::Eliminated
    }

    pub fn candidate_votes(&self, candidate: &CandidateId, round: u64) -> VoteAmount {
        self.ledger.candidate_votes(candidate, round)
    }

    /// Raw vote amounts of `round` in submission order.
    pub fn votes_for_round(&self, round: u64) -> Vec<VoteAmount> {
        self.ledger.votes_for_round(round)
    }

    pub fn vote_records(&self, round: u64) -> &[VoteRecord] {
        self.ledger.records(round)
    }

    pub fn votes_cast_by(&self, voter: &CandidateId, round: u64) -> u64 {
        self.ledger.entries_cast_by(voter, round)
    }

    pub fn total_registered_candidates(&self) -> usize {
        self.registry.len()
    }

    /// Candidates still in the running as of `round`, in registration order.
    pub fn eligible_candidates(&self, round: u64) -> Vec<CandidateId> {
        self.registry.eligible(round).copied().collect()
    }

    /// Status and vote total of every registered candidate in `round`.
    pub fn standings(&self, round: u64) -> Vec<Standing> {
        self.registry
            .candidates()
            .map(|c| Standing {
                candidate: *c,
                status: self.registry.status(c, round),
                votes: self.ledger.candidate_votes(c, round),
            })
            .collect()
    }

    pub fn round_duration(&self) -> Option<u64> {
        self.config.as_ref().map(|c| c.round_duration_secs)
    }

    pub fn round_delay(&self) -> Option<u64> {
        self.config.as_ref().map(|c| c.round_delay_secs)
    }

    pub fn config(&self) -> Option<&RoundsConfig> {
        self.config.as_ref()
    }

    pub fn registry(&self) -> &CandidateRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn events(&self) -> &[RoundEvent] {
        self.notifier.events()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn require_config(&self) -> Result<&RoundsConfig, RoundsError> {
        self.config.as_ref().ok_or(RoundsError::NotInitialized)
    }

    fn status_at(&self, index: u64, now: Timestamp) -> RoundStatus {
        self.round(index)
            .map_or(RoundStatus::DoesNotExist, |r| r.status_at(now))
    }

    fn check_ballot(
        &self,
        now: Timestamp,
        round: u64,
        voter: CandidateId,
        entries: &[(CandidateId, VoteAmount)],
    ) -> Result<(), RoundsError> {
        let config = self.require_config()?;

        let status = self.status_at(round, now);
        if status != RoundStatus::Active {
            return Err(RoundsError::RoundNotActive { round, status });
        }

        if entries.is_empty() {
            return Err(RoundsError::InvalidBallot("ballot has no entries".into()));
        }
        if entries.len() > config.max_recipients_per_ballot {
            return Err(RoundsError::TooManyRecipients {
                got: entries.len(),
                max: config.max_recipients_per_ballot,
            });
        }
        let mut seen = HashSet::with_capacity(entries.len());
        for (candidate, _) in entries {
            if !seen.insert(candidate) {
                return Err(RoundsError::InvalidBallot(format!(
                    "candidate {candidate} appears more than once"
                )));
            }
        }

        if !self.registry.is_eligible(&voter, round) {
            return Err(RoundsError::InvalidVoter { voter, round });
        }
        for (candidate, _) in entries {
            if !self.registry.is_eligible(candidate, round) {
                return Err(RoundsError::InvalidCandidate(*candidate));
            }
        }
        Ok(())
    }
}
