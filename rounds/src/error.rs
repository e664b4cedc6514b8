use medvote_types::CandidateId;
use thiserror::Error;

use crate::round::RoundStatus;

/// Every caller-facing failure of the round state machine.
///
/// A returned error always means the call left all state unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoundsError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("rounds have already been initialized")]
    AlreadyInitialized,

    #[error("rounds have not been initialized")]
    NotInitialized,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    // ── Sequencing ───────────────────────────────────────────────────
    #[error("registration is closed once the first round has started")]
    RegistrationClosed,

    #[error("candidate {0} is already registered")]
    CandidateAlreadyRegistered(CandidateId),

    #[error("round {round} is not active (status {status})")]
    RoundNotActive { round: u64, status: RoundStatus },

    #[error("no round has been started yet")]
    NoRounds,

    #[error("round {round} has not ended yet (status {status})")]
    RoundNotEnded { round: u64, status: RoundStatus },

    #[error("round {0} is already finalized")]
    RoundAlreadyFinalized(u64),

    #[error("previous round {0} has not been finalized")]
    PreviousRoundNotOver(u64),

    #[error("maximum number of rounds ({0}) reached")]
    MaxRoundsReached(u64),

    // ── Eligibility ──────────────────────────────────────────────────
    #[error("voter {voter} is not eligible to vote in round {round}")]
    InvalidVoter { voter: CandidateId, round: u64 },

    #[error("candidate {0} is not eligible")]
    InvalidCandidate(CandidateId),

    #[error("invalid ballot: {0}")]
    InvalidBallot(String),

    #[error("ballot names {got} recipients, at most {max} allowed")]
    TooManyRecipients { got: usize, max: usize },

    // ── Arithmetic ───────────────────────────────────────────────────
    #[error("cannot derive a median from a round with no votes")]
    EmptyRound,

    #[error("vote total for candidate {candidate} in round {round} overflows")]
    VoteOverflow { candidate: CandidateId, round: u64 },

    #[error("round window does not fit in the timestamp range")]
    WindowOverflow,

    #[error("snapshot error: {0}")]
    Snapshot(String),
}
