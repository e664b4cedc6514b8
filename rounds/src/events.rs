//! Notifications emitted on every committed state change.

use medvote_types::{CandidateId, Timestamp, VoteAmount};
use serde::{Deserialize, Serialize};

use crate::digest::OutcomeDigest;

/// Externally observable round events, in commit order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    CandidateRegistered {
        candidate: CandidateId,
    },
    RoundStarted {
        round: u64,
        start_time: Timestamp,
        active_at: Timestamp,
        end_time: Timestamp,
    },
    VoteCast {
        voter: CandidateId,
        candidate: CandidateId,
        round: u64,
        amount: VoteAmount,
    },
    /// The round's window has closed; published as finalization begins.
    RoundEnded {
        round: u64,
    },
    CandidateEliminated {
        candidate: CandidateId,
        round: u64,
    },
    RoundFinalized {
        round: u64,
        median_threshold: VoteAmount,
        outcome_digest: OutcomeDigest,
    },
}

/// Synchronous fan-out event bus with an append-only log.
///
/// Listeners are invoked inline and only see `&RoundEvent`; they have no
/// path back into the state machine.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&RoundEvent) + Send + Sync>>,
    log: Vec<RoundEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RoundEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&mut self, event: RoundEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
        self.log.push(event);
    }

    /// Every event emitted so far, oldest first.
    pub fn events(&self) -> &[RoundEvent] {
        &self.log
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("events", &self.log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn registered(n: u8) -> RoundEvent {
        RoundEvent::CandidateRegistered {
            candidate: CandidateId::from_low_byte(n),
        }
    }

    #[test]
    fn emit_with_no_listeners_still_logs() {
        let mut bus = EventBus::new();
        bus.emit(registered(1));
        assert_eq!(bus.events(), &[registered(1)]);
    }

    #[test]
    fn every_listener_sees_every_event() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let c = count.clone();
            bus.subscribe(Box::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        bus.emit(registered(1));
        bus.emit(registered(2));
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(bus.events().len(), 2);
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let event = RoundEvent::VoteCast {
            voter: CandidateId::from_low_byte(1),
            candidate: CandidateId::from_low_byte(2),
            round: 0,
            amount: VoteAmount::new(0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "vote_cast");
        assert_eq!(json["amount"], "0");
        assert_eq!(
            json["candidate"],
            "0x0000000000000000000000000000000000000002"
        );
    }
}
