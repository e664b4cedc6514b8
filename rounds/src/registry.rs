//! Candidate registry with carry-forward elimination.
//!
//! Only the transition point is stored per candidate: the round index from
//! which it is eliminated. The status for any round, including rounds that
//! do not exist yet, is resolved by comparing against that index.

use medvote_types::CandidateId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::RoundsError;

/// A candidate's standing in a given round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateStatus {
    Unregistered,
    Registered,
    Eliminated,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unregistered => "UNREGISTERED",
            Self::Registered => "REGISTERED",
            Self::Eliminated => "ELIMINATED",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered candidate as stored in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub id: CandidateId,
    /// First round in which the candidate counts as eliminated.
    pub eliminated_from: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct CandidateRegistry {
    /// Candidate → index into `entries`.
    index: HashMap<CandidateId, usize>,
    /// Registration order.
    entries: Vec<CandidateEntry>,
    closed: bool,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` for round 0 onward.
    pub fn register(&mut self, id: CandidateId) -> Result<(), RoundsError> {
        if self.closed {
            return Err(RoundsError::RegistrationClosed);
        }
        if id.is_zero() {
            return Err(RoundsError::InvalidCandidate(id));
        }
        if self.index.contains_key(&id) {
            return Err(RoundsError::CandidateAlreadyRegistered(id));
        }
        self.index.insert(id, self.entries.len());
        self.entries.push(CandidateEntry {
            id,
            eliminated_from: None,
        });
        Ok(())
    }

    /// Close registration permanently.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self, id: &CandidateId, round: u64) -> CandidateStatus {
        match self.entry(id) {
            None => CandidateStatus::Unregistered,
            Some(entry) => match entry.eliminated_from {
                Some(from) if from <= round => CandidateStatus::Eliminated,
                _ => CandidateStatus::Registered,
            },
        }
    }

    pub fn is_eligible(&self, id: &CandidateId, round: u64) -> bool {
        self.status(id, round) == CandidateStatus::Registered
    }

    pub fn eliminated_from(&self, id: &CandidateId) -> Option<u64> {
        self.entry(id).and_then(|e| e.eliminated_from)
    }

    /// Mark `id` eliminated from `round` onward.
    ///
    /// Returns `false` (and changes nothing) if the candidate is unknown or
    /// already eliminated.
    pub fn eliminate(&mut self, id: &CandidateId, round: u64) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let entry = &mut self.entries[i];
        if entry.eliminated_from.is_some() {
            return false;
        }
        entry.eliminated_from = Some(round);
        true
    }

    /// All candidates in registration order.
    pub fn candidates(&self) -> impl Iterator<Item = &CandidateId> {
        self.entries.iter().map(|e| &e.id)
    }

    /// Candidates still registered as of `round`, in registration order.
    pub fn eligible(&self, round: u64) -> impl Iterator<Item = &CandidateId> {
        self.entries
            .iter()
            .filter(move |e| e.eliminated_from.map_or(true, |from| from > round))
            .map(|e| &e.id)
    }

    pub fn entries(&self) -> &[CandidateEntry] {
        &self.entries
    }

    /// Rebuild a registry from snapshot entries.
    pub(crate) fn from_entries(
        entries: Vec<CandidateEntry>,
        closed: bool,
    ) -> Result<Self, RoundsError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.id.is_zero() || index.insert(entry.id, i).is_some() {
                return Err(RoundsError::Snapshot(format!(
                    "invalid or duplicate candidate {}",
                    entry.id
                )));
            }
        }
        Ok(Self {
            index,
            entries,
            closed,
        })
    }

    fn entry(&self, id: &CandidateId) -> Option<&CandidateEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }
}
