//! Candidate identity.
//!
//! Candidates and voters share one identity space: a participant registers
//! once and is then both something you can vote for and someone who may vote.

use crate::error::TypesError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of a candidate identity in bytes (a ledger account address).
pub const CANDIDATE_ID_LEN: usize = 20;

/// A 20-byte participant identity.
///
/// The all-zero value is the null identity and is never a valid candidate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateId([u8; CANDIDATE_ID_LEN]);

impl CandidateId {
    /// The null identity.
    pub const ZERO: Self = Self([0u8; CANDIDATE_ID_LEN]);

    pub fn new(bytes: [u8; CANDIDATE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// An identity whose last byte is `n` and every other byte zero.
    ///
    /// `from_low_byte(0)` is [`CandidateId::ZERO`].
    pub fn from_low_byte(n: u8) -> Self {
        let mut bytes = [0u8; CANDIDATE_ID_LEN];
        bytes[CANDIDATE_ID_LEN - 1] = n;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CANDIDATE_ID_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; CANDIDATE_ID_LEN]
    }
}

impl fmt::Debug for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CandidateId(0x{})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for CandidateId {
    type Err = TypesError;

    /// Parse 40 hex digits, with or without a leading `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let invalid = |reason: String| TypesError::InvalidCandidateId {
            input: s.to_string(),
            reason,
        };
        if digits.len() != CANDIDATE_ID_LEN * 2 {
            return Err(invalid(format!(
                "expected {} hex digits, got {}",
                CANDIDATE_ID_LEN * 2,
                digits.len()
            )));
        }
        let mut bytes = [0u8; CANDIDATE_ID_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|e| invalid(e.to_string()))?;
        Ok(Self(bytes))
    }
}

// Hex string in human-readable formats (JSON, TOML), raw bytes otherwise.
impl Serialize for CandidateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for CandidateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        } else {
            <[u8; CANDIDATE_ID_LEN]>::deserialize(deserializer).map(Self)
        }
    }
}
