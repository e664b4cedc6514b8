//! Outcome digest chain.
//!
//! Each finalized round commits to the previous round's digest, its index,
//! its threshold and the candidates it eliminated. Two replicas that agree on
//! the latest digest agree on every round outcome before it.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use medvote_types::{CandidateId, VoteAmount};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

const DOMAIN_TAG: &[u8] = b"medvote-round-outcome";

/// A 32-byte Blake2b digest over the chain of round outcomes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutcomeDigest([u8; 32]);

impl OutcomeDigest {
    /// The digest that round 0 chains from.
    pub const GENESIS: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest of round `index` finalized with `threshold`, chained from `previous`.
    pub fn chain(
        previous: &OutcomeDigest,
        index: u64,
        threshold: VoteAmount,
        eliminated: &[CandidateId],
    ) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(previous.0);
        hasher.update(index.to_be_bytes());
        hasher.update(threshold.to_be_bytes());
        hasher.update((eliminated.len() as u64).to_be_bytes());
        for candidate in eliminated {
            hasher.update(candidate.as_bytes());
        }
        let mut output = [0u8; 32];
        output.copy_from_slice(&hasher.finalize());
        Self(output)
    }
}

impl fmt::Debug for OutcomeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutcomeDigest({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for OutcomeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for OutcomeDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for OutcomeDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(&s, &mut bytes).map_err(de::Error::custom)?;
            Ok(Self(bytes))
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}
