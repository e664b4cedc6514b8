//! Vote amount type.
//!
//! Amounts are already-resolved unsigned 256-bit integer weights. There is no
//! fractional part anywhere in the protocol.

use crate::error::TypesError;
use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of a vote amount in bytes.
pub const VOTE_AMOUNT_LEN: usize = 32;

/// A vote weight, or an accumulated total of vote weights, in `0..2^256`.
///
/// Stored as fixed-width big-endian bytes; the derived ordering is the
/// numeric ordering.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoteAmount([u8; VOTE_AMOUNT_LEN]);

impl VoteAmount {
    pub const ZERO: Self = Self([0u8; VOTE_AMOUNT_LEN]);
    pub const MAX: Self = Self([0xffu8; VOTE_AMOUNT_LEN]);

    pub fn new(raw: u128) -> Self {
        let mut bytes = [0u8; VOTE_AMOUNT_LEN];
        bytes[VOTE_AMOUNT_LEN - 16..].copy_from_slice(&raw.to_be_bytes());
        Self(bytes)
    }

    pub fn from_be_bytes(bytes: [u8; VOTE_AMOUNT_LEN]) -> Self {
        Self(bytes)
    }

    /// `None` if `value` needs more than 256 bits.
    pub fn from_biguint(value: &BigUint) -> Option<Self> {
        let digits = value.to_bytes_be();
        if digits.len() > VOTE_AMOUNT_LEN {
            return None;
        }
        let mut bytes = [0u8; VOTE_AMOUNT_LEN];
        bytes[VOTE_AMOUNT_LEN - digits.len()..].copy_from_slice(&digits);
        Some(Self(bytes))
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// `self + other`, or `None` past `2^256 - 1`.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        Self::from_biguint(&(self.to_biguint() + other.to_biguint()))
    }

    /// Big-endian bytes, used when hashing round outcomes.
    pub fn to_be_bytes(self) -> [u8; VOTE_AMOUNT_LEN] {
        self.0
    }
}

impl From<u128> for VoteAmount {
    fn from(raw: u128) -> Self {
        Self::new(raw)
    }
}

impl From<u64> for VoteAmount {
    fn from(raw: u64) -> Self {
        Self::new(u128::from(raw))
    }
}

impl FromStr for VoteAmount {
    type Err = TypesError;

    /// Parse a decimal integer below `2^256`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidAmount(s.to_string());
        let digits = s.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value = BigUint::from_str(digits).map_err(|_| invalid())?;
        Self::from_biguint(&value).ok_or_else(invalid)
    }
}

impl fmt::Display for VoteAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for VoteAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoteAmount({self})")
    }
}

// Decimal string in human-readable formats, 32 big-endian bytes otherwise.
impl Serialize for VoteAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

struct DecimalVisitor;

impl de::Visitor<'_> for DecimalVisitor {
    type Value = VoteAmount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or unsigned integer below 2^256")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<VoteAmount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<VoteAmount, E> {
        Ok(VoteAmount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<VoteAmount, E> {
        Ok(VoteAmount::new(v))
    }
}

impl<'de> Deserialize<'de> for VoteAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(DecimalVisitor)
        } else {
            <[u8; VOTE_AMOUNT_LEN]>::deserialize(deserializer).map(Self)
        }
    }
}
