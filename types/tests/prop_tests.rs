use proptest::prelude::*;

use medvote_types::{CandidateId, Timestamp, VoteAmount};
use num_bigint::BigUint;

proptest! {
    /// Display output parses back to the same identity.
    #[test]
    fn candidate_id_display_parses_back(bytes in prop::array::uniform20(0u8..)) {
        let id = CandidateId::new(bytes);
        let parsed: CandidateId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// CandidateId::is_zero is true only for all-zero bytes.
    #[test]
    fn candidate_id_is_zero_correct(bytes in prop::array::uniform20(0u8..)) {
        let id = CandidateId::new(bytes);
        prop_assert_eq!(id.is_zero(), bytes == [0u8; 20]);
    }

    /// CandidateId ordering follows byte ordering.
    #[test]
    fn candidate_id_ordering(a in prop::array::uniform20(0u8..), b in prop::array::uniform20(0u8..)) {
        prop_assert_eq!(CandidateId::new(a) < CandidateId::new(b), a < b);
    }

    /// Amounts encode as 32 fixed bytes through bincode.
    #[test]
    fn vote_amount_bincode_is_fixed_width(bytes in prop::array::uniform32(0u8..)) {
        let amount = VoteAmount::from_be_bytes(bytes);
        let encoded = bincode::serialize(&amount).unwrap();
        prop_assert_eq!(encoded.len(), 32);
        let decoded: VoteAmount = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, amount);
    }

    /// Any two 128-bit amounts sum without overflow, matching big-integer addition.
    #[test]
    fn vote_amount_checked_add(a in any::<u128>(), b in any::<u128>()) {
        let sum = VoteAmount::new(a).checked_add(VoteAmount::new(b)).unwrap();
        prop_assert_eq!(sum.to_biguint(), BigUint::from(a) + BigUint::from(b));
    }

    /// Decimal display parses back to the same amount.
    #[test]
    fn vote_amount_display_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let amount = VoteAmount::from_be_bytes(bytes);
        prop_assert_eq!(amount.to_string().parse::<VoteAmount>().unwrap(), amount);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Timestamp::new(a) <= Timestamp::new(b), a <= b);
    }

    /// checked_add_secs overflows exactly when u64 addition does.
    #[test]
    fn timestamp_checked_add(base in any::<u64>(), secs in any::<u64>()) {
        let t = Timestamp::new(base).checked_add_secs(secs);
        prop_assert_eq!(t.map(|t| t.as_secs()), base.checked_add(secs));
    }
}
