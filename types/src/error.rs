//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid candidate id {input:?}: {reason}")]
    InvalidCandidateId { input: String, reason: String },

    #[error("invalid vote amount {0:?}")]
    InvalidAmount(String),
}
