//! Round configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RoundsError;
use crate::median::{EliminationDirection, MedianInput};

/// Configuration supplied once, at initialization.
///
/// Can be loaded from a TOML file via [`RoundsConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundsConfig {
    /// Display name of this voting instance.
    #[serde(default)]
    pub name: String,

    /// Free-form metadata (e.g. a URI describing the vote).
    #[serde(default)]
    pub metadata: String,

    /// Length of the active window, in seconds.
    #[serde(default = "default_round_duration_secs")]
    pub round_duration_secs: u64,

    /// Gap between round creation and the start of voting, in seconds.
    #[serde(default)]
    pub round_delay_secs: u64,

    /// Which side of the threshold is eliminated at finalization.
    #[serde(default)]
    pub elimination: EliminationDirection,

    /// What the median is taken over when the threshold is computed.
    #[serde(default)]
    pub median_input: MedianInput,

    /// Total number of rounds that may ever be started.
    #[serde(default)]
    pub max_rounds: Option<u64>,

    /// Upper bound on the number of recipients in one ballot.
    #[serde(default = "default_max_recipients_per_ballot")]
    pub max_recipients_per_ballot: usize,

    /// Refuse to start a round while the previous one is unfinalized.
    #[serde(default = "default_true")]
    pub require_finalized_previous: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_round_duration_secs() -> u64 {
    60
}

fn default_max_recipients_per_ballot() -> usize {
    16
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl RoundsConfig {
    /// A default configuration with the given window lengths.
    pub fn with_timing(round_duration_secs: u64, round_delay_secs: u64) -> Self {
        Self {
            round_duration_secs,
            round_delay_secs,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RoundsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RoundsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string, then validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, RoundsError> {
        let config: Self =
            toml::from_str(s).map_err(|e| RoundsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, RoundsError> {
        toml::to_string_pretty(self).map_err(|e| RoundsError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), RoundsError> {
        if self.round_duration_secs == 0 {
            return Err(RoundsError::InvalidConfig(
                "round_duration_secs must be greater than zero".into(),
            ));
        }
        if self.max_recipients_per_ballot == 0 {
            return Err(RoundsError::InvalidConfig(
                "max_recipients_per_ballot must be greater than zero".into(),
            ));
        }
        self.round_delay_secs
            .checked_add(self.round_duration_secs)
            .ok_or(RoundsError::WindowOverflow)?;
        Ok(())
    }

    /// `true` when candidates at or above the threshold are eliminated.
    pub fn eliminate_top(&self) -> bool {
        self.elimination.eliminate_top()
    }
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            metadata: String::new(),
            round_duration_secs: default_round_duration_secs(),
            round_delay_secs: 0,
            elimination: EliminationDirection::default(),
            median_input: MedianInput::default(),
            max_rounds: None,
            max_recipients_per_ballot: default_max_recipients_per_ballot(),
            require_finalized_previous: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = RoundsConfig::default();
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = RoundsConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = RoundsConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.round_duration_secs, 60);
        assert_eq!(config.round_delay_secs, 0);
        assert_eq!(config.elimination, EliminationDirection::EliminateBottom);
        assert_eq!(config.median_input, MedianInput::VoteEntries);
        assert!(config.require_finalized_previous);
        assert_eq!(config.max_rounds, None);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            name = "weekly"
            round_duration_secs = 3600
            round_delay_secs = 60
            elimination = "eliminate_top"
            median_input = "candidate_totals"
            max_rounds = 5
        "#;
        let config = RoundsConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.name, "weekly");
        assert_eq!(config.round_duration_secs, 3600);
        assert_eq!(config.round_delay_secs, 60);
        assert!(config.eliminate_top());
        assert_eq!(config.median_input, MedianInput::CandidateTotals);
        assert_eq!(config.max_rounds, Some(5));
        assert_eq!(config.max_recipients_per_ballot, 16);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = RoundsConfig::from_toml_str("round_duration_secs = 0").unwrap_err();
        assert!(matches!(err, RoundsError::InvalidConfig(_)));
    }

    #[test]
    fn overflowing_window_is_rejected() {
        let config = RoundsConfig {
            round_delay_secs: u64::MAX,
            ..RoundsConfig::default()
        };
        assert_eq!(config.validate(), Err(RoundsError::WindowOverflow));
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let err = RoundsConfig::from_toml_str(r#"elimination = "sideways""#).unwrap_err();
        assert!(matches!(err, RoundsError::InvalidConfig(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "round_duration_secs = 120").expect("write");
        let config = RoundsConfig::from_toml_file(file.path()).expect("should load");
        assert_eq!(config.round_duration_secs, 120);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let err = RoundsConfig::from_toml_file("/nonexistent/rounds.toml").unwrap_err();
        assert!(matches!(err, RoundsError::InvalidConfig(_)));
    }
}
