//! Engine configuration.

use serde::{Deserialize, Serialize};

use super::board::BOARD_SIZE;

/// Default match ID length.
pub const DEFAULT_MATCH_ID_LENGTH: usize = 7;

/// Default time a finished match is kept before cleanup (30 seconds).
pub const DEFAULT_FINISHED_GRACE_SECS: u64 = 30;

/// Smallest board that can hold a winning line.
pub const MIN_BOARD_SIZE: usize = 5;

/// Shortest allowed match ID.
pub const MIN_MATCH_ID_LENGTH: usize = 4;

/// Longest grace period a finished match may be kept (one week).
pub const MAX_FINISHED_GRACE_SECS: u64 = 7 * 24 * 60 * 60;

/// Tunables for an [`Engine`](super::engine::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Board side length
    pub board_size: usize,
    /// Characters in a generated match ID
    pub match_id_length: usize,
    /// How long a finished match stays around before cleanup
    pub finished_grace_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE,
            match_id_length: DEFAULT_MATCH_ID_LENGTH,
            finished_grace_secs: DEFAULT_FINISHED_GRACE_SECS,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size < MIN_BOARD_SIZE {
            return Err(ConfigError::BoardTooSmall(self.board_size));
        }
        if self.match_id_length < MIN_MATCH_ID_LENGTH {
            return Err(ConfigError::MatchIdTooShort(self.match_id_length));
        }
        if self.finished_grace_secs > MAX_FINISHED_GRACE_SECS {
            return Err(ConfigError::GraceTooLong(self.finished_grace_secs));
        }
        Ok(())
    }

    /// Grace period as a duration, clamped to [`MAX_FINISHED_GRACE_SECS`].
    pub fn finished_grace(&self) -> chrono::Duration {
        let secs = self.finished_grace_secs.min(MAX_FINISHED_GRACE_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Board side {0} is smaller than {min}", min = MIN_BOARD_SIZE)]
    BoardTooSmall(usize),
    #[error("Match ID length {0} is shorter than {min}", min = MIN_MATCH_ID_LENGTH)]
    MatchIdTooShort(usize),
    #[error("Finished grace of {0}s exceeds {max}s", max = MAX_FINISHED_GRACE_SECS)]
    GraceTooLong(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.board_size, 24);
        assert_eq!(config.match_id_length, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(r#"{"finished_grace_secs": 5}"#).unwrap();
        assert_eq!(
            config,
            EngineConfig {
                finished_grace_secs: 5,
                ..EngineConfig::default()
            }
        );
        assert_eq!(config.finished_grace(), chrono::Duration::seconds(5));
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"board_size": 3}"#),
            Err(ConfigError::BoardTooSmall(3))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"match_id_length": 1}"#),
            Err(ConfigError::MatchIdTooShort(1))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"finished_grace_secs": 10000000000000}"#),
            Err(ConfigError::GraceTooLong(10_000_000_000_000))
        ));
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_grace_is_clamped() {
        let config = EngineConfig {
            finished_grace_secs: u64::MAX,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.finished_grace(),
            chrono::Duration::seconds(MAX_FINISHED_GRACE_SECS as i64)
        );

        let edge = EngineConfig {
            finished_grace_secs: MAX_FINISHED_GRACE_SECS,
            ..EngineConfig::default()
        };
        assert!(edge.validate().is_ok());
    }
}
