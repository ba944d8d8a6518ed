use serde::{Deserialize, Serialize};

/// Reasons the scoring pipeline refuses or fails an attempt.
///
/// None of these ever escape the engine as a panic or an `Err` to the
/// caller: `ScoringEngine::analyze` folds them into an error-shaped
/// `ScoreResult` so UI code only has one failure shape to render.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("{field} must be a finite frequency above 0 Hz (got {value})")]
    InvalidFrequency { field: &'static str, value: f64 },

    #[error("response time must be between 0 and {max_ms} ms (got {value})")]
    InvalidResponseTime { value: f64, max_ms: f64 },

    #[error("volume must be between 0 and 100 (got {value})")]
    InvalidVolume { value: f64 },

    #[error("internal scoring error: {0}")]
    Internal(String),
}

impl ScoringError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoringError::InvalidFrequency { .. }
            | ScoringError::InvalidResponseTime { .. }
            | ScoringError::InvalidVolume { .. } => ErrorKind::InvalidInput,
            ScoringError::Internal(_) => ErrorKind::InternalComputation,
        }
    }
}

/// Coarse failure category carried in an error-shaped result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    InternalComputation,
}

/// Problems found while validating a scoring configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("scoring weights must sum to 1.0 (got {sum:.4})")]
    WeightsDoNotSum { sum: f64 },

    #[error("scoring weight `{name}` must be between 0 and 1 (got {value})")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("speed thresholds must be positive and strictly increasing")]
    UnorderedSpeedThresholds,

    #[error("{name} must be greater than zero")]
    ZeroCapacity { name: &'static str },

    #[error("{name} must be {expected} (got {value})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("volume.quiet_below must not exceed volume.loud_above")]
    UnorderedVolumeThresholds,
}

/// Problems building a scale or training session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScaleError {
    #[error("unrecognized note name `{0}` (expected something like C4, F#3 or Bb4)")]
    InvalidNoteName(String),

    #[error("base frequency must be finite and above 0 Hz (got {0})")]
    InvalidBaseFrequency(f64),

    #[error("scale degree {0} is out of range (1 to 8)")]
    InvalidDegree(usize),

    #[error("all eight degrees have already been sung")]
    SessionComplete,

    #[error("session finished with {sung} of 8 degrees sung")]
    SessionIncomplete { sung: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_kinds() {
        let err = ScoringError::InvalidFrequency {
            field: "base_freq",
            value: -1.0,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("base_freq"));

        let err = ScoringError::InvalidResponseTime {
            value: 40_000.0,
            max_ms: 30_000.0,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn internal_kind() {
        let err = ScoringError::Internal("boom".into());
        assert_eq!(err.kind(), ErrorKind::InternalComputation);
        assert_eq!(err.to_string(), "internal scoring error: boom");
    }
}
