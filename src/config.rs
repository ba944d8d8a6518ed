use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Application configuration, loaded from config.toml.
///
/// serde's `default` attribute means: if a field is missing from the TOML file,
/// use the value from the Default implementation instead of failing to parse.
/// This makes the config file optional: every field has a sensible default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scoring: ScoringConfig,
    pub consistency: ConsistencyConfig,
    pub mastery: MasteryConfig,
}

/// Everything the integrating engine needs to turn component scores into
/// one total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub speed: SpeedThresholds,
    pub volume: VolumeConfig,
    /// Upper bound accepted for `response_time_ms`.
    pub max_response_time_ms: f64,
    /// Maximum number of totals kept in the session performance history.
    pub history_capacity: usize,
    /// How far (in semitones) an upstream correction hint may disagree with
    /// `raw × correction` before it is ignored.
    pub hint_tolerance_semitones: f64,
}

/// Relative importance of each component. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub pitch_accuracy: f64,
    pub recognition_speed: f64,
    pub interval_mastery: f64,
    pub direction_accuracy: f64,
    pub consistency: f64,
}

/// Latency upper bounds (ms, inclusive) for each speed rating.
/// Anything slower than `poor_ms` is rated very poor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedThresholds {
    pub excellent_ms: f64,
    pub good_ms: f64,
    pub fair_ms: f64,
    pub poor_ms: f64,
}

/// Volume-based multiplier applied after weighting.
/// Very quiet singing is hard to judge; very loud singing tends to go sharp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub quiet_below: f64,
    pub quiet_multiplier: f64,
    pub loud_above: f64,
    pub loud_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Number of recent global attempts used for overall consistency,
    /// stability trend and concentration.
    pub window: usize,
    /// Per-interval and global history bound.
    pub max_history: usize,
    /// Attempts needed before statistics are reported.
    pub min_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryConfig {
    /// Size of the per-category recent-accuracy ring buffer.
    pub recent_capacity: usize,
}

// --- Default implementations ---

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            speed: SpeedThresholds::default(),
            volume: VolumeConfig::default(),
            max_response_time_ms: 30_000.0,
            history_capacity: 50,
            hint_tolerance_semitones: 0.5,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            pitch_accuracy: 0.40,
            recognition_speed: 0.20,
            interval_mastery: 0.20,
            direction_accuracy: 0.10,
            consistency: 0.10,
        }
    }
}

impl Default for SpeedThresholds {
    fn default() -> Self {
        Self {
            excellent_ms: 1000.0,
            good_ms: 2000.0,
            fair_ms: 3000.0,
            poor_ms: 5000.0,
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            quiet_below: 20.0,
            quiet_multiplier: 0.8,
            loud_above: 80.0,
            loud_multiplier: 0.95,
        }
    }
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            window: 10,
            max_history: 100,
            min_attempts: 3,
        }
    }
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self { recent_capacity: 10 }
    }
}

/// Floating-point slack allowed when checking that weights sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl ScoringWeights {
    /// Weights paired with their names, in reporting order.
    pub fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("pitch_accuracy", self.pitch_accuracy),
            ("recognition_speed", self.recognition_speed),
            ("interval_mastery", self.interval_mastery),
            ("direction_accuracy", self.direction_accuracy),
            ("consistency", self.consistency),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.named().iter().map(|(_, w)| w).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.named() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::WeightOutOfRange { name, value });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSum { sum });
        }
        Ok(())
    }
}

impl SpeedThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.excellent_ms > 0.0
            && self.excellent_ms < self.good_ms
            && self.good_ms < self.fair_ms
            && self.fair_ms < self.poor_ms;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::UnorderedSpeedThresholds)
        }
    }
}

impl VolumeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("volume.quiet_multiplier", self.quiet_multiplier),
            ("volume.loud_multiplier", self.loud_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    expected: "in (0, 1]",
                });
            }
        }
        for (name, value) in [
            ("volume.quiet_below", self.quiet_below),
            ("volume.loud_above", self.loud_above),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    expected: "between 0 and 100",
                });
            }
        }
        if self.quiet_below > self.loud_above {
            return Err(ConfigError::UnorderedVolumeThresholds);
        }
        Ok(())
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.speed.validate()?;
        self.volume.validate()?;
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "scoring.history_capacity",
            });
        }
        if !self.max_response_time_ms.is_finite() || self.max_response_time_ms <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "scoring.max_response_time_ms",
                value: self.max_response_time_ms,
                expected: "finite and above 0",
            });
        }
        if !self.hint_tolerance_semitones.is_finite() || self.hint_tolerance_semitones < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "scoring.hint_tolerance_semitones",
                value: self.hint_tolerance_semitones,
                expected: "finite and at least 0",
            });
        }
        Ok(())
    }
}

impl ConsistencyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "consistency.window",
            });
        }
        if self.max_history == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "consistency.max_history",
            });
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.consistency.validate()?;
        if self.mastery.recent_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "mastery.recent_capacity",
            });
        }
        Ok(())
    }
}

/// Load the application config from $XDG_CONFIG_HOME/intervo/config.toml.
/// If the file doesn't exist, returns defaults.
pub fn load_config() -> Result<AppConfig> {
    let path = paths::config_file();

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&contents)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Parse and validate a TOML config string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scoring.weights.pitch_accuracy, 0.40);
        assert_eq!(cfg.scoring.speed.excellent_ms, 1000.0);
        assert_eq!(cfg.consistency.window, 10);
        assert_eq!(cfg.mastery.recent_capacity, 10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!((ScoringWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parse_partial_toml() {
        // If the user only specifies some fields, the rest should use defaults
        let toml_str = r#"
[consistency]
window = 6
"#;
        let cfg = parse_config(toml_str).unwrap();
        assert_eq!(cfg.consistency.window, 6);
        // Unspecified fields should be defaults
        assert_eq!(cfg.consistency.max_history, 100);
        assert_eq!(cfg.scoring.weights.consistency, 0.10);
    }

    #[test]
    fn rejects_weights_that_do_not_sum() {
        let toml_str = r#"
[scoring.weights]
pitch_accuracy = 0.9
"#;
        let err = parse_config(toml_str).unwrap_err();
        assert!(format!("{err:#}").contains("sum to 1.0"));
    }

    #[test]
    fn accepts_rebalanced_weights() {
        let toml_str = r#"
[scoring.weights]
pitch_accuracy = 0.5
recognition_speed = 0.1
interval_mastery = 0.2
direction_accuracy = 0.1
consistency = 0.1
"#;
        let cfg = parse_config(toml_str).unwrap();
        assert_eq!(cfg.scoring.weights.pitch_accuracy, 0.5);
    }

    #[test]
    fn rejects_negative_weight() {
        let weights = ScoringWeights {
            pitch_accuracy: 0.6,
            consistency: -0.1,
            ..ScoringWeights::default()
        };
        assert_eq!(
            weights.validate(),
            Err(ConfigError::WeightOutOfRange {
                name: "consistency",
                value: -0.1
            })
        );
    }

    #[test]
    fn rejects_unordered_speed_thresholds() {
        let speed = SpeedThresholds {
            good_ms: 500.0,
            ..SpeedThresholds::default()
        };
        assert_eq!(speed.validate(), Err(ConfigError::UnorderedSpeedThresholds));
    }

    #[test]
    fn rejects_bad_volume_multipliers() {
        let mut cfg = AppConfig::default();
        cfg.scoring.volume.quiet_multiplier = f64::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                name: "volume.quiet_multiplier",
                ..
            })
        ));

        let mut cfg = AppConfig::default();
        cfg.scoring.volume.loud_multiplier = 3.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                name: "volume.loud_multiplier",
                ..
            })
        ));
    }

    #[test]
    fn rejects_crossed_volume_thresholds() {
        let toml_str = r#"
[scoring.volume]
quiet_below = 90.0
loud_above = 10.0
"#;
        let err = parse_config(toml_str).unwrap_err();
        assert!(format!("{err:#}").contains("quiet_below"));
    }

    #[test]
    fn rejects_bad_tolerance_and_response_limit() {
        let mut cfg = AppConfig::default();
        cfg.scoring.hint_tolerance_semitones = -0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.scoring.max_response_time_ms = f64::INFINITY;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_window() {
        let mut cfg = AppConfig::default();
        cfg.consistency.window = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let loaded = parse_config(&toml_str).unwrap();
        assert_eq!(loaded.scoring.weights, cfg.scoring.weights);
        assert_eq!(loaded.scoring.volume, cfg.scoring.volume);
    }
}
