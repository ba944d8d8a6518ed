use serde::{Deserialize, Serialize};

use crate::config::SpeedThresholds;

/// Ordinal latency rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedRating {
    Excellent,
    Good,
    Fair,
    Poor,
    #[default]
    VeryPoor,
}

impl SpeedRating {
    pub fn score(self) -> f64 {
        match self {
            SpeedRating::Excellent => 100.0,
            SpeedRating::Good => 85.0,
            SpeedRating::Fair => 70.0,
            SpeedRating::Poor => 50.0,
            SpeedRating::VeryPoor => 25.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedRating::Excellent => "excellent",
            SpeedRating::Good => "good",
            SpeedRating::Fair => "fair",
            SpeedRating::Poor => "poor",
            SpeedRating::VeryPoor => "very poor",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedAnalysis {
    pub response_time_ms: f64,
    pub rating: SpeedRating,
    pub score: f64,
    pub feedback: String,
}

/// Rate a response latency against the configured thresholds (inclusive).
pub fn evaluate_speed(response_time_ms: f64, thresholds: &SpeedThresholds) -> SpeedAnalysis {
    let rating = if response_time_ms <= thresholds.excellent_ms {
        SpeedRating::Excellent
    } else if response_time_ms <= thresholds.good_ms {
        SpeedRating::Good
    } else if response_time_ms <= thresholds.fair_ms {
        SpeedRating::Fair
    } else if response_time_ms <= thresholds.poor_ms {
        SpeedRating::Poor
    } else {
        SpeedRating::VeryPoor
    };

    let seconds = response_time_ms / 1000.0;
    let feedback = match rating {
        SpeedRating::Excellent => format!("Quick response ({seconds:.1}s)."),
        SpeedRating::Good => format!("Good response time ({seconds:.1}s)."),
        SpeedRating::Fair => format!("A bit hesitant ({seconds:.1}s). Try to hear the note before you sing."),
        SpeedRating::Poor | SpeedRating::VeryPoor => format!(
            "Slow response ({seconds:.1}s). Hum the scale up to the note in your head first."
        ),
    };

    SpeedAnalysis {
        response_time_ms,
        rating,
        score: rating.score(),
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_inclusive() {
        let t = SpeedThresholds::default();
        assert_eq!(evaluate_speed(0.0, &t).rating, SpeedRating::Excellent);
        assert_eq!(evaluate_speed(1000.0, &t).rating, SpeedRating::Excellent);
        assert_eq!(evaluate_speed(1000.1, &t).rating, SpeedRating::Good);
        assert_eq!(evaluate_speed(3000.0, &t).rating, SpeedRating::Fair);
        assert_eq!(evaluate_speed(4500.0, &t).rating, SpeedRating::Poor);
        assert_eq!(evaluate_speed(12_000.0, &t).rating, SpeedRating::VeryPoor);
    }

    #[test]
    fn scores_follow_rating() {
        let t = SpeedThresholds::default();
        assert_eq!(evaluate_speed(800.0, &t).score, 100.0);
        assert_eq!(evaluate_speed(1500.0, &t).score, 85.0);
        assert_eq!(evaluate_speed(2500.0, &t).score, 70.0);
        assert_eq!(evaluate_speed(4000.0, &t).score, 50.0);
        assert_eq!(evaluate_speed(9000.0, &t).score, 25.0);
    }

    #[test]
    fn custom_thresholds() {
        let t = SpeedThresholds {
            excellent_ms: 300.0,
            good_ms: 600.0,
            fair_ms: 900.0,
            poor_ms: 1200.0,
        };
        assert_eq!(evaluate_speed(800.0, &t).rating, SpeedRating::Fair);
    }
}
