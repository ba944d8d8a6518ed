use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mastery::{MasteryKey, MasteryLevel, MasterySnapshot, MasteryTable};
use crate::util;

/// Signed distances within this band count as staying on the base tone.
const UNISON_BAND_SEMITONES: f64 = 0.5;

/// Misses at or beyond this distance are flagged as over/undershoot.
const DISTANCE_ERROR_SEMITONES: f64 = 1.5;

/// Misses at or beyond this distance are severe.
const SEVERE_ERROR_SEMITONES: f64 = 3.0;

/// Which way a pitch moves relative to the base tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
    Unison,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Ascending, Direction::Descending, Direction::Unison];

    /// Classify a signed semitone distance from the base.
    pub fn from_semitones(semitones: f64) -> Self {
        if semitones.abs() <= UNISON_BAND_SEMITONES {
            Direction::Unison
        } else if semitones > 0.0 {
            Direction::Ascending
        } else {
            Direction::Descending
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Ascending => "ascending",
            Direction::Descending => "descending",
            Direction::Unison => "unison",
        }
    }

    fn motion(self) -> &'static str {
        match self {
            Direction::Ascending => "up",
            Direction::Descending => "down",
            Direction::Unison => "nowhere",
        }
    }
}

impl MasteryKey for Direction {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Direction::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceErrorKind {
    /// Sang farther from the base than the target.
    Overshoot,
    /// Stopped short of the target.
    Undershoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceError {
    pub kind: DistanceErrorKind,
    pub severity: Severity,
    pub semitones: f64,
}

/// Result of judging the direction of one sung note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionAnalysis {
    pub valid: bool,
    pub target_direction: Option<Direction>,
    pub detected_direction: Option<Direction>,
    /// Signed semitones from the base (no octave wrap).
    pub target_semitones: f64,
    pub detected_semitones: f64,
    /// detected − target, signed.
    pub semitone_error: f64,
    pub direction_correct: bool,
    pub accuracy: f64,
    pub distance_error: Option<DistanceError>,
    pub mastery: MasterySnapshot,
    pub feedback: String,
}

/// Judges ascending/descending motion and keeps per-direction mastery.
#[derive(Debug, Clone)]
pub struct DirectionClassifier {
    mastery: MasteryTable<Direction>,
}

impl DirectionClassifier {
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            mastery: MasteryTable::new(recent_capacity),
        }
    }

    pub fn analyze(&mut self, base_freq: f64, target_freq: f64, detected_freq: f64) -> DirectionAnalysis {
        self.analyze_at(base_freq, target_freq, detected_freq, Utc::now())
    }

    pub fn analyze_at(
        &mut self,
        base_freq: f64,
        target_freq: f64,
        detected_freq: f64,
        now: DateTime<Utc>,
    ) -> DirectionAnalysis {
        let usable = [base_freq, target_freq, detected_freq]
            .iter()
            .all(|&f| util::is_valid_frequency(f));
        if !usable {
            return DirectionAnalysis {
                feedback: "Could not detect a usable pitch to judge direction.".into(),
                ..DirectionAnalysis::default()
            };
        }

        let target_semitones = util::semitones_between(base_freq, target_freq);
        let detected_semitones = util::semitones_between(base_freq, detected_freq);
        let target_direction = Direction::from_semitones(target_semitones);
        let detected_direction = Direction::from_semitones(detected_semitones);
        let direction_correct = target_direction == detected_direction;

        let semitone_error = detected_semitones - target_semitones;
        let distance_error = classify_distance_error(target_semitones, detected_semitones);
        let accuracy = direction_accuracy(direction_correct, semitone_error);

        let record = self
            .mastery
            .record(target_direction, accuracy, direction_correct, now);
        let level = MasteryLevel::from_direction_stats(
            record.average_accuracy(),
            record.success_rate(),
            record.attempts(),
        );
        let mastery = record.snapshot(level);

        let feedback = direction_feedback(
            target_direction,
            detected_direction,
            target_semitones,
            semitone_error,
            accuracy,
            distance_error,
        );

        DirectionAnalysis {
            valid: true,
            target_direction: Some(target_direction),
            detected_direction: Some(detected_direction),
            target_semitones,
            detected_semitones,
            semitone_error,
            direction_correct,
            accuracy,
            distance_error,
            mastery,
            feedback,
        }
    }

    pub fn mastery(&self, direction: Direction) -> Option<MasterySnapshot> {
        self.mastery.get(direction).map(|r| {
            r.snapshot(MasteryLevel::from_direction_stats(
                r.average_accuracy(),
                r.success_rate(),
                r.attempts(),
            ))
        })
    }

    pub fn mastery_report(&self) -> Vec<(Direction, MasterySnapshot)> {
        Direction::ALL
            .iter()
            .filter_map(|&d| self.mastery(d).map(|snap| (d, snap)))
            .collect()
    }

    pub fn reset(&mut self) {
        self.mastery.reset();
    }
}

/// Wrong direction is capped hard; right direction loses 25 points per
/// semitone of distance error.
pub fn direction_accuracy(direction_correct: bool, semitone_error: f64) -> f64 {
    let miss = semitone_error.abs();
    let raw = if direction_correct {
        100.0 - 25.0 * miss
    } else {
        30.0 - 5.0 * miss
    };
    util::clamp_score(raw)
}

fn classify_distance_error(target_semitones: f64, detected_semitones: f64) -> Option<DistanceError> {
    let miss = (detected_semitones - target_semitones).abs();
    if miss < DISTANCE_ERROR_SEMITONES {
        return None;
    }
    let kind = if detected_semitones.abs() > target_semitones.abs() {
        DistanceErrorKind::Overshoot
    } else {
        DistanceErrorKind::Undershoot
    };
    let severity = if miss >= SEVERE_ERROR_SEMITONES {
        Severity::Severe
    } else {
        Severity::Moderate
    };
    Some(DistanceError {
        kind,
        severity,
        semitones: miss,
    })
}

fn direction_feedback(
    target: Direction,
    detected: Direction,
    target_semitones: f64,
    semitone_error: f64,
    accuracy: f64,
    distance_error: Option<DistanceError>,
) -> String {
    if target == detected {
        return match distance_error {
            None if accuracy >= 90.0 => "Right direction and right distance.".to_string(),
            None => format!(
                "Right direction, close to the target ({:+.1} semitones).",
                semitone_error
            ),
            Some(err) => {
                let how_far = match err.severity {
                    Severity::Severe => "well ",
                    Severity::Moderate => "",
                };
                let what = match err.kind {
                    DistanceErrorKind::Overshoot => "past",
                    DistanceErrorKind::Undershoot => "short of",
                };
                format!(
                    "Right direction, but you landed {how_far}{what} the target by {:.1} semitones.",
                    err.semitones
                )
            }
        };
    }

    if detected == Direction::Unison {
        return format!(
            "The change was too small to register. The target moves {} {:.0} semitones from the base.",
            target.motion(),
            target_semitones.abs()
        );
    }

    if target == Direction::Unison {
        return format!(
            "Wrong direction: the target repeats the base tone, but you moved {}.",
            detected.motion()
        );
    }

    format!(
        "Wrong direction: you sang {} but the target was {}.",
        detected.label(),
        target.label()
    )
}
