use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::grade::{Grade, PerformanceLevel};
use super::session::{Achievement, SessionSnapshot};
use crate::analysis::consistency::Recommendation;
use crate::analysis::{
    ConsistencyAnalysis, DirectionAnalysis, HarmonicCorrection, IntervalAnalysis, SpeedAnalysis, Trend,
};
use crate::config::ScoringWeights;
use crate::error::{ErrorKind, ScoringError};

/// One sung note, as measured by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptInput {
    /// Reference tone just played.
    pub base_freq: f64,
    /// Expected pitch for the current scale degree.
    pub target_freq: f64,
    /// Filtered pitch from the detector.
    pub detected_freq: f64,
    pub response_time_ms: f64,
    /// Input level, 0 to 100.
    pub volume: f64,
    /// Optional hint from an upstream octave-correction stage.
    #[serde(default)]
    pub correction: Option<HarmonicCorrection>,
}

impl AttemptInput {
    pub fn new(base_freq: f64, target_freq: f64, detected_freq: f64) -> Self {
        Self {
            base_freq,
            target_freq,
            detected_freq,
            response_time_ms: 0.0,
            volume: 50.0,
            correction: None,
        }
    }

    pub fn with_response_time(mut self, ms: f64) -> Self {
        self.response_time_ms = ms;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_correction(mut self, correction: HarmonicCorrection) -> Self {
        self.correction = Some(correction);
        self
    }
}

/// The five weighted components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    PitchAccuracy,
    RecognitionSpeed,
    IntervalMastery,
    DirectionAccuracy,
    Consistency,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::PitchAccuracy,
        Component::RecognitionSpeed,
        Component::IntervalMastery,
        Component::DirectionAccuracy,
        Component::Consistency,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Component::PitchAccuracy => "pitch accuracy",
            Component::RecognitionSpeed => "recognition speed",
            Component::IntervalMastery => "interval mastery",
            Component::DirectionAccuracy => "direction accuracy",
            Component::Consistency => "consistency",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub pitch_accuracy: f64,
    pub recognition_speed: f64,
    pub interval_mastery: f64,
    pub direction_accuracy: f64,
    pub consistency: f64,
}

impl ComponentScores {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::PitchAccuracy => self.pitch_accuracy,
            Component::RecognitionSpeed => self.recognition_speed,
            Component::IntervalMastery => self.interval_mastery,
            Component::DirectionAccuracy => self.direction_accuracy,
            Component::Consistency => self.consistency,
        }
    }

    /// Σ component × weight, before the volume multiplier.
    pub fn weighted_sum(&self, weights: &ScoringWeights) -> f64 {
        self.pitch_accuracy * weights.pitch_accuracy
            + self.recognition_speed * weights.recognition_speed
            + self.interval_mastery * weights.interval_mastery
            + self.direction_accuracy * weights.direction_accuracy
            + self.consistency * weights.consistency
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegratedScore {
    pub total: f64,
    pub components: ComponentScores,
    pub weights: ScoringWeights,
    pub volume_multiplier: f64,
    pub grade: Grade,
}

/// Per-analyzer output for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptBreakdown {
    /// The frequency actually scored (raw or hint-corrected).
    pub scored_freq: f64,
    pub correction_applied: bool,
    pub interval: IntervalAnalysis,
    pub direction: DirectionAnalysis,
    pub consistency: ConsistencyAnalysis,
    pub speed: SpeedAnalysis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEvaluation {
    pub level: PerformanceLevel,
    /// Components scoring 85 or more.
    pub strengths: Vec<Component>,
    /// Components scoring below 60.
    pub weaknesses: Vec<Component>,
    pub improvement_trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Interval,
    Direction,
    Consistency,
    Speed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectFeedback {
    pub aspect: Aspect,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub primary: String,
    pub details: Vec<AspectFeedback>,
    pub recommendations: Vec<Recommendation>,
    pub encouragement: String,
    pub next_step: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScoreStatus {
    #[default]
    Ok,
    Error { kind: ErrorKind, message: String },
}

/// Everything the engine reports for one attempt. Always fully populated,
/// including on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub status: ScoreStatus,
    pub breakdown: AttemptBreakdown,
    pub score: IntegratedScore,
    pub performance: PerformanceEvaluation,
    pub feedback: Feedback,
    pub session: SessionSnapshot,
    /// Achievements first unlocked by this attempt.
    pub new_achievements: Vec<Achievement>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ScoreResult {
    /// Zeroed, grade-F result describing why scoring failed.
    pub fn error(
        err: &ScoringError,
        weights: ScoringWeights,
        session: SessionSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        let message = err.to_string();
        let next_step = match err.kind() {
            ErrorKind::InvalidInput => "Check the microphone and sing the note again.",
            ErrorKind::InternalComputation => "Try the note again. If this keeps happening, restart the session.",
        };
        Self {
            status: ScoreStatus::Error {
                kind: err.kind(),
                message: message.clone(),
            },
            score: IntegratedScore {
                total: 0.0,
                components: ComponentScores::default(),
                weights,
                volume_multiplier: 1.0,
                grade: Grade::F,
            },
            performance: PerformanceEvaluation {
                level: PerformanceLevel::Poor,
                strengths: Vec::new(),
                weaknesses: Vec::new(),
                improvement_trend: Trend::InsufficientData,
            },
            feedback: Feedback {
                primary: format!("This attempt could not be scored: {message}"),
                details: Vec::new(),
                recommendations: Vec::new(),
                encouragement: "No harm done. Give it another go.".into(),
                next_step: next_step.into(),
            },
            session,
            timestamp: Some(now),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, ScoreStatus::Ok)
    }
}
