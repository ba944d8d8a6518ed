use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};

use super::feedback;
use super::grade::{Grade, PerformanceLevel};
use super::result::{
    AttemptBreakdown, AttemptInput, Component, ComponentScores, IntegratedScore, PerformanceEvaluation,
    ScoreResult, ScoreStatus,
};
use super::session::SessionState;
use crate::analysis::{evaluate_speed, ConsistencyTracker, DirectionClassifier, IntervalClassifier};
use crate::config::{AppConfig, ScoringConfig};
use crate::error::{ConfigError, ScoringError};
use crate::util;

/// Components at or above this score are listed as strengths.
const STRENGTH_THRESHOLD: f64 = 85.0;

/// Components below this score are listed as weaknesses.
const WEAKNESS_THRESHOLD: f64 = 60.0;

/// Octave shifts an upstream correction hint may apply.
const MIN_HINT_OCTAVES: f64 = -1.0;
const MAX_HINT_OCTAVES: f64 = 2.0;

/// Integrates the analyzers into one score per attempt.
///
/// The engine owns its analyzers and the session state outright; nothing is
/// shared globally. Every call to `analyze` returns a complete `ScoreResult`,
/// even for bad input or an internal failure.
///
/// All mutation goes through `&mut self`, so a multi-threaded host has to
/// wrap the engine in a `Mutex` (or keep it on one thread) to serialize
/// attempts.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    interval: IntervalClassifier,
    direction: DirectionClassifier,
    consistency: ConsistencyTracker,
    session: SessionState,
}

impl ScoringEngine {
    /// Build an engine with freshly constructed analyzers.
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::with_analyzers(
            config.scoring.clone(),
            IntervalClassifier::new(config.mastery.recent_capacity),
            DirectionClassifier::new(config.mastery.recent_capacity),
            ConsistencyTracker::new(config.consistency.clone()),
        )
    }

    /// Build an engine around caller-supplied analyzers.
    pub fn with_analyzers(
        config: ScoringConfig,
        interval: IntervalClassifier,
        direction: DirectionClassifier,
        consistency: ConsistencyTracker,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let session = SessionState::new(config.history_capacity);
        Ok(Self {
            config,
            interval,
            direction,
            consistency,
            session,
        })
    }

    pub fn analyze(&mut self, input: &AttemptInput) -> ScoreResult {
        self.analyze_at(input, Utc::now())
    }

    /// Score one attempt at an explicit point in time.
    pub fn analyze_at(&mut self, input: &AttemptInput, now: DateTime<Utc>) -> ScoreResult {
        if let Err(err) = self.validate(input) {
            tracing::warn!(error = %err, "rejected attempt");
            return self.error_result(&err, now);
        }

        // A failed attempt must leave no trace in any analyzer.
        let checkpoint = self.checkpoint();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.score_attempt(input, now)));

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                tracing::error!(error = %err, "scoring failed");
                self.restore(checkpoint);
                self.error_result(&err, now)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(%message, "scoring pipeline panicked");
                self.restore(checkpoint);
                self.error_result(&ScoringError::Internal(message), now)
            }
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn interval_classifier(&self) -> &IntervalClassifier {
        &self.interval
    }

    pub fn direction_classifier(&self) -> &DirectionClassifier {
        &self.direction
    }

    pub fn consistency_tracker(&self) -> &ConsistencyTracker {
        &self.consistency
    }

    /// Clear all three analyzers and the session together.
    pub fn reset(&mut self) {
        self.interval.reset();
        self.direction.reset();
        self.consistency.reset();
        self.session.reset();
        tracing::debug!("scoring engine reset");
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            interval: self.interval.clone(),
            direction: self.direction.clone(),
            consistency: self.consistency.clone(),
            session: self.session.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.interval = checkpoint.interval;
        self.direction = checkpoint.direction;
        self.consistency = checkpoint.consistency;
        self.session = checkpoint.session;
    }

    fn validate(&self, input: &AttemptInput) -> Result<(), ScoringError> {
        let frequencies = [
            ("base_freq", input.base_freq),
            ("target_freq", input.target_freq),
            ("detected_freq", input.detected_freq),
        ];
        for (field, value) in frequencies {
            if !util::is_valid_frequency(value) {
                return Err(ScoringError::InvalidFrequency { field, value });
            }
        }

        let max_ms = self.config.max_response_time_ms;
        if !input.response_time_ms.is_finite() || !(0.0..=max_ms).contains(&input.response_time_ms) {
            return Err(ScoringError::InvalidResponseTime {
                value: input.response_time_ms,
                max_ms,
            });
        }

        if !input.volume.is_finite() || !(0.0..=100.0).contains(&input.volume) {
            return Err(ScoringError::InvalidVolume { value: input.volume });
        }

        Ok(())
    }

    /// Use the upstream hint when it moves the raw reading by whole octaves
    /// (within tolerance), otherwise fall back to the raw reading.
    fn resolve_frequency(&self, input: &AttemptInput) -> (f64, bool) {
        let raw = input.detected_freq;
        let Some(hint) = input.correction else {
            return (raw, false);
        };

        let tolerance = self.config.hint_tolerance_semitones;
        let plausible = hint.correction.is_finite()
            && hint.correction > 0.0
            && util::is_valid_frequency(hint.corrected_frequency)
            && {
                let octaves = hint.correction.log2();
                let shift = octaves.round();
                let expected = raw * 2f64.powf(shift);
                (MIN_HINT_OCTAVES..=MAX_HINT_OCTAVES).contains(&shift)
                    && (12.0 * (octaves - shift)).abs() <= tolerance
                    && util::semitones_between(expected, hint.corrected_frequency).abs() <= tolerance
            };

        if plausible {
            (hint.corrected_frequency, hint.correction != 1.0)
        } else {
            tracing::debug!(
                raw,
                corrected = hint.corrected_frequency,
                factor = hint.correction,
                "ignoring implausible correction hint"
            );
            (raw, false)
        }
    }

    fn score_attempt(&mut self, input: &AttemptInput, now: DateTime<Utc>) -> Result<ScoreResult, ScoringError> {
        let (scored_freq, correction_applied) = self.resolve_frequency(input);

        // The three analyses don't read each other's output.
        let interval = self
            .interval
            .analyze_at(input.base_freq, input.target_freq, scored_freq, now);
        let direction = self
            .direction
            .analyze_at(input.base_freq, input.target_freq, scored_freq, now);
        let target_interval = interval
            .target_interval
            .ok_or_else(|| ScoringError::Internal("interval analysis produced no target".into()))?;
        let consistency = self.consistency.record_attempt_at(
            target_interval,
            interval.cents_error,
            interval.accuracy,
            input.response_time_ms,
            now,
        );
        let speed = evaluate_speed(input.response_time_ms, &self.config.speed);

        // Too few attempts to measure spread: the component follows pitch
        // accuracy and is not judged on its own.
        let consistency_score = if consistency.insufficient_data {
            interval.accuracy
        } else {
            consistency.interval_stats.consistency_score
        };
        let components = ComponentScores {
            pitch_accuracy: interval.accuracy,
            recognition_speed: speed.score,
            interval_mastery: util::clamp_score(interval.mastery.average_accuracy),
            direction_accuracy: direction.accuracy,
            consistency: consistency_score,
        };
        let judged: Vec<Component> = Component::ALL
            .into_iter()
            .filter(|&c| !(c == Component::Consistency && consistency.insufficient_data))
            .collect();

        let weighted = components.weighted_sum(&self.config.weights);
        let volume_multiplier = self.volume_multiplier(input.volume);
        let total = weighted * volume_multiplier;
        if !total.is_finite() {
            return Err(ScoringError::Internal(format!("non-finite total score ({total})")));
        }
        let total = util::clamp_score(total);
        let grade = Grade::from_score(total);

        let new_achievements = self.session.record(total, now);

        let performance = PerformanceEvaluation {
            level: PerformanceLevel::from_score(total),
            strengths: judged
                .iter()
                .copied()
                .filter(|&c| components.get(c) >= STRENGTH_THRESHOLD)
                .collect(),
            weaknesses: judged
                .iter()
                .copied()
                .filter(|&c| components.get(c) < WEAKNESS_THRESHOLD)
                .collect(),
            improvement_trend: self.session.improvement_trend(),
        };

        let breakdown = AttemptBreakdown {
            scored_freq,
            correction_applied,
            interval,
            direction,
            consistency,
            speed,
        };
        let feedback = feedback::compose(&breakdown, &performance, &new_achievements);

        tracing::debug!(
            total,
            grade = %grade,
            interval = target_interval.short_name(),
            correction_applied,
            "attempt scored"
        );

        let result = ScoreResult {
            status: ScoreStatus::Ok,
            breakdown,
            score: IntegratedScore {
                total,
                components,
                weights: self.config.weights,
                volume_multiplier,
                grade,
            },
            performance,
            feedback,
            session: self.session.snapshot(now),
            new_achievements,
            timestamp: Some(now),
        };
        self.session.set_last_result(result.clone());
        Ok(result)
    }

    fn volume_multiplier(&self, volume: f64) -> f64 {
        let v = &self.config.volume;
        if volume < v.quiet_below {
            v.quiet_multiplier
        } else if volume > v.loud_above {
            v.loud_multiplier
        } else {
            1.0
        }
    }

    fn error_result(&self, err: &ScoringError, now: DateTime<Utc>) -> ScoreResult {
        ScoreResult::error(err, self.config.weights, self.session.snapshot(now), now)
    }
}

/// Analyzer and session state captured before an attempt.
struct Checkpoint {
    interval: IntervalClassifier,
    direction: DirectionClassifier,
    consistency: ConsistencyTracker,
    session: SessionState,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::consistency::RecommendationKind;
    use crate::analysis::{Direction, HarmonicCorrection, IntervalType, Trend};
    use crate::error::ErrorKind;
    use crate::scoring::session::Achievement;

    fn engine() -> ScoringEngine {
        ScoringEngine::new(&AppConfig::default()).unwrap()
    }

    fn above(base: f64, semitones: f64) -> f64 {
        base * 2f64.powf(semitones / 12.0)
    }

    #[test]
    fn perfect_major_third() {
        let mut e = engine();
        let input = AttemptInput::new(440.0, 554.37, 554.37)
            .with_response_time(800.0)
            .with_volume(60.0);
        let result = e.analyze(&input);

        assert!(result.is_ok());
        assert_eq!(result.score.components.pitch_accuracy, 100.0);
        assert_eq!(result.score.components.recognition_speed, 100.0);
        assert!(result.score.grade >= Grade::A);
        assert_eq!(
            result.breakdown.interval.target_interval,
            Some(IntervalType::MajorThird)
        );
        assert_eq!(result.performance.level, PerformanceLevel::Excellent);
        // Consistency is not judged on a single attempt
        assert_eq!(result.performance.strengths.len(), 4);
        assert!(!result.performance.strengths.contains(&Component::Consistency));
        assert!(result.performance.weaknesses.is_empty());
        assert!(result.new_achievements.contains(&Achievement::FirstAttempt));
        assert_eq!(result.session.total_attempts, 1);
    }

    #[test]
    fn wrong_direction_scenario() {
        let mut e = engine();
        let input = AttemptInput::new(349.23, 293.66, 415.30)
            .with_response_time(1500.0)
            .with_volume(50.0);
        let result = e.analyze(&input);

        let direction = &result.breakdown.direction;
        assert!(!direction.direction_correct);
        assert_eq!(direction.target_direction, Some(Direction::Descending));
        assert!(direction.accuracy <= 30.0);
        assert!(direction.feedback.contains("Wrong direction"));
        assert!(result
            .performance
            .weaknesses
            .contains(&Component::DirectionAccuracy));
    }

    #[test]
    fn negative_base_is_error_result() {
        let mut e = engine();
        let input = AttemptInput::new(-1.0, 440.0, 440.0).with_response_time(500.0);
        let result = e.analyze(&input);

        assert!(!result.is_ok());
        assert_eq!(result.score.total, 0.0);
        assert_eq!(result.score.grade, Grade::F);
        match &result.status {
            ScoreStatus::Error { kind, message } => {
                assert_eq!(*kind, ErrorKind::InvalidInput);
                assert!(message.contains("base_freq"));
            }
            ScoreStatus::Ok => panic!("expected an error status"),
        }
        // Session state untouched
        assert_eq!(e.session().total_attempts(), 0);
        assert!(e.interval_classifier().mastery_report().is_empty());
    }

    #[test]
    fn no_pitch_sentinel_is_rejected() {
        let mut e = engine();
        let result = e.analyze(&AttemptInput::new(440.0, 440.0, 0.0).with_response_time(500.0));
        assert!(!result.is_ok());
        assert_eq!(e.consistency_tracker().total_attempts(), 0);
    }

    #[test]
    fn response_time_bounds() {
        let mut e = engine();
        let too_slow = AttemptInput::new(440.0, 440.0, 440.0).with_response_time(30_001.0);
        assert!(!e.analyze(&too_slow).is_ok());
        let negative = AttemptInput::new(440.0, 440.0, 440.0).with_response_time(-1.0);
        assert!(!e.analyze(&negative).is_ok());
        let edge = AttemptInput::new(440.0, 440.0, 440.0).with_response_time(30_000.0);
        assert!(e.analyze(&edge).is_ok());
    }

    #[test]
    fn volume_multipliers() {
        let mut e = engine();
        let quiet = e.analyze(&AttemptInput::new(440.0, 440.0, 440.0).with_volume(10.0));
        assert_eq!(quiet.score.volume_multiplier, 0.8);
        assert!((quiet.score.total - 80.0).abs() < 1e-9);

        let mut e = engine();
        let loud = e.analyze(&AttemptInput::new(440.0, 440.0, 440.0).with_volume(90.0));
        assert_eq!(loud.score.volume_multiplier, 0.95);
        assert!((loud.score.total - 95.0).abs() < 1e-9);

        let mut e = engine();
        let normal = e.analyze(&AttemptInput::new(440.0, 440.0, 440.0).with_volume(50.0));
        assert_eq!(normal.score.volume_multiplier, 1.0);
        assert!((normal.score.total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn plausible_hint_is_applied() {
        let mut e = engine();
        let base = 261.63;
        let target = above(base, 4.0);
        let hint = HarmonicCorrection {
            corrected_frequency: target,
            correction: 2.0,
        };
        let input = AttemptInput::new(base, target, target / 2.0)
            .with_response_time(900.0)
            .with_correction(hint);
        let result = e.analyze(&input);
        assert!(result.breakdown.correction_applied);
        assert!((result.breakdown.scored_freq - target).abs() < 1e-9);
        // Direction judged on the corrected pitch
        assert!(result.breakdown.direction.direction_correct);
    }

    #[test]
    fn implausible_hint_is_ignored() {
        let mut e = engine();
        let hint = HarmonicCorrection {
            corrected_frequency: 700.0,
            correction: 2.0,
        };
        let input = AttemptInput::new(440.0, 440.0, 440.0).with_correction(hint);
        let result = e.analyze(&input);
        assert!(!result.breakdown.correction_applied);
        assert_eq!(result.breakdown.scored_freq, 440.0);
    }

    #[test]
    fn non_octave_hint_is_ignored() {
        let mut e = engine();
        let target = above(440.0, 4.0);
        // 97 Hz × 5.715 lands on the target, but no detector errs by that factor
        let hint = HarmonicCorrection {
            corrected_frequency: target,
            correction: 5.715,
        };
        let input = AttemptInput::new(440.0, target, 97.0).with_correction(hint);
        let result = e.analyze(&input);
        assert!(result.is_ok());
        assert!(!result.breakdown.correction_applied);
        assert_eq!(result.breakdown.scored_freq, 97.0);
        assert!(result.score.total < 50.0);
    }

    #[test]
    fn octave_hints_outside_range_are_ignored() {
        let mut e = engine();
        // Three octaves up is more than a detector slip
        let hint = HarmonicCorrection {
            corrected_frequency: 440.0,
            correction: 8.0,
        };
        let result = e.analyze(&AttemptInput::new(440.0, 440.0, 55.0).with_correction(hint));
        assert!(!result.breakdown.correction_applied);
        assert_eq!(result.breakdown.scored_freq, 55.0);

        let hint = HarmonicCorrection {
            corrected_frequency: 440.0,
            correction: 0.5,
        };
        let result = e.analyze(&AttemptInput::new(440.0, 440.0, 880.0).with_correction(hint));
        assert!(result.breakdown.correction_applied);
        assert_eq!(result.breakdown.scored_freq, 440.0);
    }

    #[test]
    fn first_attempt_consistency_is_not_judged() {
        let mut e = engine();
        let base = 440.0;
        let result = e.analyze(
            &AttemptInput::new(base, above(base, 4.0), above(base, 6.0)).with_response_time(800.0),
        );
        assert!(result.breakdown.consistency.insufficient_data);
        assert_eq!(
            result.score.components.consistency,
            result.score.components.pitch_accuracy
        );
        assert!(!result.performance.strengths.contains(&Component::Consistency));
        assert!(!result.performance.weaknesses.contains(&Component::Consistency));
        assert!(result
            .performance
            .strengths
            .contains(&Component::RecognitionSpeed));
    }

    #[test]
    fn consistency_is_judged_once_history_exists() {
        let mut e = engine();
        let target = above(440.0, 7.0);
        let mut last = ScoreResult::default();
        for _ in 0..3 {
            last = e.analyze(&AttemptInput::new(440.0, target, target).with_response_time(800.0));
        }
        assert!(!last.breakdown.consistency.insufficient_data);
        assert_eq!(last.score.components.consistency, 100.0);
        assert!(last.performance.strengths.contains(&Component::Consistency));
    }

    #[test]
    fn internal_failure_leaves_no_partial_state() {
        let mut e = engine();
        e.analyze(&AttemptInput::new(440.0, 554.37, 554.37));

        // Unreachable through validated config; forces the non-finite total guard.
        e.config.volume.quiet_multiplier = f64::NAN;
        let result = e.analyze(&AttemptInput::new(440.0, 659.26, 659.26).with_volume(10.0));
        match &result.status {
            ScoreStatus::Error { kind, message } => {
                assert_eq!(*kind, ErrorKind::InternalComputation);
                assert!(message.contains("non-finite"));
            }
            ScoreStatus::Ok => panic!("expected an error status"),
        }

        assert_eq!(e.session().total_attempts(), 1);
        assert_eq!(e.consistency_tracker().total_attempts(), 1);
        assert_eq!(e.interval_classifier().mastery_report().len(), 1);
        assert!(e
            .interval_classifier()
            .mastery(IntervalType::PerfectFifth)
            .is_none());
        let direction_attempts: u32 = e
            .direction_classifier()
            .mastery_report()
            .iter()
            .map(|(_, snap)| snap.attempts)
            .sum();
        assert_eq!(direction_attempts, 1);

        // The engine keeps working after the failure
        e.config.volume.quiet_multiplier = 0.8;
        let next = e.analyze(&AttemptInput::new(440.0, 659.26, 659.26));
        assert!(next.is_ok());
        assert_eq!(e.session().total_attempts(), 2);
        assert_eq!(e.consistency_tracker().total_attempts(), 2);
    }

    #[test]
    fn invalid_volume_config_rejected_at_construction() {
        let mut config = AppConfig::default();
        config.scoring.volume.quiet_multiplier = f64::NAN;
        assert!(matches!(
            ScoringEngine::new(&config),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn improvement_trend_over_session() {
        let mut e = engine();
        let base = 440.0;
        let target = above(base, 7.0);
        for detected in [above(base, 8.2), above(base, 8.2), above(base, 8.2)] {
            e.analyze(&AttemptInput::new(base, target, detected).with_response_time(4000.0));
        }
        let mut last = ScoreResult::default();
        for _ in 0..3 {
            last = e.analyze(&AttemptInput::new(base, target, target).with_response_time(800.0));
        }
        assert_eq!(last.performance.improvement_trend, Trend::Improving);
        assert!(e.session().achievements().contains(&Achievement::OnTheRise));
    }

    #[test]
    fn error_result_keeps_session_snapshot() {
        let mut e = engine();
        e.analyze(&AttemptInput::new(440.0, 440.0, 440.0));
        let result = e.analyze(&AttemptInput::new(440.0, f64::NAN, 440.0));
        assert!(!result.is_ok());
        assert_eq!(result.session.total_attempts, 1);
    }

    #[test]
    fn recommendations_include_weakness_suggestion() {
        let mut e = engine();
        let base = 440.0;
        let result = e.analyze(
            &AttemptInput::new(base, above(base, 4.0), above(base, 6.0)).with_response_time(6000.0),
        );
        assert!(result
            .feedback
            .recommendations
            .iter()
            .any(|r| r.kind == RecommendationKind::TargetedPractice));
        assert_eq!(result.feedback.details.len(), 4);
    }

    #[test]
    fn last_result_is_stored() {
        let mut e = engine();
        let result = e.analyze(&AttemptInput::new(440.0, 440.0, 440.0));
        assert_eq!(e.session().last_result(), Some(&result));
    }

    #[test]
    fn reset_cascades() {
        let mut e = engine();
        e.analyze(&AttemptInput::new(440.0, 554.37, 554.37));
        e.reset();
        assert_eq!(e.session().total_attempts(), 0);
        assert!(e.interval_classifier().mastery_report().is_empty());
        assert!(e.direction_classifier().mastery_report().is_empty());
        assert_eq!(e.consistency_tracker().total_attempts(), 0);
    }

    #[test]
    fn invalid_weights_rejected_at_construction() {
        let mut config = AppConfig::default();
        config.scoring.weights.pitch_accuracy = 0.9;
        assert!(matches!(
            ScoringEngine::new(&config),
            Err(ConfigError::WeightsDoNotSum { .. })
        ));
    }

    #[test]
    fn engine_can_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<ScoringEngine>();
    }

    #[test]
    fn panic_payloads_are_described() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
