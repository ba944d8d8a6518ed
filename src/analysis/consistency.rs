use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interval::IntervalType;
use super::mastery::{MasteryKey, Trend};
use crate::config::ConsistencyConfig;
use crate::util;

/// Attempts compared on each side of the per-interval trend.
const INTERVAL_TREND_WINDOW: usize = 3;

/// Relative change in error needed before calling a trend.
const TREND_THRESHOLD: f64 = 0.10;

/// Stability confidence never exceeds this.
const MAX_TREND_CONFIDENCE: f64 = 0.9;

/// Errors this small (cents) are treated as the floor when computing
/// relative change, so near-perfect runs don't divide by ~0.
const MIN_ERROR_BASELINE: f64 = 1.0;

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyAttempt {
    pub interval: IntervalType,
    pub cents_diff: f64,
    pub accuracy: f64,
    pub response_time_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// Spread of the signed cents error over a set of attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyStats {
    pub count: usize,
    /// Mean signed error (positive = sharp).
    pub mean: f64,
    pub mean_abs_error: f64,
    pub std_dev: f64,
    pub variance: f64,
    /// max − min of the signed error.
    pub range: f64,
    /// max(0, 100 − 2 × std_dev)
    pub consistency_score: f64,
}

impl ConsistencyStats {
    pub fn from_cents(cents: &[f64]) -> Self {
        if cents.is_empty() {
            return Self::default();
        }
        let abs: Vec<f64> = cents.iter().map(|c| c.abs()).collect();
        let std_dev = util::std_dev(cents);
        let min = cents.iter().copied().fold(f64::INFINITY, f64::min);
        let max = cents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count: cents.len(),
            mean: util::mean(cents),
            mean_abs_error: util::mean(&abs),
            std_dev,
            variance: util::variance(cents),
            range: max - min,
            consistency_score: consistency_score(std_dev),
        }
    }
}

pub fn consistency_score(std_dev: f64) -> f64 {
    util::clamp_score(100.0 - 2.0 * std_dev)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLevel {
    #[default]
    None,
    Moderate,
    Tired,
    Exhausted,
}

impl FatigueLevel {
    fn from_minutes(minutes: f64) -> Self {
        if minutes > 90.0 {
            FatigueLevel::Exhausted
        } else if minutes > 60.0 {
            FatigueLevel::Tired
        } else if minutes > 30.0 {
            FatigueLevel::Moderate
        } else {
            FatigueLevel::None
        }
    }

    fn from_accuracy_drop(drop: f64) -> Self {
        if drop > 20.0 {
            FatigueLevel::Exhausted
        } else if drop > 10.0 {
            FatigueLevel::Tired
        } else if drop > 5.0 {
            FatigueLevel::Moderate
        } else {
            FatigueLevel::None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FatigueLevel::None => "fresh",
            FatigueLevel::Moderate => "moderate",
            FatigueLevel::Tired => "tired",
            FatigueLevel::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FatigueAssessment {
    /// The more severe of the two signals.
    pub level: FatigueLevel,
    pub session_minutes: f64,
    /// Overall mean accuracy minus recent-window mean accuracy.
    pub accuracy_drop: f64,
    pub from_duration: FatigueLevel,
    pub from_accuracy: FatigueLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concentration {
    #[default]
    High,
    Medium,
    Low,
    VeryLow,
}

impl Concentration {
    /// From the standard deviation of recent absolute cents error.
    fn from_spread(std_dev: f64) -> Self {
        if std_dev <= 15.0 {
            Concentration::High
        } else if std_dev <= 25.0 {
            Concentration::Medium
        } else if std_dev <= 40.0 {
            Concentration::Low
        } else {
            Concentration::VeryLow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Concentration::High => "high",
            Concentration::Medium => "medium",
            Concentration::Low => "low",
            Concentration::VeryLow => "very low",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityTrend {
    pub trend: Trend,
    /// Relative reduction in mean absolute error, older half → newer half.
    /// Positive means the error shrank.
    pub change: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Rest,
    Refocus,
    TargetedPractice,
    Encouragement,
}

/// Ordered so that sorting puts `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub message: String,
    pub interval: Option<IntervalType>,
}

impl Recommendation {
    pub fn new(kind: RecommendationKind, priority: Priority, message: impl Into<String>) -> Self {
        Self {
            kind,
            priority,
            message: message.into(),
            interval: None,
        }
    }

    pub fn for_interval(mut self, interval: IntervalType) -> Self {
        self.interval = Some(interval);
        self
    }
}

/// Everything the tracker knows after one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyAnalysis {
    pub interval: Option<IntervalType>,
    /// Statistics over the interval's available history.
    pub interval_stats: ConsistencyStats,
    /// True when the interval has fewer attempts than the configured minimum;
    /// `interval_stats` is then indicative only.
    pub insufficient_data: bool,
    pub interval_trend: Trend,
    /// None until the recent window holds enough attempts.
    pub overall_consistency: Option<f64>,
    pub stability: StabilityTrend,
    pub fatigue: FatigueAssessment,
    pub concentration: Concentration,
    pub recommendations: Vec<Recommendation>,
    pub total_attempts: u64,
    pub feedback: String,
}

/// Rolling history of attempts, per interval and globally.
#[derive(Debug, Clone)]
pub struct ConsistencyTracker {
    config: ConsistencyConfig,
    per_interval: Vec<VecDeque<ConsistencyAttempt>>,
    global: VecDeque<ConsistencyAttempt>,
    session_start: Option<DateTime<Utc>>,
    total_attempts: u64,
}

impl ConsistencyTracker {
    pub fn new(config: ConsistencyConfig) -> Self {
        Self {
            per_interval: vec![VecDeque::new(); IntervalType::COUNT],
            global: VecDeque::new(),
            session_start: None,
            total_attempts: 0,
            config,
        }
    }

    pub fn record_attempt(
        &mut self,
        interval: IntervalType,
        cents_diff: f64,
        accuracy: f64,
        response_time_ms: f64,
    ) -> ConsistencyAnalysis {
        self.record_attempt_at(interval, cents_diff, accuracy, response_time_ms, Utc::now())
    }

    pub fn record_attempt_at(
        &mut self,
        interval: IntervalType,
        cents_diff: f64,
        accuracy: f64,
        response_time_ms: f64,
        now: DateTime<Utc>,
    ) -> ConsistencyAnalysis {
        let attempt = ConsistencyAttempt {
            interval,
            cents_diff,
            accuracy: util::clamp_score(accuracy),
            response_time_ms,
            timestamp: now,
        };
        let max_history = self.config.max_history.max(1);

        let history = &mut self.per_interval[interval.index()];
        if history.len() == max_history {
            history.pop_front();
        }
        history.push_back(attempt.clone());

        if self.global.len() == max_history {
            self.global.pop_front();
        }
        self.global.push_back(attempt);

        self.total_attempts += 1;
        let session_start = *self.session_start.get_or_insert(now);

        let interval_cents: Vec<f64> = self.per_interval[interval.index()]
            .iter()
            .map(|a| a.cents_diff)
            .collect();
        let interval_stats = ConsistencyStats::from_cents(&interval_cents);
        let insufficient_data = interval_stats.count < self.config.min_attempts;
        let interval_trend = error_trend(&interval_cents);

        let overall_consistency = self.overall_consistency();
        let stability = self.stability_trend();
        let fatigue = self.fatigue(session_start, now);
        let concentration = self.concentration();

        let recommendations = self.recommendations(&fatigue, concentration, &stability);
        let feedback = consistency_feedback(&interval_stats, insufficient_data, interval);

        tracing::debug!(
            interval = interval.short_name(),
            cents_diff,
            score = interval_stats.consistency_score,
            fatigue = fatigue.level.label(),
            "consistency attempt recorded"
        );

        ConsistencyAnalysis {
            interval: Some(interval),
            interval_stats,
            insufficient_data,
            interval_trend,
            overall_consistency,
            stability,
            fatigue,
            concentration,
            recommendations,
            total_attempts: self.total_attempts,
            feedback,
        }
    }

    /// Statistics for one interval, or None if it was never attempted.
    pub fn interval_stats(&self, interval: IntervalType) -> Option<ConsistencyStats> {
        let history = &self.per_interval[interval.index()];
        if history.is_empty() {
            return None;
        }
        let cents: Vec<f64> = history.iter().map(|a| a.cents_diff).collect();
        Some(ConsistencyStats::from_cents(&cents))
    }

    /// Consistency score over the most recent window of attempts.
    pub fn overall_consistency(&self) -> Option<f64> {
        let recent = self.recent_window();
        if recent.len() < self.config.min_attempts.max(1) {
            return None;
        }
        let cents: Vec<f64> = recent.iter().map(|a| a.cents_diff).collect();
        Some(consistency_score(util::std_dev(&cents)))
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_attempts
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    pub fn reset(&mut self) {
        self.per_interval.iter_mut().for_each(VecDeque::clear);
        self.global.clear();
        self.session_start = None;
        self.total_attempts = 0;
    }

    fn recent_window(&self) -> Vec<&ConsistencyAttempt> {
        let skip = self.global.len().saturating_sub(self.config.window);
        self.global.iter().skip(skip).collect()
    }

    /// Older half of the recent window vs newer half, by mean absolute error.
    fn stability_trend(&self) -> StabilityTrend {
        let recent = self.recent_window();
        if recent.len() < self.config.min_attempts.max(4) {
            return StabilityTrend::default();
        }
        let abs: Vec<f64> = recent.iter().map(|a| a.cents_diff.abs()).collect();
        let mid = abs.len() / 2;
        let older = util::mean(&abs[..mid]);
        let newer = util::mean(&abs[mid..]);
        let change = (older - newer) / older.max(MIN_ERROR_BASELINE);

        let trend = if change > TREND_THRESHOLD {
            Trend::Improving
        } else if change < -TREND_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        };

        StabilityTrend {
            trend,
            change,
            confidence: change.abs().min(MAX_TREND_CONFIDENCE),
        }
    }

    fn fatigue(&self, session_start: DateTime<Utc>, now: DateTime<Utc>) -> FatigueAssessment {
        let session_minutes = ((now - session_start).num_milliseconds() as f64 / 60_000.0).max(0.0);

        // Needs history beyond the recent window to see a drop at all.
        let accuracy_drop = if self.global.len() > self.config.window {
            let all: Vec<f64> = self.global.iter().map(|a| a.accuracy).collect();
            let recent: Vec<f64> = self.recent_window().iter().map(|a| a.accuracy).collect();
            (util::mean(&all) - util::mean(&recent)).max(0.0)
        } else {
            0.0
        };

        let from_duration = FatigueLevel::from_minutes(session_minutes);
        let from_accuracy = FatigueLevel::from_accuracy_drop(accuracy_drop);

        FatigueAssessment {
            level: from_duration.max(from_accuracy),
            session_minutes,
            accuracy_drop,
            from_duration,
            from_accuracy,
        }
    }

    fn concentration(&self) -> Concentration {
        let abs: Vec<f64> = self
            .recent_window()
            .iter()
            .map(|a| a.cents_diff.abs())
            .collect();
        Concentration::from_spread(util::std_dev(&abs))
    }

    fn recommendations(
        &self,
        fatigue: &FatigueAssessment,
        concentration: Concentration,
        stability: &StabilityTrend,
    ) -> Vec<Recommendation> {
        let mut recs = Vec::new();

        match fatigue.level {
            FatigueLevel::Exhausted | FatigueLevel::Tired => recs.push(Recommendation::new(
                RecommendationKind::Rest,
                Priority::High,
                "Take a break. Your voice and ears need a rest before continuing.",
            )),
            FatigueLevel::Moderate => recs.push(Recommendation::new(
                RecommendationKind::Rest,
                Priority::Medium,
                "Consider a short pause and a sip of water.",
            )),
            FatigueLevel::None => {}
        }

        match concentration {
            Concentration::VeryLow => recs.push(Recommendation::new(
                RecommendationKind::Refocus,
                Priority::High,
                "Your pitch is jumping around. Slow down and listen to the reference before each note.",
            )),
            Concentration::Low => recs.push(Recommendation::new(
                RecommendationKind::Refocus,
                Priority::Medium,
                "Take a breath and refocus on the reference tone.",
            )),
            Concentration::High | Concentration::Medium => {}
        }

        for interval in IntervalType::ALL {
            let history = &self.per_interval[interval.index()];
            if history.len() < self.config.min_attempts.max(1) {
                continue;
            }
            let cents: Vec<f64> = history.iter().map(|a| a.cents_diff).collect();
            let score = consistency_score(util::std_dev(&cents));
            if score < 60.0 {
                recs.push(
                    Recommendation::new(
                        RecommendationKind::TargetedPractice,
                        Priority::Medium,
                        format!(
                            "Practice the {} on its own until it lands the same way each time.",
                            interval.label()
                        ),
                    )
                    .for_interval(interval),
                );
            }
        }

        if stability.trend == Trend::Improving {
            recs.push(Recommendation::new(
                RecommendationKind::Encouragement,
                Priority::Low,
                "Your pitch is settling in. Keep it up!",
            ));
        }

        if recs.is_empty() {
            recs.push(Recommendation::new(
                RecommendationKind::Encouragement,
                Priority::Low,
                "Steady work. Keep going.",
            ));
        }

        // Stable sort keeps insertion order within a priority.
        recs.sort_by_key(|r| r.priority);
        recs
    }
}

/// Newest three absolute errors against the three before them.
fn error_trend(cents: &[f64]) -> Trend {
    let abs: Vec<f64> = cents.iter().map(|c| c.abs()).collect();
    match util::split_window_means(&abs, INTERVAL_TREND_WINDOW) {
        None => Trend::InsufficientData,
        Some((older, recent)) => {
            let change = (older - recent) / older.max(MIN_ERROR_BASELINE);
            if change > TREND_THRESHOLD {
                Trend::Improving
            } else if change < -TREND_THRESHOLD {
                Trend::Declining
            } else {
                Trend::Stable
            }
        }
    }
}

fn consistency_feedback(stats: &ConsistencyStats, insufficient: bool, interval: IntervalType) -> String {
    if insufficient {
        return format!(
            "A few more {} attempts are needed to measure your consistency.",
            interval.label()
        );
    }
    let score = stats.consistency_score;
    if score >= 85.0 {
        format!("Very consistent on the {}.", interval.label())
    } else if score >= 60.0 {
        format!(
            "Fairly consistent on the {} (±{:.0} cents).",
            interval.label(),
            stats.std_dev
        )
    } else {
        format!(
            "Your {} varies a lot between attempts (±{:.0} cents).",
            interval.label(),
            stats.std_dev
        )
    }
}
