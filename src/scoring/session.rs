use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::grade::PerformanceLevel;
use super::result::ScoreResult;
use crate::analysis::Trend;
use crate::util;

/// Totals compared on each side of the improvement trend.
const TREND_WINDOW: usize = 3;

/// Points the newest totals must move by to count as a trend.
const TREND_BAND: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstAttempt,
    /// A single attempt scoring 90 or more.
    HighScore,
    /// A single attempt scoring 98 or more.
    NearPerfect,
    /// Ten attempts in one session.
    Dedicated,
    /// The improvement trend turned upward.
    OnTheRise,
}

impl Achievement {
    pub fn label(self) -> &'static str {
        match self {
            Achievement::FirstAttempt => "First note",
            Achievement::HighScore => "Sharp ear (90+)",
            Achievement::NearPerfect => "Near perfect (98+)",
            Achievement::Dedicated => "Dedicated (10 attempts)",
            Achievement::OnTheRise => "On the rise",
        }
    }
}

/// The one mutable piece of per-session state owned by the engine.
#[derive(Debug, Clone)]
pub struct SessionState {
    started_at: Option<DateTime<Utc>>,
    total_attempts: u64,
    score_sum: f64,
    best_score: f64,
    history: VecDeque<f64>,
    history_capacity: usize,
    level: PerformanceLevel,
    achievements: BTreeSet<Achievement>,
    last_result: Option<Box<ScoreResult>>,
}

/// Read-only copy of `SessionState` included in every result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub started_at: Option<DateTime<Utc>>,
    pub total_attempts: u64,
    pub average_score: f64,
    pub best_score: f64,
    pub elapsed_secs: f64,
    pub level: PerformanceLevel,
    pub achievements: Vec<Achievement>,
}

impl SessionState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            started_at: None,
            total_attempts: 0,
            score_sum: 0.0,
            best_score: 0.0,
            history: VecDeque::with_capacity(history_capacity),
            history_capacity: history_capacity.max(1),
            level: PerformanceLevel::default(),
            achievements: BTreeSet::new(),
            last_result: None,
        }
    }

    /// Fold one scored attempt into the session. Returns the achievements
    /// this attempt unlocked for the first time.
    pub fn record(&mut self, total: f64, now: DateTime<Utc>) -> Vec<Achievement> {
        self.started_at.get_or_insert(now);
        self.total_attempts += 1;
        self.score_sum += total;
        self.best_score = self.best_score.max(total);
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(total);
        self.level = PerformanceLevel::from_score(self.average_score());

        let mut earned = vec![Achievement::FirstAttempt];
        if total >= 90.0 {
            earned.push(Achievement::HighScore);
        }
        if total >= 98.0 {
            earned.push(Achievement::NearPerfect);
        }
        if self.total_attempts >= 10 {
            earned.push(Achievement::Dedicated);
        }
        if self.improvement_trend() == Trend::Improving {
            earned.push(Achievement::OnTheRise);
        }

        earned
            .into_iter()
            .filter(|a| self.achievements.insert(*a))
            .collect()
    }

    /// Newest three totals against the three before them.
    pub fn improvement_trend(&self) -> Trend {
        let history: Vec<f64> = self.history.iter().copied().collect();
        match util::split_window_means(&history, TREND_WINDOW) {
            None => Trend::InsufficientData,
            Some((older, recent)) if recent - older > TREND_BAND => Trend::Improving,
            Some((older, recent)) if older - recent > TREND_BAND => Trend::Declining,
            Some(_) => Trend::Stable,
        }
    }

    pub fn average_score(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.score_sum / self.total_attempts as f64
        }
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_attempts
    }

    pub fn achievements(&self) -> &BTreeSet<Achievement> {
        &self.achievements
    }

    pub fn last_result(&self) -> Option<&ScoreResult> {
        self.last_result.as_deref()
    }

    pub fn set_last_result(&mut self, result: ScoreResult) {
        self.last_result = Some(Box::new(result));
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let elapsed_secs = self
            .started_at
            .map(|start| ((now - start).num_milliseconds() as f64 / 1000.0).max(0.0))
            .unwrap_or(0.0);
        SessionSnapshot {
            started_at: self.started_at,
            total_attempts: self.total_attempts,
            average_score: self.average_score(),
            best_score: self.best_score,
            elapsed_secs,
            level: self.level,
            achievements: self.achievements.iter().copied().collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.history_capacity);
    }
}
