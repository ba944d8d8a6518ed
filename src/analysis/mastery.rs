use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util;

/// Attempts below this always report `Beginner` with no trend.
pub const MIN_ATTEMPTS_FOR_LEVEL: u32 = 3;

/// Recent attempts needed before a trend is computed.
const MIN_ATTEMPTS_FOR_TREND: usize = 4;

/// Accuracy points the newer half must move by to count as a trend.
const TREND_BAND: f64 = 5.0;

/// Proficiency bands shared by the interval and direction classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    #[default]
    Beginner,
    Novice,
    Intermediate,
    Advanced,
    Master,
}

impl MasteryLevel {
    /// Level from running average accuracy and attempt count.
    pub fn from_accuracy(average: f64, attempts: u32) -> Self {
        if attempts < MIN_ATTEMPTS_FOR_LEVEL {
            return MasteryLevel::Beginner;
        }
        match (average, attempts) {
            (a, n) if a >= 90.0 && n >= 10 => MasteryLevel::Master,
            (a, n) if a >= 80.0 && n >= 7 => MasteryLevel::Advanced,
            (a, n) if a >= 70.0 && n >= 5 => MasteryLevel::Intermediate,
            (a, _) if a >= 50.0 => MasteryLevel::Novice,
            _ => MasteryLevel::Beginner,
        }
    }

    /// Direction mastery also requires getting the direction itself right.
    pub fn from_direction_stats(average: f64, success_rate: f64, attempts: u32) -> Self {
        if attempts < MIN_ATTEMPTS_FOR_LEVEL {
            return MasteryLevel::Beginner;
        }
        if success_rate >= 0.95 && average >= 90.0 && attempts >= 10 {
            MasteryLevel::Master
        } else if success_rate >= 0.85 && average >= 80.0 && attempts >= 7 {
            MasteryLevel::Advanced
        } else if success_rate >= 0.70 && average >= 70.0 && attempts >= 5 {
            MasteryLevel::Intermediate
        } else if success_rate >= 0.5 {
            MasteryLevel::Novice
        } else {
            MasteryLevel::Beginner
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MasteryLevel::Beginner => "beginner",
            MasteryLevel::Novice => "novice",
            MasteryLevel::Intermediate => "intermediate",
            MasteryLevel::Advanced => "advanced",
            MasteryLevel::Master => "master",
        }
    }
}

/// Direction of change in a series of scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    #[default]
    InsufficientData,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
            Trend::InsufficientData => "insufficient data",
        }
    }
}

/// Closed set of categories a `MasteryTable` can be keyed by.
///
/// Implemented by `IntervalType` and `Direction`; the table stores one slot
/// per variant, so lookups can't miss on a typo'd key.
pub trait MasteryKey: Copy {
    const COUNT: usize;

    /// Dense index in `0..COUNT`.
    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;
}

/// Running statistics for one interval or direction.
#[derive(Debug, Clone)]
pub struct MasteryRecord {
    attempts: u32,
    successes: u32,
    total_accuracy: f64,
    best_accuracy: f64,
    recent: VecDeque<f64>,
    capacity: usize,
    last_attempt: DateTime<Utc>,
}

impl MasteryRecord {
    fn new(capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            successes: 0,
            total_accuracy: 0.0,
            best_accuracy: 0.0,
            recent: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            last_attempt: now,
        }
    }

    fn record(&mut self, accuracy: f64, success: bool, now: DateTime<Utc>) {
        let accuracy = util::clamp_score(accuracy);
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
        self.total_accuracy += accuracy;
        self.best_accuracy = self.best_accuracy.max(accuracy);
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(accuracy);
        self.last_attempt = now;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn average_accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.total_accuracy / self.attempts as f64
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    /// Compare the older half of the ring buffer against the newer half.
    pub fn trend(&self) -> Trend {
        if self.recent.len() < MIN_ATTEMPTS_FOR_TREND {
            return Trend::InsufficientData;
        }
        let recent: Vec<f64> = self.recent.iter().copied().collect();
        let mid = recent.len() / 2;
        let delta = util::mean(&recent[mid..]) - util::mean(&recent[..mid]);
        if delta > TREND_BAND {
            Trend::Improving
        } else if delta < -TREND_BAND {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    pub fn snapshot(&self, level: MasteryLevel) -> MasterySnapshot {
        MasterySnapshot {
            attempts: self.attempts,
            average_accuracy: self.average_accuracy(),
            best_accuracy: self.best_accuracy,
            success_rate: self.success_rate(),
            recent: self.recent.iter().copied().collect(),
            last_attempt: Some(self.last_attempt),
            trend: self.trend(),
            level,
        }
    }
}

/// Read-only copy of a `MasteryRecord` handed out to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterySnapshot {
    pub attempts: u32,
    pub average_accuracy: f64,
    pub best_accuracy: f64,
    /// Fraction of attempts counted as a success (direction matches).
    pub success_rate: f64,
    pub recent: Vec<f64>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub trend: Trend,
    pub level: MasteryLevel,
}

impl MasterySnapshot {
    pub fn has_sufficient_data(&self) -> bool {
        self.attempts >= MIN_ATTEMPTS_FOR_LEVEL
    }
}

/// One optional record per key variant. Records appear on first attempt
/// and are only removed by `reset`.
#[derive(Debug, Clone)]
pub struct MasteryTable<K: MasteryKey> {
    slots: Vec<Option<MasteryRecord>>,
    capacity: usize,
    _key: std::marker::PhantomData<K>,
}

impl<K: MasteryKey> MasteryTable<K> {
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            slots: vec![None; K::COUNT],
            capacity: recent_capacity,
            _key: std::marker::PhantomData,
        }
    }

    /// Record an attempt and return the updated record.
    pub fn record(
        &mut self,
        key: K,
        accuracy: f64,
        success: bool,
        now: DateTime<Utc>,
    ) -> &MasteryRecord {
        let capacity = self.capacity;
        let record = self.slots[key.index()].get_or_insert_with(|| MasteryRecord::new(capacity, now));
        record.record(accuracy, success, now);
        record
    }

    pub fn get(&self, key: K) -> Option<&MasteryRecord> {
        self.slots[key.index()].as_ref()
    }

    /// Every key that has at least one attempt, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &MasteryRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((K::from_index(i)?, slot.as_ref()?)))
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}
