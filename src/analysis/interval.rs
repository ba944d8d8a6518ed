use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mastery::{MasteryKey, MasteryLevel, MasterySnapshot, MasteryTable};
use crate::util;

/// Accuracy points lost per semitone of error.
const ACCURACY_PER_SEMITONE: f64 = 50.0;

/// The thirteen reference intervals from unison to octave.
///
/// Declared in ascending semitone order; `classify` relies on that order for
/// its tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalType {
    Unison,
    MinorSecond,
    MajorSecond,
    MinorThird,
    MajorThird,
    PerfectFourth,
    Tritone,
    PerfectFifth,
    MinorSixth,
    MajorSixth,
    MinorSeventh,
    MajorSeventh,
    Octave,
}

impl IntervalType {
    pub const ALL: [IntervalType; 13] = [
        IntervalType::Unison,
        IntervalType::MinorSecond,
        IntervalType::MajorSecond,
        IntervalType::MinorThird,
        IntervalType::MajorThird,
        IntervalType::PerfectFourth,
        IntervalType::Tritone,
        IntervalType::PerfectFifth,
        IntervalType::MinorSixth,
        IntervalType::MajorSixth,
        IntervalType::MinorSeventh,
        IntervalType::MajorSeventh,
        IntervalType::Octave,
    ];

    pub fn semitones(self) -> u8 {
        self as u8
    }

    /// Position on the 12-semitone ring; Unison and Octave share 0.
    pub fn pitch_class(self) -> u8 {
        self.semitones() % 12
    }

    pub fn label(self) -> &'static str {
        match self {
            IntervalType::Unison => "unison",
            IntervalType::MinorSecond => "minor second",
            IntervalType::MajorSecond => "major second",
            IntervalType::MinorThird => "minor third",
            IntervalType::MajorThird => "major third",
            IntervalType::PerfectFourth => "perfect fourth",
            IntervalType::Tritone => "tritone",
            IntervalType::PerfectFifth => "perfect fifth",
            IntervalType::MinorSixth => "minor sixth",
            IntervalType::MajorSixth => "major sixth",
            IntervalType::MinorSeventh => "minor seventh",
            IntervalType::MajorSeventh => "major seventh",
            IntervalType::Octave => "octave",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            IntervalType::Unison => "P1",
            IntervalType::MinorSecond => "m2",
            IntervalType::MajorSecond => "M2",
            IntervalType::MinorThird => "m3",
            IntervalType::MajorThird => "M3",
            IntervalType::PerfectFourth => "P4",
            IntervalType::Tritone => "TT",
            IntervalType::PerfectFifth => "P5",
            IntervalType::MinorSixth => "m6",
            IntervalType::MajorSixth => "M6",
            IntervalType::MinorSeventh => "m7",
            IntervalType::MajorSeventh => "M7",
            IntervalType::Octave => "P8",
        }
    }

    /// How much this interval matters in ear training. The structural
    /// intervals (unison, fourth, fifth, octave) weigh the most.
    pub fn importance(self) -> f64 {
        match self {
            IntervalType::Unison => 1.0,
            IntervalType::MinorSecond => 0.8,
            IntervalType::MajorSecond => 0.9,
            IntervalType::MinorThird => 1.0,
            IntervalType::MajorThird => 1.0,
            IntervalType::PerfectFourth => 1.1,
            IntervalType::Tritone => 0.7,
            IntervalType::PerfectFifth => 1.2,
            IntervalType::MinorSixth => 0.8,
            IntervalType::MajorSixth => 0.9,
            IntervalType::MinorSeventh => 0.8,
            IntervalType::MajorSeventh => 0.8,
            IntervalType::Octave => 1.2,
        }
    }

    /// Intervals singers commonly land on instead of this one.
    pub fn confused_with(self) -> &'static [IntervalType] {
        use IntervalType::*;
        match self {
            Unison => &[MinorSecond, Octave],
            MinorSecond => &[Unison, MajorSecond],
            MajorSecond => &[MinorSecond, MinorThird],
            MinorThird => &[MajorThird, MajorSecond],
            MajorThird => &[MinorThird, PerfectFourth],
            PerfectFourth => &[PerfectFifth, MajorThird, Tritone],
            Tritone => &[PerfectFourth, PerfectFifth],
            PerfectFifth => &[PerfectFourth, MinorSixth, Tritone],
            MinorSixth => &[MajorSixth, PerfectFifth],
            MajorSixth => &[MinorSixth, MinorSeventh],
            MinorSeventh => &[MajorSeventh, MajorSixth],
            MajorSeventh => &[Octave, MinorSeventh],
            Octave => &[MajorSeventh, Unison],
        }
    }

    /// Nearest reference interval to a semitone value.
    ///
    /// When the value sits exactly halfway between two intervals the one
    /// with fewer semitones wins (strict `<` over the ascending table).
    pub fn classify(semitones: f64) -> IntervalType {
        let mut best = IntervalType::Unison;
        let mut best_distance = f64::INFINITY;
        for interval in IntervalType::ALL {
            let distance = (semitones - interval.semitones() as f64).abs();
            if distance < best_distance {
                best = interval;
                best_distance = distance;
            }
        }
        best
    }
}

impl MasteryKey for IntervalType {
    const COUNT: usize = 13;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        IntervalType::ALL.get(index).copied()
    }
}

/// Accuracy from the distance between target and detected semitone values.
///
/// Both values live on the normalized [0, 12) ring, so distance wraps:
/// 11.9 and 0.1 are 0.2 semitones apart.
pub fn calculate_interval_accuracy(target_semitones: f64, detected_semitones: f64) -> f64 {
    let distance = util::circular_distance(target_semitones, detected_semitones);
    util::clamp_score(100.0 - ACCURACY_PER_SEMITONE * distance)
}

/// Result of classifying one sung interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalAnalysis {
    /// False when a frequency was unusable; every other field is then zeroed.
    pub valid: bool,
    pub target_semitones: f64,
    pub detected_semitones: f64,
    /// None means "unknown interval".
    pub target_interval: Option<IntervalType>,
    pub detected_interval: Option<IntervalType>,
    pub is_correct: bool,
    pub accuracy: f64,
    /// Signed shortest offset detected − target on the semitone ring.
    pub semitone_error: f64,
    pub cents_error: f64,
    pub importance: f64,
    pub possible_confusions: Vec<IntervalType>,
    pub mastery: MasterySnapshot,
    pub feedback: String,
}

impl IntervalAnalysis {
    fn unknown() -> Self {
        Self {
            feedback: "Could not detect a usable pitch. Sing a little louder and hold the note."
                .into(),
            ..Self::default()
        }
    }
}

/// Classifies sung intervals and keeps per-interval mastery.
#[derive(Debug, Clone)]
pub struct IntervalClassifier {
    mastery: MasteryTable<IntervalType>,
}

impl IntervalClassifier {
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            mastery: MasteryTable::new(recent_capacity),
        }
    }

    pub fn analyze(&mut self, base_freq: f64, target_freq: f64, detected_freq: f64) -> IntervalAnalysis {
        self.analyze_at(base_freq, target_freq, detected_freq, Utc::now())
    }

    pub fn analyze_at(
        &mut self,
        base_freq: f64,
        target_freq: f64,
        detected_freq: f64,
        now: DateTime<Utc>,
    ) -> IntervalAnalysis {
        let usable = [base_freq, target_freq, detected_freq]
            .iter()
            .all(|&f| util::is_valid_frequency(f));
        if !usable {
            tracing::debug!(
                base_freq,
                target_freq,
                detected_freq,
                "interval analysis skipped: unusable frequency"
            );
            return IntervalAnalysis::unknown();
        }

        let target_semitones = util::normalize_semitones(util::semitones_between(base_freq, target_freq));
        let detected_semitones =
            util::normalize_semitones(util::semitones_between(base_freq, detected_freq));

        let target_interval = IntervalType::classify(target_semitones);
        let detected_interval = IntervalType::classify(detected_semitones);
        let is_correct = target_interval.pitch_class() == detected_interval.pitch_class();

        let accuracy = calculate_interval_accuracy(target_semitones, detected_semitones);
        let semitone_error = util::circular_offset(target_semitones, detected_semitones);

        let record = self.mastery.record(target_interval, accuracy, is_correct, now);
        let level = MasteryLevel::from_accuracy(record.average_accuracy(), record.attempts());
        let mastery = record.snapshot(level);

        let feedback = interval_feedback(
            target_interval,
            detected_interval,
            is_correct,
            accuracy,
            target_semitones,
            detected_semitones,
        );

        IntervalAnalysis {
            valid: true,
            target_semitones,
            detected_semitones,
            target_interval: Some(target_interval),
            detected_interval: Some(detected_interval),
            is_correct,
            accuracy,
            semitone_error,
            cents_error: semitone_error * 100.0,
            importance: target_interval.importance(),
            possible_confusions: target_interval.confused_with().to_vec(),
            mastery,
            feedback,
        }
    }

    /// Snapshot of one interval's mastery, if it has been attempted.
    pub fn mastery(&self, interval: IntervalType) -> Option<MasterySnapshot> {
        self.mastery.get(interval).map(|r| {
            r.snapshot(MasteryLevel::from_accuracy(r.average_accuracy(), r.attempts()))
        })
    }

    /// Snapshots for every attempted interval, in ascending interval order.
    pub fn mastery_report(&self) -> Vec<(IntervalType, MasterySnapshot)> {
        self.mastery
            .iter()
            .map(|(interval, r)| {
                let level = MasteryLevel::from_accuracy(r.average_accuracy(), r.attempts());
                (interval, r.snapshot(level))
            })
            .collect()
    }

    /// Attempted intervals with the lowest running accuracy first.
    pub fn weakest(&self, count: usize) -> Vec<IntervalType> {
        let mut attempted: Vec<(IntervalType, f64)> = self
            .mastery
            .iter()
            .map(|(interval, r)| (interval, r.average_accuracy()))
            .collect();
        attempted.sort_by(|a, b| a.1.total_cmp(&b.1));
        attempted.into_iter().take(count).map(|(i, _)| i).collect()
    }

    pub fn reset(&mut self) {
        self.mastery.reset();
    }
}

fn interval_feedback(
    target: IntervalType,
    detected: IntervalType,
    is_correct: bool,
    accuracy: f64,
    target_semitones: f64,
    detected_semitones: f64,
) -> String {
    if is_correct {
        return if accuracy >= 90.0 {
            format!("Excellent! A clean {}.", target.label())
        } else if accuracy >= 70.0 {
            format!("Good {}, just slightly off pitch.", target.label())
        } else {
            format!(
                "Right interval ({}), but the pitch drifted. Hold the note steadier.",
                target.label()
            )
        };
    }

    let mut message = format!(
        "You sang a {} instead of a {}.",
        detected.label(),
        target.label()
    );

    let raw_delta = detected_semitones - target_semitones;
    let offset = util::circular_offset(target_semitones, detected_semitones);
    let hint = if raw_delta.abs() >= 6.0 {
        " You may have jumped to a different octave; listen for where the note sits relative to the base."
            .to_string()
    } else if offset.abs() <= 1.0 {
        format!(
            " You were about a semitone {}.",
            if offset > 0.0 { "sharp" } else { "flat" }
        )
    } else if offset.abs() <= 2.0 {
        format!(
            " You were about a whole tone {}.",
            if offset > 0.0 { "sharp" } else { "flat" }
        )
    } else {
        " Replay the reference tone and picture the scale step before singing.".to_string()
    };
    message.push_str(&hint);
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frequency `semitones` above `base`.
    fn above(base: f64, semitones: f64) -> f64 {
        base * 2f64.powf(semitones / 12.0)
    }

    #[test]
    fn classify_exact_intervals() {
        for interval in IntervalType::ALL {
            assert_eq!(IntervalType::classify(interval.semitones() as f64), interval);
        }
    }

    #[test]
    fn classify_tie_rounds_down() {
        assert_eq!(IntervalType::classify(3.5), IntervalType::MinorThird);
        assert_eq!(IntervalType::classify(0.5), IntervalType::Unison);
        assert_eq!(IntervalType::classify(11.5), IntervalType::MajorSeventh);
    }

    #[test]
    fn classify_near_twelve_is_octave() {
        assert_eq!(IntervalType::classify(11.8), IntervalType::Octave);
    }

    #[test]
    fn accuracy_equal_values_is_perfect() {
        for s in [0.0, 3.3, 7.0, 11.99] {
            assert_eq!(calculate_interval_accuracy(s, s), 100.0);
        }
    }

    #[test]
    fn accuracy_strictly_decreases_with_error() {
        let a = calculate_interval_accuracy(4.0, 4.1);
        let b = calculate_interval_accuracy(4.0, 4.5);
        let c = calculate_interval_accuracy(4.0, 5.5);
        assert!(a > b && b > c);
        assert!((b - 75.0).abs() < 1e-9);
        assert_eq!(calculate_interval_accuracy(4.0, 7.0), 0.0);
    }

    #[test]
    fn accuracy_wraps_around_the_octave() {
        assert!((calculate_interval_accuracy(11.9, 0.1) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn major_third_sung_perfectly() {
        let mut classifier = IntervalClassifier::new(10);
        let result = classifier.analyze(440.0, 554.37, 554.37);
        assert!(result.valid);
        assert_eq!(result.target_interval, Some(IntervalType::MajorThird));
        assert_eq!(result.detected_interval, Some(IntervalType::MajorThird));
        assert!(result.is_correct);
        assert_eq!(result.accuracy, 100.0);
        assert!(result.feedback.contains("Excellent"));
        assert_eq!(result.mastery.attempts, 1);
    }

    #[test]
    fn octave_transposition_does_not_change_classification() {
        let mut classifier = IntervalClassifier::new(10);
        let base = 261.63;
        let other = above(base, 7.0);
        let reference = classifier.analyze(base, other, other);
        for factor in [0.25, 0.5, 2.0, 4.0] {
            let moved = classifier.analyze(base, other * factor, other * factor);
            assert_eq!(moved.target_interval, reference.target_interval);
            assert!((moved.target_semitones - reference.target_semitones).abs() < 1e-9);
        }
    }

    #[test]
    fn wrong_interval_names_confusion() {
        let mut classifier = IntervalClassifier::new(10);
        let base = 440.0;
        let result = classifier.analyze(base, above(base, 4.0), above(base, 3.0));
        assert!(!result.is_correct);
        assert_eq!(result.detected_interval, Some(IntervalType::MinorThird));
        assert!(result.feedback.contains("minor third instead of a major third"));
        assert!(result.feedback.contains("semitone flat"));
        assert!((result.cents_error + 100.0).abs() < 1e-6);
        assert!((result.accuracy - 50.0).abs() < 1e-6);
    }

    #[test]
    fn wide_miss_suggests_octave_confusion() {
        let mut classifier = IntervalClassifier::new(10);
        let base = 440.0;
        let result = classifier.analyze(base, above(base, 1.0), above(base, 11.0));
        assert!(!result.is_correct);
        assert!(result.feedback.contains("octave"));
    }

    #[test]
    fn upper_do_matches_unison() {
        let mut classifier = IntervalClassifier::new(10);
        let result = classifier.analyze(261.63, 523.26, 261.63);
        assert!(result.is_correct);
        assert!(result.accuracy > 99.0);
    }

    #[test]
    fn invalid_frequency_degrades_gracefully() {
        let mut classifier = IntervalClassifier::new(10);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = classifier.analyze(440.0, 554.37, bad);
            assert!(!result.valid);
            assert_eq!(result.accuracy, 0.0);
            assert!(result.detected_interval.is_none());
        }
        assert!(classifier.mastery_report().is_empty());
    }

    #[test]
    fn mastery_levels_up_with_practice() {
        let mut classifier = IntervalClassifier::new(10);
        let base = 440.0;
        let fifth = above(base, 7.0);
        for _ in 0..10 {
            classifier.analyze(base, fifth, fifth);
        }
        let snap = classifier.mastery(IntervalType::PerfectFifth).unwrap();
        assert_eq!(snap.attempts, 10);
        assert_eq!(snap.level, MasteryLevel::Master);
        assert!(classifier.mastery(IntervalType::Tritone).is_none());
    }

    #[test]
    fn few_attempts_stay_beginner() {
        let mut classifier = IntervalClassifier::new(10);
        let result = classifier.analyze(440.0, 440.0, 440.0);
        assert_eq!(result.mastery.level, MasteryLevel::Beginner);
        assert!(!result.mastery.has_sufficient_data());
    }

    #[test]
    fn weakest_sorts_by_accuracy() {
        let mut classifier = IntervalClassifier::new(10);
        let base = 440.0;
        classifier.analyze(base, above(base, 7.0), above(base, 7.0));
        classifier.analyze(base, above(base, 4.0), above(base, 4.6));
        assert_eq!(classifier.weakest(1), vec![IntervalType::MajorThird]);
    }

    #[test]
    fn reset_clears_mastery() {
        let mut classifier = IntervalClassifier::new(10);
        classifier.analyze(440.0, 440.0, 440.0);
        classifier.reset();
        assert!(classifier.mastery_report().is_empty());
    }
}
