use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::Grade;
use crate::util;

/// Sessions needed before a cumulative result is produced, and the number
/// of most recent sessions it summarizes.
pub const CUMULATIVE_WINDOW: usize = 8;

/// One completed do → do' session.
///
/// Field names are camelCase on the wire so the record can be handed to a
/// front end unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub session_id: String,
    /// Nearest note name of the base (do) tone, e.g. "C4".
    pub base_note: String,
    pub grade: Grade,
    /// Mean integrated score over the sung degrees.
    pub accuracy: f64,
    pub note_results: Vec<NoteResult>,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_secs: f64,
}

/// Outcome for one scale degree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResult {
    /// 1-based (do = 1, do' = 8).
    pub degree: usize,
    pub solfege: String,
    pub target_freq: f64,
    /// The frequency that was scored, after any octave correction.
    pub detected_freq: f64,
    /// Pitch accuracy component (0 to 100).
    pub accuracy: f64,
    /// Integrated total (0 to 100).
    pub score: f64,
    pub grade: Grade,
    pub direction_correct: bool,
}

/// Summary over the most recent eight sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeResult {
    pub overall_grade: Grade,
    pub overall_accuracy: f64,
    /// Seconds summed over the summarized sessions.
    pub total_play_time: f64,
    pub session_count: usize,
    pub computed_at: DateTime<Utc>,
}

impl SessionResult {
    /// Build a session record from its note results. Accuracy is the mean
    /// note score; the grade follows from it.
    pub fn from_notes(
        session_id: String,
        base_note: String,
        note_results: Vec<NoteResult>,
        completed_at: DateTime<Utc>,
        duration_secs: f64,
    ) -> Self {
        let scores: Vec<f64> = note_results.iter().map(|n| n.score).collect();
        let accuracy = util::clamp_score(util::mean(&scores));
        Self {
            session_id,
            base_note,
            grade: Grade::from_score(accuracy),
            accuracy,
            note_results,
            completed_at,
            duration_secs: duration_secs.max(0.0),
        }
    }
}

impl CumulativeResult {
    /// Summarize the most recent eight sessions. Returns None until at least
    /// eight exist. Input order doesn't matter; records are ordered by
    /// completion time here.
    pub fn from_sessions(sessions: &[SessionResult], now: DateTime<Utc>) -> Option<Self> {
        if sessions.len() < CUMULATIVE_WINDOW {
            return None;
        }

        let mut ordered: Vec<&SessionResult> = sessions.iter().collect();
        ordered.sort_by_key(|s| s.completed_at);
        let recent = &ordered[ordered.len() - CUMULATIVE_WINDOW..];

        let accuracies: Vec<f64> = recent.iter().map(|s| s.accuracy).collect();
        let overall_accuracy = util::clamp_score(util::mean(&accuracies));

        Some(Self {
            overall_grade: Grade::from_score(overall_accuracy),
            overall_accuracy,
            total_play_time: recent.iter().map(|s| s.duration_secs).sum(),
            session_count: recent.len(),
            computed_at: now,
        })
    }
}
