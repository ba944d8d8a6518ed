use chrono::{DateTime, Utc};

use super::engine::ScoringEngine;
use super::result::{AttemptInput, ScoreResult};
use crate::analysis::correction::correction_hint;
use crate::error::ScaleError;
use crate::scale::{self, MajorScale, ScaleDegree, DEGREES};
use crate::storage::session_data::{NoteResult, SessionResult};

/// One do → do' pass over a major scale.
///
/// Each sung note is run through the octave corrector against the scale's
/// range, scored by the engine, and kept as a `NoteResult`. A rejected
/// attempt (bad input or internal error) does not advance the degree.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    scale: MajorScale,
    base_note: String,
    started_at: Option<DateTime<Utc>>,
    notes: Vec<NoteResult>,
}

impl TrainingSession {
    pub fn new(scale: MajorScale) -> Self {
        let base_note = scale::nearest_note(scale.base_freq())
            .map(|(name, _)| name)
            .unwrap_or_else(|| format!("{:.2}Hz", scale.base_freq()));
        Self {
            scale,
            base_note,
            started_at: None,
            notes: Vec::with_capacity(DEGREES.len()),
        }
    }

    pub fn scale(&self) -> &MajorScale {
        &self.scale
    }

    pub fn base_note(&self) -> &str {
        &self.base_note
    }

    /// The degree the singer should sing next, or None once complete.
    pub fn next_degree(&self) -> Option<ScaleDegree> {
        DEGREES.get(self.notes.len()).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.notes.len() == DEGREES.len()
    }

    pub fn notes(&self) -> &[NoteResult] {
        &self.notes
    }

    pub fn sing(
        &mut self,
        engine: &mut ScoringEngine,
        detected_freq: f64,
        response_time_ms: f64,
        volume: f64,
    ) -> Result<ScoreResult, ScaleError> {
        self.sing_at(engine, detected_freq, response_time_ms, volume, Utc::now())
    }

    /// Score the next degree at an explicit point in time.
    pub fn sing_at(
        &mut self,
        engine: &mut ScoringEngine,
        detected_freq: f64,
        response_time_ms: f64,
        volume: f64,
        now: DateTime<Utc>,
    ) -> Result<ScoreResult, ScaleError> {
        let degree = self.next_degree().ok_or(ScaleError::SessionComplete)?;
        let target_freq = self.scale.frequency(degree.degree)?;
        let hint = correction_hint(detected_freq, self.scale.target_range());

        let input = AttemptInput::new(self.scale.base_freq(), target_freq, detected_freq)
            .with_response_time(response_time_ms)
            .with_volume(volume)
            .with_correction(hint);
        let result = engine.analyze_at(&input, now);

        if result.is_ok() {
            self.started_at.get_or_insert(now);
            self.notes.push(NoteResult {
                degree: degree.degree,
                solfege: degree.solfege.to_string(),
                target_freq,
                detected_freq: result.breakdown.scored_freq,
                accuracy: result.score.components.pitch_accuracy,
                score: result.score.total,
                grade: result.score.grade,
                direction_correct: result.breakdown.direction.direction_correct,
            });
            tracing::debug!(
                degree = degree.degree,
                solfege = degree.solfege,
                score = result.score.total,
                "scale degree scored"
            );
        }

        Ok(result)
    }

    /// Close the session into a persistable record. All eight degrees must
    /// have been sung.
    pub fn finish(self, now: DateTime<Utc>) -> Result<SessionResult, ScaleError> {
        if !self.is_complete() {
            return Err(ScaleError::SessionIncomplete {
                sung: self.notes.len(),
            });
        }
        let started_at = self.started_at.unwrap_or(now);
        let duration_secs = (now - started_at).num_milliseconds() as f64 / 1000.0;
        let session_id = format!("{}-{}", now.format("%Y%m%dT%H%M%S%.3f"), self.base_note);

        Ok(SessionResult::from_notes(
            session_id,
            self.base_note,
            self.notes,
            now,
            duration_secs,
        ))
    }
}
