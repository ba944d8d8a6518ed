//! Major scale layout and note-name helpers.

use serde::{Deserialize, Serialize};

use crate::analysis::TargetRange;
use crate::error::ScaleError;
use crate::util;

/// Reference pitch for note names.
pub const A4_HZ: f64 = 440.0;
const A4_MIDI: i32 = 69;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// One step of the do → do' scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleDegree {
    /// 1-based position (do = 1, do' = 8).
    pub degree: usize,
    pub solfege: &'static str,
    /// Semitones above do.
    pub offset: u8,
}

pub const DEGREES: [ScaleDegree; 8] = [
    ScaleDegree { degree: 1, solfege: "do", offset: 0 },
    ScaleDegree { degree: 2, solfege: "re", offset: 2 },
    ScaleDegree { degree: 3, solfege: "mi", offset: 4 },
    ScaleDegree { degree: 4, solfege: "fa", offset: 5 },
    ScaleDegree { degree: 5, solfege: "sol", offset: 7 },
    ScaleDegree { degree: 6, solfege: "la", offset: 9 },
    ScaleDegree { degree: 7, solfege: "ti", offset: 11 },
    ScaleDegree { degree: 8, solfege: "do'", offset: 12 },
];

/// Equal-tempered major scale anchored on a base (do) frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MajorScale {
    base_freq: f64,
}

impl MajorScale {
    pub fn new(base_freq: f64) -> Result<Self, ScaleError> {
        if !util::is_valid_frequency(base_freq) {
            return Err(ScaleError::InvalidBaseFrequency(base_freq));
        }
        Ok(Self { base_freq })
    }

    pub fn from_note(name: &str) -> Result<Self, ScaleError> {
        Self::new(parse_note(name)?)
    }

    pub fn base_freq(&self) -> f64 {
        self.base_freq
    }

    /// Degree info by 1-based position.
    pub fn degree(&self, degree: usize) -> Result<ScaleDegree, ScaleError> {
        degree
            .checked_sub(1)
            .and_then(|i| DEGREES.get(i))
            .copied()
            .ok_or(ScaleError::InvalidDegree(degree))
    }

    pub fn frequency(&self, degree: usize) -> Result<f64, ScaleError> {
        let d = self.degree(degree)?;
        Ok(self.base_freq * 2f64.powf(f64::from(d.offset) / 12.0))
    }

    /// Target frequencies for all eight degrees, do first.
    pub fn frequencies(&self) -> [f64; 8] {
        DEGREES.map(|d| self.base_freq * 2f64.powf(f64::from(d.offset) / 12.0))
    }

    /// The do → do' octave the singer is expected to land in.
    pub fn target_range(&self) -> TargetRange {
        TargetRange::new(self.base_freq, self.base_freq * 2.0)
    }
}

/// Parse a scientific pitch name like `C4`, `F#3` or `Bb4` into Hz.
///
/// Letters are case-insensitive; `#`/`s` sharpen and `b` flattens. Octave
/// numbers follow the MIDI convention (C4 = middle C, may be negative).
pub fn parse_note(name: &str) -> Result<f64, ScaleError> {
    let invalid = || ScaleError::InvalidNoteName(name.to_string());
    let trimmed = name.trim();
    let mut chars = trimmed.chars();

    let letter = chars.next().ok_or_else(invalid)?;
    let pitch_class: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(invalid()),
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') | Some('s') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_str.parse().map_err(|_| invalid())?;
    if !(-1..=9).contains(&octave) {
        return Err(invalid());
    }

    let midi = (octave + 1) * 12 + pitch_class + accidental;
    Ok(midi_to_hz(f64::from(midi)))
}

pub fn midi_to_hz(midi: f64) -> f64 {
    A4_HZ * 2f64.powf((midi - f64::from(A4_MIDI)) / 12.0)
}

/// Nearest note name and the cents offset from it, e.g. `("A4", -3.9)`.
pub fn nearest_note(hz: f64) -> Option<(String, f64)> {
    if !util::is_valid_frequency(hz) {
        return None;
    }
    let midi_float = f64::from(A4_MIDI) + util::semitones_between(A4_HZ, hz);
    let midi = midi_float.round();
    let cents = (midi_float - midi) * 100.0;

    let midi = midi as i64;
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    Some((format!("{name}{octave}"), cents))
}
