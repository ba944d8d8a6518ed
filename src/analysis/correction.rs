use serde::{Deserialize, Serialize};

use crate::util;

/// Readings below this fraction of the top of the range are suspected
/// sub-harmonics.
const SUBHARMONIC_RATIO: f64 = 0.55;

/// Slack around the target range when checking whether the doubled
/// reading is plausible.
const RANGE_LOW_SLACK: f64 = 0.8;
const RANGE_HIGH_SLACK: f64 = 1.2;

/// Inclusive frequency range the singer is expected to land in,
/// typically one octave from do to do'.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRange {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl TargetRange {
    pub fn new(min_hz: f64, max_hz: f64) -> Self {
        Self { min_hz, max_hz }
    }

    fn is_usable(&self) -> bool {
        util::is_valid_frequency(self.min_hz)
            && util::is_valid_frequency(self.max_hz)
            && self.min_hz <= self.max_hz
    }
}

/// Hint produced by an upstream correction stage and consumed by the
/// scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicCorrection {
    pub corrected_frequency: f64,
    /// Multiplicative factor applied to the raw reading (1.0 = unchanged).
    pub correction: f64,
}

/// Map a raw detected frequency onto the most plausible fundamental.
///
/// Autocorrelation-style detectors often lock onto half the true frequency
/// on low voices. If the reading sits well below the range and doubling it
/// lands inside the (slightly widened) range, the doubled value is used.
///
/// Only readings already below the widened range are candidates. A doubled
/// value lands inside that range, so correcting twice is a no-op.
pub fn correct_octave(raw_hz: f64, range: TargetRange) -> f64 {
    if !util::is_valid_frequency(raw_hz) || !range.is_usable() {
        return raw_hz;
    }

    let low = RANGE_LOW_SLACK * range.min_hz;
    let high = RANGE_HIGH_SLACK * range.max_hz;
    if raw_hz >= SUBHARMONIC_RATIO * range.max_hz || raw_hz >= low {
        return raw_hz;
    }

    let doubled = raw_hz * 2.0;
    if (low..=high).contains(&doubled) {
        doubled
    } else {
        raw_hz
    }
}

/// Run the corrector and package the result as a hint for the engine.
pub fn correction_hint(raw_hz: f64, range: TargetRange) -> HarmonicCorrection {
    let corrected = correct_octave(raw_hz, range);
    let correction = if util::is_valid_frequency(raw_hz) {
        corrected / raw_hz
    } else {
        1.0
    };
    HarmonicCorrection {
        corrected_frequency: corrected,
        correction,
    }
}
