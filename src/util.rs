/// Signed distance in semitones from `base` to `other`.
///
/// 12 semitones = 1 octave = doubling of frequency, so
///   semitones = 12 * log2(other / base)
///
/// Callers must validate both frequencies first (see `is_valid_frequency`);
/// a zero or negative input here would produce NaN or infinity.
pub fn semitones_between(base: f64, other: f64) -> f64 {
    12.0 * (other / base).log2()
}

/// Wrap a signed semitone value onto the [0, 12) pitch-class ring.
pub fn normalize_semitones(semitones: f64) -> f64 {
    let wrapped = (semitones % 12.0 + 12.0) % 12.0;
    // -1e-15 % 12 + 12 rounds to exactly 12.0 in f64
    if wrapped >= 12.0 {
        0.0
    } else {
        wrapped
    }
}

/// Shortest distance between two normalized semitone values on the ring.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 12.0;
    d.min(12.0 - d)
}

/// Signed shortest offset from `target` to `detected` on the ring, in (-6, 6].
pub fn circular_offset(target: f64, detected: f64) -> f64 {
    let mut d = (detected - target) % 12.0;
    if d > 6.0 {
        d -= 12.0;
    } else if d <= -6.0 {
        d += 12.0;
    }
    d
}

/// A usable pitch: finite and strictly positive.
pub fn is_valid_frequency(hz: f64) -> bool {
    hz.is_finite() && hz > 0.0
}

/// Clamp a score into [0, 100]. NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by n, not n - 1).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Compare the mean of the newest `window` values against the `window`
/// values before them. Returns `(older_mean, recent_mean)`, or None when
/// there isn't enough history for two full windows.
pub fn split_window_means(values: &[f64], window: usize) -> Option<(f64, f64)> {
    if window == 0 || values.len() < window * 2 {
        return None;
    }
    let n = values.len();
    let recent = &values[n - window..];
    let older = &values[n - window * 2..n - window];
    Some((mean(older), mean(recent)))
}
