/// How the full timestamp range of a playlist is compressed into playback time.
///
/// All quantities are seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "kebab-case")
)]
pub enum ScorePolicy {
    /// Score length follows the tempo: `note_duration * len / notes_per_score`.
    /// Notes are held between one and two note durations.
    Tempo { notes_per_score: f64 },
    /// Every point gets `per_point` seconds of score regardless of tempo.
    /// Notes are held between fixed bounds.
    Fixed {
        per_point: f64,
        min_note: f64,
        max_note: f64,
    },
}

impl Default for ScorePolicy {
    fn default() -> Self {
        ScorePolicy::Tempo {
            notes_per_score: 4.0,
        }
    }
}

impl ScorePolicy {
    /// Wall-clock budget for one pass over `len` points
    pub fn score_duration(&self, note_duration: f64, len: usize) -> f64 {
        let len = len as f64;
        match *self {
            ScorePolicy::Tempo { notes_per_score } => {
                let divisor = if notes_per_score.is_finite() && notes_per_score > 0.0 {
                    notes_per_score
                } else {
                    1.0
                };
                note_duration * len / divisor
            }
            ScorePolicy::Fixed { per_point, .. } => per_point.max(0.0) * len,
        }
    }

    /// Lower and upper bound on an audible note's length
    pub fn note_bounds(&self, note_duration: f64) -> (f64, f64) {
        match *self {
            ScorePolicy::Tempo { .. } => (note_duration, note_duration * 2.0),
            ScorePolicy::Fixed {
                min_note, max_note, ..
            } => (min_note, max_note.max(min_note)),
        }
    }

    /// Clamp a raw note length into the bounds; never panics on NaN or inverted bounds
    pub fn clamp_note(&self, raw: f64, note_duration: f64) -> f64 {
        let (lower, upper) = self.note_bounds(note_duration);
        if raw.is_nan() {
            return lower;
        }
        raw.max(lower).min(upper)
    }
}
