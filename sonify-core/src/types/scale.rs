//! Named scales resolved into ascending pitch sequences

use super::pitch::Pitch;

/// Tonics offered for selection (sharps and flats are accepted as well)
pub const TONICS: [&str; 7] = ["C", "D", "E", "F", "G", "A", "B"];

/// Octave of the lowest resolved pitch
pub const ROOT_OCTAVE: i8 = 3;

/// Number of octaves a resolved scale spans
pub const OCTAVE_RANGE: i8 = 4;

/// Resolves a scale name and tonic into an ordered pitch sequence.
///
/// Implementations must be pure: the same two inputs always give the same
/// sequence. Unknown names resolve to an empty sequence.
pub trait ScaleProvider {
    fn resolve(&self, scale: &str, tonic: &str) -> Vec<Pitch>;

    /// Scale names this provider understands, in display order
    fn names(&self) -> Vec<&str>;

    fn contains(&self, scale: &str) -> bool {
        self.names().iter().any(|name| name.eq_ignore_ascii_case(scale))
    }
}

/// Interval sets in semitones above the tonic
const SCALES: &[(&str, &[u8])] = &[
    ("major", &[0, 2, 4, 5, 7, 9, 11]),
    ("minor", &[0, 2, 3, 5, 7, 8, 10]),
    ("dorian", &[0, 2, 3, 5, 7, 9, 10]),
    ("phrygian", &[0, 1, 3, 5, 7, 8, 10]),
    ("lydian", &[0, 2, 4, 6, 7, 9, 11]),
    ("mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
    ("locrian", &[0, 1, 3, 5, 6, 8, 10]),
    ("harmonic minor", &[0, 2, 3, 5, 7, 8, 11]),
    ("melodic minor", &[0, 2, 3, 5, 7, 9, 11]),
    ("major pentatonic", &[0, 2, 4, 7, 9]),
    ("minor pentatonic", &[0, 3, 5, 7, 10]),
    ("blues", &[0, 3, 5, 6, 7, 10]),
    ("whole tone", &[0, 2, 4, 6, 8, 10]),
    ("diminished", &[0, 2, 3, 5, 6, 8, 9, 11]),
    ("augmented", &[0, 3, 4, 7, 8, 11]),
    ("chromatic", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
    ("hirajoshi", &[0, 2, 3, 7, 8]),
    ("iwato", &[0, 1, 5, 6, 10]),
    ("kumoi", &[0, 2, 3, 7, 9]),
    ("pelog", &[0, 1, 3, 7, 8]),
    ("egyptian", &[0, 2, 5, 7, 10]),
    ("spanish", &[0, 1, 4, 5, 7, 8, 10]),
    ("romanian", &[0, 2, 3, 6, 7, 9, 10]),
    ("enigmatic", &[0, 1, 4, 6, 8, 10, 11]),
];

/// Built-in scale table spanning [`OCTAVE_RANGE`] octaves from [`ROOT_OCTAVE`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleTable;

impl ScaleTable {
    pub fn new() -> Self {
        ScaleTable
    }

    fn intervals(scale: &str) -> Option<&'static [u8]> {
        SCALES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(scale.trim()))
            .map(|(_, intervals)| *intervals)
    }

    /// Parse a tonic name (`C`, `F#`, `Bb`) into the root pitch
    pub fn tonic(tonic: &str) -> Option<Pitch> {
        let tonic = tonic.trim();
        // Octave digits belong to the table, not the tonic
        if tonic.is_empty() || tonic.chars().any(|c| c.is_ascii_digit() || c == '-') {
            return None;
        }
        let pitch: Pitch = tonic.parse().ok()?;
        let root = Pitch::new(pitch.pitch_class(), ROOT_OCTAVE).ok()?;
        Some(if pitch.prefers_flat() { root.flat() } else { root })
    }
}

impl ScaleProvider for ScaleTable {
    fn resolve(&self, scale: &str, tonic: &str) -> Vec<Pitch> {
        let (Some(intervals), Some(root)) = (Self::intervals(scale), Self::tonic(tonic)) else {
            return Vec::new();
        };

        (0..OCTAVE_RANGE as i32)
            .flat_map(|octave| {
                intervals
                    .iter()
                    .map(move |&interval| root.transpose(octave * 12 + interval as i32))
            })
            .collect()
    }

    fn names(&self) -> Vec<&str> {
        SCALES.iter().map(|(name, _)| *name).collect()
    }
}
