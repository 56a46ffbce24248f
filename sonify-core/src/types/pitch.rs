use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// A pitch symbol such as `C#4` or `Eb3`.
///
/// Chromatic pitch class (0=C .. 11=B) plus a scientific-pitch octave
/// (4 = middle C). The spelling only affects display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pitch {
    pitch_class: u8,
    octave: i8,
    spelling: Spelling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Spelling {
    Sharp,
    Flat,
}

/// 12-TET frequencies for the 4th octave (C4-B4), A4 = 440Hz
const BASE_OCTAVE_FREQUENCIES: [f32; 12] = [
    261.63, // C4
    277.18, // C#4/Db4
    293.66, // D4
    311.13, // D#4/Eb4
    329.63, // E4
    349.23, // F4
    369.99, // F#4/Gb4
    392.00, // G4
    415.30, // G#4/Ab4
    440.00, // A4
    466.16, // A#4/Bb4
    493.88, // B4
];

impl Pitch {
    /// Create a pitch from a chromatic pitch class (0-11) and octave
    pub fn new(pitch_class: u8, octave: i8) -> Result<Self> {
        if pitch_class > 11 {
            return Err(anyhow!("Pitch class must be 0-11, got {}", pitch_class));
        }

        Ok(Pitch {
            pitch_class,
            octave,
            spelling: Spelling::Sharp,
        })
    }

    pub fn pitch_class(&self) -> u8 {
        self.pitch_class
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// Spell accidentals with flats (`Db`) instead of sharps (`C#`)
    pub fn flat(mut self) -> Self {
        self.spelling = Spelling::Flat;
        self
    }

    /// Whether this pitch was spelled with a flat
    pub fn prefers_flat(&self) -> bool {
        self.spelling == Spelling::Flat
    }

    /// Frequency in Hz
    pub fn frequency(&self) -> f32 {
        let base_freq = BASE_OCTAVE_FREQUENCIES[self.pitch_class as usize];
        base_freq * 2.0_f32.powi(self.octave as i32 - 4)
    }

    /// MIDI note number (C4 = 60), clamped to 0-127
    pub fn midi_number(&self) -> u8 {
        let midi = (self.octave as i16 + 1) * 12 + self.pitch_class as i16;
        midi.clamp(0, 127) as u8
    }

    /// Move by a number of semitones, carrying into the octave. Keeps the spelling.
    pub fn transpose(self, semitones: i32) -> Pitch {
        let absolute = self.pitch_class as i32 + semitones;
        Pitch {
            pitch_class: absolute.rem_euclid(12) as u8,
            octave: (self.octave as i32 + absolute.div_euclid(12)) as i8,
            spelling: self.spelling,
        }
    }

    /// Bare note name without octave, e.g. `F#`
    pub fn name(&self) -> &'static str {
        match (self.pitch_class, self.spelling) {
            (0, _) => "C",
            (1, Spelling::Sharp) => "C#",
            (1, Spelling::Flat) => "Db",
            (2, _) => "D",
            (3, Spelling::Sharp) => "D#",
            (3, Spelling::Flat) => "Eb",
            (4, _) => "E",
            (5, _) => "F",
            (6, Spelling::Sharp) => "F#",
            (6, Spelling::Flat) => "Gb",
            (7, _) => "G",
            (8, Spelling::Sharp) => "G#",
            (8, Spelling::Flat) => "Ab",
            (9, _) => "A",
            (10, Spelling::Sharp) => "A#",
            (10, Spelling::Flat) => "Bb",
            _ => "B",
        }
    }

    /// Split a note name into pitch class, spelling, octave carry and the rest.
    ///
    /// The carry is -1 for `Cb` and +1 for `B#`, whose pitch class wraps
    /// into the neighbouring octave.
    fn parse_name(s: &str) -> Result<(u8, Spelling, i8, &str)> {
        let upper = s.to_uppercase();
        let mut chars = upper.chars();
        let letter = chars.next().ok_or_else(|| anyhow!("Empty pitch"))?;
        let base: i8 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(anyhow!("Invalid note name: {}", s)),
        };

        // Second char may be an accidental; 'B' after the letter means flat
        let (semitone, spelling, rest) = match chars.next() {
            Some('#') | Some('S') => (base + 1, Spelling::Sharp, &s[2..]),
            Some('B') => (base - 1, Spelling::Flat, &s[2..]),
            _ => (base, Spelling::Sharp, &s[1..]),
        };
        Ok((
            semitone.rem_euclid(12) as u8,
            spelling,
            semitone.div_euclid(12),
            rest,
        ))
    }
}

impl FromStr for Pitch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !s.is_ascii() {
            return Err(anyhow!("Invalid pitch: {}", s));
        }
        let (pitch_class, spelling, carry, octave_part) = Self::parse_name(s)?;

        let written = if octave_part.is_empty() {
            4
        } else {
            octave_part
                .parse::<i8>()
                .map_err(|_| anyhow!("Invalid octave: {}", octave_part))?
        };
        let octave = written
            .checked_add(carry)
            .ok_or_else(|| anyhow!("Octave out of range: {}", s))?;

        Ok(Pitch {
            pitch_class,
            octave,
            spelling,
        })
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)
    }
}
