//! Musical scales and nearest-tone quantization.

use serde::{Deserialize, Serialize};

/// A scale used to quantize modulated notes. `All` disables quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scale {
    #[default]
    All,
    Major,
    Minor,
    HarmonicMinor,
    MelodicMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    PentatonicMajor,
    PentatonicMinor,
    Blues,
    WholeTone,
}

impl Scale {
    /// Scale tones as semitones above the root, in scan order.
    pub fn tones(self) -> &'static [u8] {
        match self {
            Scale::All => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Scale::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Scale::PentatonicMajor => &[0, 2, 4, 7, 9],
            Scale::PentatonicMinor => &[0, 3, 5, 7, 10],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
            Scale::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }

    /// Parse a lowercase scale name as shown in the editor.
    pub fn from_name(name: &str) -> Option<Self> {
        let scale = match name {
            "all" => Scale::All,
            "major" => Scale::Major,
            "minor" => Scale::Minor,
            "harmonic minor" => Scale::HarmonicMinor,
            "melodic minor" => Scale::MelodicMinor,
            "dorian" => Scale::Dorian,
            "phrygian" => Scale::Phrygian,
            "lydian" => Scale::Lydian,
            "mixolydian" => Scale::Mixolydian,
            "locrian" => Scale::Locrian,
            "pentatonic major" => Scale::PentatonicMajor,
            "pentatonic minor" => Scale::PentatonicMinor,
            "blues" => Scale::Blues,
            "whole tone" => Scale::WholeTone,
            _ => return None,
        };
        Some(scale)
    }
}

/// Snap `note` to the closest tone of `scale` transposed to `root`.
///
/// Distance is measured around the octave circle, and the result stays in the
/// note's own octave. On a tie the tone that comes first in the scale's tone
/// list wins, so C in D major lands on the B above it (71) rather than the C#.
pub fn quantize(note: i32, scale: Scale, root: u8) -> i32 {
    if scale == Scale::All {
        return note;
    }
    let octave_start = i64::from(note) - i64::from(note.rem_euclid(12));
    let pitch_class = note.rem_euclid(12);

    let mut closest = pitch_class;
    let mut best = i32::MAX;
    for &tone in scale.tones() {
        let transposed = (i32::from(tone) + i32::from(root)).rem_euclid(12);
        let mut distance = (pitch_class - transposed).abs();
        if distance > 6 {
            distance = 12 - distance;
        }
        if distance < best {
            best = distance;
            closest = transposed;
        }
    }
    (octave_start + i64::from(closest)).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
