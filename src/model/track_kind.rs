//! Track kinds and their static column layouts.

use serde::{Deserialize, Serialize};

/// What a track plays. Selects the chain/phrase pool and the row columns that
/// apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackKind {
    Instrument,
    #[default]
    Sampler,
}

/// A phrase column as laid out in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Note,
    Pitch,
    DeltaTime,
    Gate,
    Retrigger,
    Timestretch,
    Modulate,
    Reverse,
    Pan,
    LowPass,
    HighPass,
    Comb,
    Reverb,
    Ducking,
    File,
    Chord,
    Addition,
    Transpose,
    Arpeggio,
    Midi,
    Soundmaker,
    Attack,
    Decay,
    Sustain,
    Release,
    Velocity,
}

const SAMPLER_COLUMNS: &[Column] = &[
    Column::Note,
    Column::Pitch,
    Column::DeltaTime,
    Column::Gate,
    Column::Retrigger,
    Column::Timestretch,
    Column::Modulate,
    Column::Reverse,
    Column::Pan,
    Column::LowPass,
    Column::HighPass,
    Column::Comb,
    Column::Reverb,
    Column::Ducking,
    Column::File,
];

const INSTRUMENT_COLUMNS: &[Column] = &[
    Column::Note,
    Column::DeltaTime,
    Column::Chord,
    Column::Addition,
    Column::Transpose,
    Column::Arpeggio,
    Column::Modulate,
    Column::Retrigger,
    Column::Midi,
    Column::Soundmaker,
    Column::Attack,
    Column::Decay,
    Column::Sustain,
    Column::Release,
    Column::Velocity,
    Column::Pan,
    Column::Gate,
    Column::Ducking,
];

impl TrackKind {
    /// Instrument tracks turn rows into MIDI notes (with chords/arpeggios).
    pub fn resolves_note(self) -> bool {
        matches!(self, TrackKind::Instrument)
    }

    /// Sampler tracks turn rows into sample-file slices.
    pub fn resolves_sample(self) -> bool {
        matches!(self, TrackKind::Sampler)
    }

    /// Editor column order for this kind.
    pub fn columns(self) -> &'static [Column] {
        match self {
            TrackKind::Instrument => INSTRUMENT_COLUMNS,
            TrackKind::Sampler => SAMPLER_COLUMNS,
        }
    }

    /// Map an editor column index to its data column.
    pub fn column_at(self, index: usize) -> Option<Column> {
        self.columns().get(index).copied()
    }

    pub fn has_column(self, column: Column) -> bool {
        self.columns().contains(&column)
    }
}
