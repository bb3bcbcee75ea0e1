//! Phrases: 255 rows of typed columns, the innermost level of a composition.

use serde::{Deserialize, Serialize};

use super::slot::Slot;
use super::table::Table;

/// Rows per phrase.
pub const PHRASE_ROWS: usize = 255;

/// Virtual default for the pitch column (no transposition).
pub const PITCH_DEFAULT: u8 = 0x80;
/// Virtual default for the gate column (full gate).
pub const GATE_DEFAULT: u8 = 0x80;
/// Virtual default for the pan column (centre).
pub const PAN_DEFAULT: u8 = 0x80;
/// Virtual default for the velocity column.
pub const VELOCITY_DEFAULT: u8 = 0x60;

/// Chord quality for instrument rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChordType {
    #[default]
    None,
    Major,
    Minor,
    Dominant,
}

/// Extra tone appended after the chord's base intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChordAddition {
    #[default]
    None,
    Seventh,
    Ninth,
    Fourth,
}

/// One phrase row.
///
/// Columns that only instrument tracks read (chord through velocity) are
/// carried by every row; sampler tracks ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseRow {
    pub note: Slot,
    pub pitch: Slot,
    /// Delta time: ticks to hold this row. Empty or zero skips the row.
    pub dt: Slot,
    pub gate: Slot,
    pub retrigger: Slot,
    pub timestretch: Slot,
    pub modulate: Slot,
    pub reverse: bool,
    pub pan: Slot,
    pub lpf: Slot,
    pub hpf: Slot,
    pub comb: Slot,
    pub reverb: Slot,
    pub ducking: Slot,
    pub file: Slot,

    pub chord: ChordType,
    pub addition: ChordAddition,
    pub transpose: u8,
    pub arpeggio: Slot,
    pub midi: Slot,
    pub soundmaker: Slot,
    pub attack: Slot,
    pub decay: Slot,
    pub sustain: Slot,
    pub release: Slot,
    pub velocity: Slot,
}

impl PhraseRow {
    /// Ticks to hold this row, or `None` when the row must not trigger.
    pub fn delta_time(&self) -> Option<u32> {
        self.dt.get().filter(|&dt| dt > 0).map(u32::from)
    }

    /// Whether this row triggers when the cursor reaches it.
    pub fn is_playable(&self) -> bool {
        self.delta_time().is_some()
    }

    pub fn pitch_value(&self) -> u8 {
        self.pitch.or_default(PITCH_DEFAULT)
    }

    pub fn gate_value(&self) -> u8 {
        self.gate.or_default(GATE_DEFAULT)
    }

    pub fn pan_value(&self) -> u8 {
        self.pan.or_default(PAN_DEFAULT)
    }

    pub fn velocity_value(&self) -> u8 {
        self.velocity.or_default(VELOCITY_DEFAULT)
    }
}

/// A phrase: a fixed table of rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phrase {
    rows: Table<PhraseRow, PHRASE_ROWS>,
}

impl Phrase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, index: usize) -> Option<&PhraseRow> {
        self.rows.get(index)
    }

    pub fn set_row(&mut self, index: usize, row: PhraseRow) -> bool {
        self.rows.set(index, row)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut PhraseRow> {
        self.rows.get_mut(index)
    }

    /// A phrase with no playable row produces no sound at all.
    pub fn is_silent(&self) -> bool {
        !self.rows.iter().any(PhraseRow::is_playable)
    }
}
