//! Note resolution: turns a phrase row into the note(s) a track should play.
//!
//! Resolution applies, in order: sticky inheritance of note and file columns,
//! the row's modulation entry (randomize, offset, quantize, clamp), the entry's
//! increment walk, and finally chord expansion on instrument tracks.

pub mod chord;

pub use chord::chord_notes;

use crate::model::{PhraseRow, SettingsTables, TrackKind};
use crate::modulate::{self, IncrementCounters, TrackRng};

/// Last non-empty values seen by a track, inherited by rows that leave the
/// column empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StickyColumns {
    pub note: Option<u8>,
    pub dt: Option<u32>,
    pub file: Option<u8>,
}

impl StickyColumns {
    fn absorb(&mut self, row: &PhraseRow) {
        if let Some(note) = row.note.get() {
            self.note = Some(note);
        }
        if let Some(dt) = row.delta_time() {
            self.dt = Some(dt);
        }
        if let Some(file) = row.file.get() {
            self.file = Some(file);
        }
    }
}

/// A row ready to trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    pub kind: TrackKind,
    /// Effective note after modulation.
    pub note: u8,
    /// Chord notes for instrument tracks; `[note]` otherwise.
    pub notes: Vec<u8>,
    /// Ticks the row is held.
    pub dt: u32,
    /// Sample file index (sticky); always `None` on instrument tracks.
    pub file: Option<u8>,
    /// The source row, for the remaining parameter columns.
    pub row: PhraseRow,
}

/// Per-track mutable state the resolver needs.
pub struct ResolveState<'a> {
    pub sticky: &'a mut StickyColumns,
    pub rng: &'a mut TrackRng,
    pub counters: &'a mut IncrementCounters,
}

/// Resolve a row for a track of `kind`.
///
/// Returns `None` when the row must not sound: its delta time is empty or
/// zero, there is no note to play even after inheritance, or a sampler row
/// has no file. A modulation index that points nowhere is ignored.
pub fn resolve_row(
    row: &PhraseRow,
    kind: TrackKind,
    settings: &SettingsTables,
    state: ResolveState<'_>,
) -> Option<ResolvedRow> {
    let dt = row.delta_time()?;
    state.sticky.absorb(row);

    let base = state.sticky.note?;
    let file = if kind.resolves_sample() {
        Some(state.sticky.file?)
    } else {
        None
    };

    let note = match (row.modulate.get(), settings.modulate.get_slot(row.modulate)) {
        (Some(entry), Some(m)) => {
            let modulated = modulate::modulate(i32::from(base), m, state.rng);
            let counter = if m.increment > 0 {
                state.counters.next(entry)
            } else {
                -1
            };
            let walked = modulate::apply_increment(i32::from(modulated), m.increment, counter, m.wrap);
            modulate::clamp_note(walked)
        }
        _ => base,
    };

    let notes = if kind.resolves_note() {
        chord_notes(note, row.chord, row.addition, row.transpose)
    } else {
        vec![note]
    };

    Some(ResolvedRow {
        kind,
        note,
        notes,
        dt,
        file,
        row: *row,
    })
}
