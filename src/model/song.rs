//! Song grid and chains: the two outer levels of a composition.

use serde::{Deserialize, Serialize};

use super::slot::Slot;
use super::table::Table;

/// Tracks in a song.
pub const TRACKS: usize = 8;
/// Rows in the song grid.
pub const SONG_ROWS: usize = 16;
/// Rows per chain.
pub const CHAIN_ROWS: usize = 16;

/// One song column: the chain slot for each song row.
pub type SongColumn = Table<Slot, SONG_ROWS>;

/// The song grid: 8 tracks × 16 rows of chain slots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Song {
    tracks: Table<SongColumn, TRACKS>,
}

impl Song {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain assigned at `(track, row)`. Out-of-range coordinates read empty.
    pub fn cell(&self, track: usize, row: usize) -> Slot {
        self.tracks
            .get(track)
            .and_then(|column| column.get(row))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_cell(&mut self, track: usize, row: usize, chain: Slot) -> bool {
        self.tracks
            .get_mut(track)
            .map(|column| column.set(row, chain))
            .unwrap_or(false)
    }
}

/// A chain: 16 rows of phrase slots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    rows: Table<Slot, CHAIN_ROWS>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phrase slot at `row`; out of range reads empty.
    pub fn phrase_at(&self, row: usize) -> Slot {
        self.rows.get(row).copied().unwrap_or_default()
    }

    pub fn set_phrase(&mut self, row: usize, phrase: Slot) -> bool {
        self.rows.set(row, phrase)
    }

    /// A chain with no phrase assigned on any row.
    pub fn is_empty(&self) -> bool {
        !self.rows.iter().any(|slot| slot.is_set())
    }
}
