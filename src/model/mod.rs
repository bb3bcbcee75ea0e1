//! Composition data model: song grid, chain and phrase pools, effect tables.
//!
//! A [`Composition`] is read-only during playback. The editor mutates it
//! through [`SharedComposition`]'s write lock; the tick handler holds the read
//! lock for exactly one tick, so a cursor never observes a half-applied edit.

pub mod phrase;
pub mod settings;
pub mod slot;
pub mod song;
pub mod table;
pub mod track_kind;

pub use phrase::{ChordAddition, ChordType, Phrase, PhraseRow, PHRASE_ROWS};
pub use settings::{
    Activation, ArpDirection, ArpeggioRow, ArpeggioSettings, DuckingSettings, ModulateSettings,
    RetriggerSettings, SettingsTables, TimestretchSettings,
};
pub use slot::Slot;
pub use song::{Chain, Song, CHAIN_ROWS, SONG_ROWS, TRACKS};
pub use table::Table;
pub use track_kind::{Column, TrackKind};

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Chains and phrases per pool.
pub const POOL_ENTRIES: usize = 255;
/// Entries in the sample file table.
pub const FILE_ENTRIES: usize = 255;

/// One kind's chains and phrases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pool {
    pub chains: Table<Chain, POOL_ENTRIES>,
    pub phrases: Table<Phrase, POOL_ENTRIES>,
}

/// A sample file referenced by sampler rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleFile {
    pub path: PathBuf,
    /// Tempo the file was recorded at; 0 means unknown.
    pub bpm: f32,
    /// Number of equal slices the file is cut into.
    pub slices: u8,
}

impl SampleFile {
    pub fn slice_count(&self) -> u8 {
        self.slices.max(1)
    }
}

/// Everything playback reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    pub song: Song,
    pub track_kinds: [TrackKind; TRACKS],
    pub instrument: Pool,
    pub sampler: Pool,
    pub settings: SettingsTables,
    pub files: Table<SampleFile, FILE_ENTRIES>,
}

/// Composition shared between the editor and the clock thread.
pub type SharedComposition = Arc<RwLock<Composition>>;

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap for sharing with a player.
    pub fn into_shared(self) -> SharedComposition {
        Arc::new(RwLock::new(self))
    }

    /// Kind of a track; out-of-range tracks read as the default kind.
    pub fn track_kind(&self, track: usize) -> TrackKind {
        self.track_kinds.get(track).copied().unwrap_or_default()
    }

    pub fn set_track_kind(&mut self, track: usize, kind: TrackKind) {
        if let Some(slot) = self.track_kinds.get_mut(track) {
            *slot = kind;
        }
    }

    pub fn pool(&self, kind: TrackKind) -> &Pool {
        match kind {
            TrackKind::Instrument => &self.instrument,
            TrackKind::Sampler => &self.sampler,
        }
    }

    pub fn pool_mut(&mut self, kind: TrackKind) -> &mut Pool {
        match kind {
            TrackKind::Instrument => &mut self.instrument,
            TrackKind::Sampler => &mut self.sampler,
        }
    }

    pub fn chain(&self, kind: TrackKind, id: Slot) -> Option<&Chain> {
        self.pool(kind).chains.get_slot(id)
    }

    pub fn phrase(&self, kind: TrackKind, id: Slot) -> Option<&Phrase> {
        self.pool(kind).phrases.get_slot(id)
    }

    pub fn file(&self, index: Slot) -> Option<&SampleFile> {
        self.files
            .get_slot(index)
            .filter(|f| !f.path.as_os_str().is_empty())
    }

    pub fn from_yaml(src: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load a composition from a YAML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Save to a YAML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}
