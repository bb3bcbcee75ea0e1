//! Effect setting records, addressed by the hex index stored in a phrase row.

use serde::{Deserialize, Serialize};

use super::table::Table;
use crate::modulate::scale::Scale;

/// Entries per settings table.
pub const SETTINGS_ENTRIES: usize = 255;
/// Rows in an arpeggio pattern.
pub const ARPEGGIO_ROWS: usize = 16;

/// Whether a row trigger starts an episode: only every Nth trigger, then with
/// a percentage chance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activation {
    /// Activate on every Nth trigger. 0 and 1 both mean every trigger.
    pub every: u8,
    /// Chance in percent (0–100) once the `every` gate passes.
    pub probability: u8,
}

impl Default for Activation {
    fn default() -> Self {
        Self {
            every: 1,
            probability: 100,
        }
    }
}

/// A burst of re-triggers spread over a number of beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetriggerSettings {
    /// Number of hits in the burst, including the row trigger itself.
    pub times: u8,
    pub beats: f32,
    pub start_rate: f32,
    pub end_rate: f32,
    /// Semitones added per hit.
    pub pitch_change: f32,
    /// Decibels added per hit.
    pub volume_db: f32,
    pub final_pitch_to_start: bool,
    pub final_volume_to_start: bool,
    pub activation: Activation,
}

impl Default for RetriggerSettings {
    fn default() -> Self {
        Self {
            times: 0,
            beats: 1.0,
            start_rate: 1.0,
            end_rate: 1.0,
            pitch_change: 0.0,
            volume_db: 0.0,
            final_pitch_to_start: false,
            final_volume_to_start: false,
            activation: Activation::default(),
        }
    }
}

/// A stretch ratio interpolated over a number of beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestretchSettings {
    pub start: f32,
    pub end: f32,
    pub beats: f32,
    pub activation: Activation,
}

impl TimestretchSettings {
    /// An untouched entry stretches nothing.
    pub fn is_configured(&self) -> bool {
        *self != Self::default()
    }
}

impl Default for TimestretchSettings {
    fn default() -> Self {
        Self {
            start: 1.0,
            end: 1.0,
            beats: 0.0,
            activation: Activation::default(),
        }
    }
}

/// Note modulation: randomization, offsets, scale and increment walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulateSettings {
    /// `-1` disables randomization, `0` draws from the track stream, a
    /// positive seed draws from a fresh generator seeded with it.
    pub seed: i32,
    /// Upper bound (inclusive) of the random draw that replaces the note.
    pub irandom: i32,
    pub sub: i32,
    pub add: i32,
    /// Semitones added per application of this entry.
    pub increment: i32,
    /// Counter wrap; 0 means never wrap.
    pub wrap: i32,
    pub scale: Scale,
    pub scale_root: u8,
}

impl Default for ModulateSettings {
    fn default() -> Self {
        Self {
            seed: -1,
            irandom: 0,
            sub: 0,
            add: 0,
            increment: 0,
            wrap: 0,
            scale: Scale::All,
            scale_root: 0,
        }
    }
}

/// Traversal direction of one arpeggio row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArpDirection {
    #[default]
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggioRow {
    pub direction: ArpDirection,
    /// Notes played by this row.
    pub count: u8,
    /// Steps per beat.
    pub divisor: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggioSettings {
    pub rows: [ArpeggioRow; ARPEGGIO_ROWS],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckingSettings {
    /// Ducking depth, 0.0–1.0.
    pub depth: f32,
    pub attack: f32,
    pub release: f32,
    pub bus: u8,
}

impl Default for DuckingSettings {
    fn default() -> Self {
        Self {
            depth: 0.0,
            attack: 0.01,
            release: 0.2,
            bus: 0,
        }
    }
}

/// All effect settings tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsTables {
    pub retrigger: Table<RetriggerSettings, SETTINGS_ENTRIES>,
    pub timestretch: Table<TimestretchSettings, SETTINGS_ENTRIES>,
    pub modulate: Table<ModulateSettings, SETTINGS_ENTRIES>,
    pub arpeggio: Table<ArpeggioSettings, SETTINGS_ENTRIES>,
    pub ducking: Table<DuckingSettings, SETTINGS_ENTRIES>,
}
