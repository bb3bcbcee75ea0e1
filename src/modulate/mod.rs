//! Note modulation: randomization, offsets, scale quantization, increment walks.
//!
//! [`modulate`] is pure apart from the random stream it is handed. Each track
//! owns its own [`TrackRng`], seeded once when that track starts playing, so
//! seeded sessions replay identically.

pub mod scale;

pub use scale::{quantize, Scale};

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::model::ModulateSettings;

/// Lowest and highest MIDI note.
pub const NOTE_MIN: i32 = 0;
pub const NOTE_MAX: i32 = 127;

/// Per-track random stream.
pub type TrackRng = ChaCha8Rng;

/// Create a track stream: from `seed` when given, otherwise from the clock.
pub fn track_rng(seed: Option<u64>) -> TrackRng {
    let seed = seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });
    ChaCha8Rng::seed_from_u64(seed)
}

/// Apply a modulation entry to `note` and clamp to `0..=127`.
///
/// Randomization is skipped when `seed == -1`. Otherwise, with a positive
/// `irandom`, a value in `0..=irandom` replaces the note: drawn from a fresh
/// generator for a positive seed (the same value every call), or from `rng`
/// for seed 0. `sub` and `add` are applied next, then scale quantization.
pub fn modulate<R: Rng>(note: i32, settings: &ModulateSettings, rng: &mut R) -> u8 {
    let mut value = note;

    if settings.seed != -1 && settings.irandom > 0 {
        value = if settings.seed > 0 {
            let mut seeded = ChaCha8Rng::seed_from_u64(settings.seed as u64);
            seeded.gen_range(0..=settings.irandom)
        } else {
            rng.gen_range(0..=settings.irandom)
        };
    }

    value = value.saturating_sub(settings.sub).saturating_add(settings.add);

    if settings.scale != Scale::All {
        value = quantize(value, settings.scale, settings.scale_root);
    }

    clamp_note(value)
}

/// Add `increment × (counter mod wrap)` to `note`. A `wrap` of 0 leaves the
/// counter unbounded. Negative counters and non-positive increments do nothing.
pub fn apply_increment(note: i32, increment: i32, counter: i64, wrap: i32) -> i32 {
    if counter < 0 || increment <= 0 {
        return note;
    }
    let steps = if wrap > 0 {
        counter % i64::from(wrap)
    } else {
        counter
    };
    let offset = i64::from(increment).saturating_mul(steps);
    i64::from(note)
        .saturating_add(offset)
        .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

pub fn clamp_note(value: i32) -> u8 {
    value.clamp(NOTE_MIN, NOTE_MAX) as u8
}

/// Increment counters for one track, keyed by modulation entry.
#[derive(Debug, Clone, Default)]
pub struct IncrementCounters {
    counts: HashMap<u8, i64>,
}

impl IncrementCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `entry`, then advance it.
    pub fn next(&mut self, entry: u8) -> i64 {
        let count = self.counts.entry(entry).or_insert(0);
        let current = *count;
        *count += 1;
        current
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}
