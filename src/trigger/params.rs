//! Column value mappings from hex cells to synth parameter units.

use crate::model::Slot;

/// Highest value a hex column can hold.
const COLUMN_MAX: f32 = 254.0;
const CUTOFF_MIN_HZ: f32 = 20.0;
const CUTOFF_MAX_HZ: f32 = 20_000.0;

/// Pitch column to semitones: `80` is 0, the ends reach ±24.
pub fn pitch_semitones(value: u8) -> f32 {
    ((f32::from(value) - 128.0) / 127.0 * 24.0).clamp(-24.0, 24.0)
}

/// Gate column to a fraction of the row length: `80` is a full gate.
pub fn gate_fraction(value: u8) -> f32 {
    f32::from(value) / 128.0
}

/// Pan column to `-1.0..=1.0`: `80` is centre.
pub fn pan_position(value: u8) -> f32 {
    ((f32::from(value) - 128.0) / 127.0).clamp(-1.0, 1.0)
}

/// Velocity column to `0.0..=1.0`.
pub fn velocity_amount(value: u8) -> f32 {
    (f32::from(value) / 127.0).min(1.0)
}

/// Exponential cutoff between 20 Hz and 20 kHz; unset uses `open`.
fn cutoff_hz(value: Slot, open: f32) -> f32 {
    match value.get() {
        Some(v) => CUTOFF_MIN_HZ * (CUTOFF_MAX_HZ / CUTOFF_MIN_HZ).powf(f32::from(v) / COLUMN_MAX),
        None => open,
    }
}

/// Low-pass cutoff; unset leaves the filter fully open.
pub fn lowpass_hz(value: Slot) -> f32 {
    cutoff_hz(value, CUTOFF_MAX_HZ)
}

/// High-pass cutoff; unset leaves the filter fully open.
pub fn highpass_hz(value: Slot) -> f32 {
    cutoff_hz(value, CUTOFF_MIN_HZ)
}

/// Send amounts (comb, reverb) to `0.0..=1.0`; unset is dry.
pub fn send_amount(value: Slot) -> f32 {
    value.get().map_or(0.0, |v| f32::from(v) / COLUMN_MAX)
}

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
