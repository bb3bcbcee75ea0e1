//! Tick clock: converts BPM × PPQ into a tick period.
//!
//! The clock is plain data; [`ClockRunner`] drives a callback from it on a
//! dedicated thread. Tempo changes are read before every wait, so a new BPM or
//! PPQ applies from the next scheduled tick.

pub mod runner;

pub use runner::ClockRunner;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

/// Valid tempo range.
pub const BPM_MIN: f64 = 1.0;
pub const BPM_MAX: f64 = 999.0;
/// Valid pulses-per-quarter-note range.
pub const PPQ_MIN: u32 = 1;
pub const PPQ_MAX: u32 = 32;

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_PPQ: u32 = 4;

/// Tempo settings shared between the player and its clock thread.
pub type SharedClock = Arc<Mutex<Clock>>;

/// Tempo and resolution of the tick source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    bpm: f64,
    ppq: u32,
}

impl Clock {
    /// Create a clock, clamping both values into their valid ranges.
    pub fn new(bpm: f64, ppq: u32) -> Self {
        Self {
            bpm: clamp_bpm(bpm),
            ppq: clamp_ppq(ppq),
        }
    }

    pub fn into_shared(self) -> SharedClock {
        Arc::new(Mutex::new(self))
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = clamp_bpm(bpm);
    }

    pub fn set_ppq(&mut self, ppq: u32) {
        self.ppq = clamp_ppq(ppq);
    }

    /// Seconds between ticks: `60 / (bpm × ppq)`.
    pub fn period_secs(&self) -> f64 {
        60.0 / (self.bpm * self.ppq as f64)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.period_secs())
    }

    /// Ticks spanned by a number of beats (quarter notes).
    pub fn beats_to_ticks(&self, beats: f64) -> f64 {
        beats.max(0.0) * self.ppq as f64
    }

    /// Seconds spanned by a number of beats.
    pub fn beats_to_secs(&self, beats: f64) -> f64 {
        beats.max(0.0) * 60.0 / self.bpm
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, DEFAULT_PPQ)
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        debug!("bpm is NaN, using {DEFAULT_BPM}");
        return DEFAULT_BPM;
    }
    let clamped = bpm.clamp(BPM_MIN, BPM_MAX);
    if clamped != bpm {
        debug!("bpm {bpm} clamped to {clamped}");
    }
    clamped
}

fn clamp_ppq(ppq: u32) -> u32 {
    let clamped = ppq.clamp(PPQ_MIN, PPQ_MAX);
    if clamped != ppq {
        debug!("ppq {ppq} clamped to {clamped}");
    }
    clamped
}
