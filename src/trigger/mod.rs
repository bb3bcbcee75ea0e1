//! Trigger emission: the outward boundary of playback.
//!
//! A [`Trigger`] is a fully resolved instruction for the external synth. The
//! sequencer builds them and hands them to a [`TriggerSink`]; sinks decide
//! nothing and must never block the tick.

pub mod osc;
pub mod params;

pub use osc::OscEmitter;

use std::fmt;
use std::path::PathBuf;

use crate::effect::{RetriggerHit, StretchParams};
use crate::model::{Composition, DuckingSettings};
use crate::resolve::ResolvedRow;

/// Optional envelope columns of an instrument row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Envelope {
    pub attack: Option<u8>,
    pub decay: Option<u8>,
    pub sustain: Option<u8>,
    pub release: Option<u8>,
}

/// Play one or more notes on an instrument track.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentTrigger {
    pub track: usize,
    /// MIDI notes sounding together (a chord, or merged arpeggio steps).
    pub notes: Vec<u8>,
    /// 0.0–1.0.
    pub velocity: f32,
    pub envelope: Envelope,
    pub midi: Option<u8>,
    pub soundmaker: Option<u8>,
}

/// Play a slice of a sample file on a sampler track.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerTrigger {
    pub track: usize,
    pub path: PathBuf,
    pub slice: u8,
    pub slices: u8,
    pub source_bpm: f32,
    pub target_bpm: f32,
    /// Semitones.
    pub pitch: f32,
    pub gate: f32,
    pub pan: f32,
    pub lowpass_hz: f32,
    pub highpass_hz: f32,
    pub comb: f32,
    pub reverb: f32,
    pub ducking: Option<DuckingSettings>,
    pub reverse: bool,
    pub retrigger: Option<RetriggerHit>,
    pub stretch: Option<StretchParams>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Instrument(InstrumentTrigger),
    Sampler(SamplerTrigger),
}

impl Trigger {
    pub fn track(&self) -> usize {
        match self {
            Trigger::Instrument(t) => t.track,
            Trigger::Sampler(t) => t.track,
        }
    }

    /// First note of an instrument trigger.
    pub fn note(&self) -> Option<u8> {
        match self {
            Trigger::Instrument(t) => t.notes.first().copied(),
            Trigger::Sampler(_) => None,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Instrument(t) => write!(
                f,
                "T{} instrument notes={:?} vel={:.2}",
                t.track, t.notes, t.velocity
            ),
            Trigger::Sampler(t) => {
                write!(
                    f,
                    "T{} sampler {} slice={}/{} pitch={:+.1}",
                    t.track,
                    t.path.display(),
                    t.slice,
                    t.slices,
                    t.pitch
                )?;
                if let Some(hit) = &t.retrigger {
                    write!(f, " retrig={}/{}", hit.index + 1, hit.times)?;
                }
                if let Some(s) = &t.stretch {
                    write!(f, " stretch={:.2}", s.ratio)?;
                }
                Ok(())
            }
        }
    }
}

/// Receives triggers. Implementations must return quickly.
pub trait TriggerSink {
    fn emit(&mut self, tick: u64, trigger: Trigger);
}

impl<T: TriggerSink + ?Sized> TriggerSink for Box<T> {
    fn emit(&mut self, tick: u64, trigger: Trigger) {
        (**self).emit(tick, trigger);
    }
}

/// Collects triggers in memory.
#[derive(Debug, Clone, Default)]
pub struct TriggerLog {
    entries: Vec<(u64, Trigger)>,
}

impl TriggerLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(u64, Trigger)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Triggers emitted for one track.
    pub fn for_track(&self, track: usize) -> impl Iterator<Item = &(u64, Trigger)> {
        self.entries.iter().filter(move |(_, t)| t.track() == track)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl TriggerSink for TriggerLog {
    fn emit(&mut self, tick: u64, trigger: Trigger) {
        self.entries.push((tick, trigger));
    }
}

/// Build an instrument trigger. A retrigger hit shifts the notes by its
/// rounded pitch offset and scales velocity by its gain.
pub fn instrument_trigger(
    track: usize,
    source: &ResolvedRow,
    notes: Vec<u8>,
    hit: Option<&RetriggerHit>,
) -> InstrumentTrigger {
    let row = &source.row;
    let mut velocity = params::velocity_amount(row.velocity_value());
    let mut notes = notes;
    if let Some(hit) = hit {
        velocity = (velocity * params::db_to_gain(hit.volume_db)).clamp(0.0, 1.0);
        let shift = hit.pitch.round() as i32;
        notes = notes
            .into_iter()
            .map(|n| crate::modulate::clamp_note(i32::from(n) + shift))
            .collect();
    }
    InstrumentTrigger {
        track,
        notes,
        velocity,
        envelope: Envelope {
            attack: row.attack.get(),
            decay: row.decay.get(),
            sustain: row.sustain.get(),
            release: row.release.get(),
        },
        midi: row.midi.get(),
        soundmaker: row.soundmaker.get(),
    }
}

/// Build a sampler trigger. Returns `None` when the row's file index has no
/// file behind it.
pub fn sampler_trigger(
    track: usize,
    source: &ResolvedRow,
    composition: &Composition,
    target_bpm: f64,
    retrigger: Option<RetriggerHit>,
    stretch: Option<StretchParams>,
) -> Option<SamplerTrigger> {
    let row = &source.row;
    let file = composition.file(source.file.into())?;
    let slices = file.slice_count();
    let ducking = composition
        .settings
        .ducking
        .get_slot(row.ducking)
        .copied()
        .filter(|_| row.ducking.is_set());

    Some(SamplerTrigger {
        track,
        path: file.path.clone(),
        slice: source.note % slices,
        slices,
        source_bpm: file.bpm,
        target_bpm: target_bpm as f32,
        pitch: params::pitch_semitones(row.pitch_value()),
        gate: params::gate_fraction(row.gate_value()),
        pan: params::pan_position(row.pan_value()),
        lowpass_hz: params::lowpass_hz(row.lpf),
        highpass_hz: params::highpass_hz(row.hpf),
        comb: params::send_amount(row.comb),
        reverb: params::send_amount(row.reverb),
        ducking,
        reverse: row.reverse,
        retrigger,
        stretch,
    })
}
