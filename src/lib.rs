//! gridtrack: tick-accurate playback engine for a song → chain → phrase tracker.
//!
//! A [`clock::Clock`] paces ticks, the [`sequencer::Sequencer`] walks eight
//! independent track cursors through the [`model::Composition`], rows are
//! resolved and modulated into notes, timed effects unfold as episodes, and
//! every sound leaves through a [`trigger::TriggerSink`].

pub mod clock;
pub mod config;
pub mod effect;
pub mod error;
pub mod model;
pub mod modulate;
pub mod player;
pub mod resolve;
pub mod sequencer;
pub mod trigger;

pub use error::{Error, Result};
