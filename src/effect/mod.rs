//! Effect scheduler: retrigger, timestretch, and arpeggio episodes per track.
//!
//! An episode starts when a row carrying an effect index triggers and then
//! unfolds over later ticks on its own, independent of the row cursor. Its
//! time advances on every tick the track plays and it is dropped once its
//! length has elapsed. A new start of the same kind on the same track replaces
//! the running one; stopping the track discards all of them.

pub mod activation;
pub mod arpeggio;
pub mod retrigger;
pub mod timestretch;

pub use activation::ActivationCounters;
pub use arpeggio::ArpeggioEpisode;
pub use retrigger::{RetriggerEpisode, RetriggerHit};
pub use timestretch::{StretchParams, TimestretchEpisode};

use log::trace;

use crate::clock::Clock;
use crate::model::SettingsTables;
use crate::modulate::TrackRng;
use crate::resolve::ResolvedRow;

/// Kinds of timed effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Retrigger,
    Timestretch,
    Arpeggio,
}

/// Effect parameters attached to the row trigger that started them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowEffects {
    /// Hit 0 of a newly started burst.
    pub retrigger: Option<RetriggerHit>,
    /// Stretch in effect for this trigger (new or already running).
    pub stretch: Option<StretchParams>,
    /// First arpeggio notes; when set they replace the row's chord.
    pub arpeggio: Option<Vec<u8>>,
}

/// A follow-up trigger produced by a running episode.
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeEvent {
    Retrigger {
        source: ResolvedRow,
        hit: RetriggerHit,
        stretch: Option<StretchParams>,
    },
    /// Arpeggio step, carrying the retrigger hit that fell on the same tick.
    Arpeggio {
        source: ResolvedRow,
        notes: Vec<u8>,
        hit: Option<RetriggerHit>,
    },
}

/// Which episodes are running, for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveEffects {
    pub retrigger: bool,
    pub timestretch: bool,
    pub arpeggio: bool,
}

/// Episodes and activation counters of one track.
#[derive(Debug, Clone, Default)]
pub struct TrackEffects {
    retrigger: Option<RetriggerEpisode>,
    timestretch: Option<TimestretchEpisode>,
    arpeggio: Option<ArpeggioEpisode>,
    counters: ActivationCounters,
}

impl TrackEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start whatever episodes a triggering row asks for.
    ///
    /// Entries that are missing from their table, have no content, or are
    /// gated off by every/probability start nothing and leave any running
    /// episode of that kind alone. Call [`TrackEffects::advance`] for `tick`
    /// first so expired episodes are gone.
    pub fn start_row(
        &mut self,
        resolved: &ResolvedRow,
        settings: &SettingsTables,
        tick: u64,
        clock: &Clock,
        rng: &mut TrackRng,
    ) -> RowEffects {
        let row = &resolved.row;
        let mut effects = RowEffects::default();

        let stretch_entry = row.timestretch.get();
        if let (Some(entry), Some(s)) = (stretch_entry, settings.timestretch.get_slot(row.timestretch)) {
            if s.is_configured()
                && self
                    .counters
                    .should_activate(EffectKind::Timestretch, entry, &s.activation, rng)
            {
                trace!("timestretch {entry:02X} starts at tick {tick}");
                self.timestretch = Some(TimestretchEpisode::start(*s, tick, clock));
            }
        }
        effects.stretch = self.current_stretch(tick, clock);

        let retrigger_entry = row.retrigger.get();
        if let (Some(entry), Some(s)) = (retrigger_entry, settings.retrigger.get_slot(row.retrigger)) {
            if s.times > 0
                && self
                    .counters
                    .should_activate(EffectKind::Retrigger, entry, &s.activation, rng)
            {
                if let Some(mut episode) = RetriggerEpisode::start(*s, resolved.clone(), tick, clock) {
                    trace!("retrigger {entry:02X} starts at tick {tick}");
                    let first = episode.hit(0);
                    effects.retrigger = Some(episode.take_due(tick).unwrap_or(first));
                    self.retrigger = Some(episode).filter(|ep| !ep.is_finished());
                }
            }
        }

        if resolved.kind.resolves_note() {
            if let Some(s) = settings.arpeggio.get_slot(row.arpeggio) {
                if let Some(mut episode) = ArpeggioEpisode::start(s, resolved.clone(), tick, clock) {
                    trace!("arpeggio {} starts at tick {tick}", row.arpeggio);
                    effects.arpeggio = Some(episode.take_due(tick));
                    self.arpeggio = Some(episode).filter(|ep| !ep.is_finished());
                }
            }
        }

        effects
    }

    /// Move every episode to `tick`: drop the ones whose length has elapsed
    /// and collect the follow-up trigger due now, if any.
    ///
    /// Must be called once per played tick, before the row is visited. When
    /// the row itself triggers on the same tick the returned event is
    /// discarded by the caller, so a track never fires twice in one tick.
    /// A retrigger hit that coincides with an arpeggio step rides on the
    /// arpeggio event.
    pub fn advance(&mut self, tick: u64, clock: &Clock) -> Option<EpisodeEvent> {
        if self.timestretch.as_ref().is_some_and(|ep| ep.is_finished(tick)) {
            trace!("timestretch ends at tick {tick}");
            self.timestretch = None;
        }
        let stretch = self.current_stretch(tick, clock);

        let retrigger = self
            .retrigger
            .as_mut()
            .and_then(|ep| ep.take_due(tick).map(|hit| (ep.source().clone(), hit)));
        let arpeggio = self.arpeggio.as_mut().and_then(|ep| {
            let notes = ep.take_due(tick);
            (!notes.is_empty()).then(|| (ep.source().clone(), notes))
        });

        if self.retrigger.as_ref().is_some_and(RetriggerEpisode::is_finished) {
            self.retrigger = None;
        }
        if self.arpeggio.as_ref().is_some_and(ArpeggioEpisode::is_finished) {
            self.arpeggio = None;
        }

        match (arpeggio, retrigger) {
            (Some((source, notes)), hit) => Some(EpisodeEvent::Arpeggio {
                source,
                notes,
                hit: hit.map(|(_, hit)| hit),
            }),
            (None, Some((source, hit))) => Some(EpisodeEvent::Retrigger {
                source,
                hit,
                stretch,
            }),
            (None, None) => None,
        }
    }

    fn current_stretch(&self, tick: u64, clock: &Clock) -> Option<StretchParams> {
        self.timestretch.as_ref().map(|ep| ep.params(tick, clock))
    }

    pub fn active(&self) -> ActiveEffects {
        ActiveEffects {
            retrigger: self.retrigger.is_some(),
            timestretch: self.timestretch.is_some(),
            arpeggio: self.arpeggio.is_some(),
        }
    }

    /// Discard every running episode without completing it.
    pub fn clear(&mut self) {
        self.retrigger = None;
        self.timestretch = None;
        self.arpeggio = None;
    }

    /// Discard episodes and restart every/probability counting.
    pub fn reset(&mut self) {
        self.clear();
        self.counters.reset();
    }
}
