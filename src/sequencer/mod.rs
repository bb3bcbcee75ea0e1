//! Sequencer: eight independent track cursors driven by one tick.
//!
//! The sequencer reads the composition but never mutates it. Each call to
//! [`Sequencer::tick`] advances every playing track once and hands at most one
//! trigger per track to the sink. Cross-track order within a tick is not part
//! of the contract.

pub mod cursor;

pub use cursor::{CursorSnapshot, PlayState, Position, Scope, TrackCursor};

use log::{debug, info, trace};

use crate::clock::Clock;
use crate::model::{Composition, TRACKS};
use crate::trigger::TriggerSink;

/// Where playback starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Song row 0, chain row 0, phrase row 0.
    Top,
    /// The persisted cursor, in the scope it was last played in.
    Cursor,
    /// Loop one chain from its first row.
    Chain(u8),
    /// Loop one phrase from its first row.
    Phrase(u8),
}

/// Which tracks a transport command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackTarget {
    One(usize),
    All,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    tracks: [TrackCursor; TRACKS],
    tick: u64,
    /// Base seed for the per-track streams; `None` seeds from time.
    seed: Option<u64>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Sequencer {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            tracks: std::array::from_fn(TrackCursor::new),
            tick: 0,
            seed,
        }
    }

    /// Tick number the next call to [`Sequencer::tick`] will process.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn is_playing(&self) -> bool {
        self.tracks.iter().any(|t| t.state().is_playing())
    }

    pub fn track(&self, track: usize) -> Option<&TrackCursor> {
        self.tracks.get(track)
    }

    fn targets(&self, target: TrackTarget) -> std::ops::Range<usize> {
        match target {
            TrackTarget::All => 0..TRACKS,
            TrackTarget::One(track) if track < TRACKS => track..track + 1,
            TrackTarget::One(track) => {
                debug!("ignoring command for track {track}");
                0..0
            }
        }
    }

    /// Start playback. Tick numbering restarts at 0 when nothing was
    /// playing.
    pub fn start(&mut self, mode: StartMode, target: TrackTarget) {
        if !self.is_playing() {
            self.tick = 0;
        }
        for track in self.targets(target) {
            let seed = self.seed.map(|s| s.wrapping_add(track as u64));
            let cursor = &mut self.tracks[track];
            let (scope, position) = match mode {
                StartMode::Top => (Scope::Song, Position::default()),
                StartMode::Cursor => (cursor.scope(), cursor.position()),
                StartMode::Chain(id) => (Scope::Chain(id), Position::default()),
                StartMode::Phrase(id) => (Scope::Phrase(id), Position::default()),
            };
            cursor.start(scope, position, seed);
        }
        info!("playback started: {mode:?} on {target:?}");
    }

    /// Stop playback; the next tick finds the tracks stopped. `reset` zeroes
    /// the persisted cursor.
    pub fn stop(&mut self, target: TrackTarget, reset: bool) {
        for track in self.targets(target) {
            self.tracks[track].stop(reset);
        }
        info!("playback stopped on {target:?}{}", if reset { " (reset)" } else { "" });
    }

    /// Move a track's cursor, e.g. to follow the editor.
    pub fn set_cursor(&mut self, track: usize, position: Position) {
        if let Some(cursor) = self.tracks.get_mut(track) {
            cursor.set_position(position);
        }
    }

    /// Advance every playing track by one tick. Returns the tick processed.
    pub fn tick(&mut self, composition: &Composition, clock: &Clock, sink: &mut dyn TriggerSink) -> u64 {
        let tick = self.tick;
        for cursor in self.tracks.iter_mut() {
            if let Some(trigger) = cursor.tick(composition, clock, tick) {
                trace!("tick {tick}: {trigger}");
                sink.emit(tick, trigger);
            }
        }
        self.tick += 1;
        tick
    }

    pub fn snapshot(&self) -> [CursorSnapshot; TRACKS] {
        std::array::from_fn(|track| self.tracks[track].snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhraseRow, Slot, TrackKind};
    use crate::trigger::{Trigger, TriggerLog};

    fn row(note: u8, dt: u8) -> PhraseRow {
        PhraseRow {
            note: Slot::new(note),
            dt: Slot::new(dt),
            ..Default::default()
        }
    }

    /// Tracks 0 and 1 play chain 0 / phrase 0 of the instrument pool.
    fn composition() -> Composition {
        let mut comp = Composition::new();
        for track in 0..2 {
            comp.set_track_kind(track, TrackKind::Instrument);
            comp.song.set_cell(track, 0, Slot::new(0));
        }
        let pool = comp.pool_mut(TrackKind::Instrument);
        if let Some(chain) = pool.chains.get_mut(0) {
            chain.set_phrase(0, Slot::new(0));
        }
        if let Some(phrase) = pool.phrases.get_mut(0) {
            phrase.set_row(0, row(60, 2));
            phrase.set_row(2, row(64, 2));
        }
        comp
    }

    fn run(seq: &mut Sequencer, comp: &Composition, ticks: u64) -> TriggerLog {
        let clock = Clock::new(120.0, 4);
        let mut log = TriggerLog::new();
        for _ in 0..ticks {
            seq.tick(comp, &clock, &mut log);
        }
        log
    }

    #[test]
    fn tracks_advance_independently() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.start(StartMode::Top, TrackTarget::All);
        let log = run(&mut seq, &comp, 4);
        assert_eq!(log.for_track(0).count(), 2);
        assert_eq!(log.for_track(1).count(), 2);
        assert_eq!(log.for_track(2).count(), 0);
        // Unassigned tracks end on their first tick.
        assert!(!seq.snapshot()[5].state.is_playing());
    }

    #[test]
    fn one_track_target() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.start(StartMode::Top, TrackTarget::One(1));
        let log = run(&mut seq, &comp, 4);
        assert_eq!(log.for_track(0).count(), 0);
        assert_eq!(log.for_track(1).count(), 2);
    }

    #[test]
    fn at_most_one_trigger_per_track_per_tick() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.start(StartMode::Top, TrackTarget::All);
        let log = run(&mut seq, &comp, 16);
        for track in 0..TRACKS {
            let ticks: Vec<u64> = log.for_track(track).map(|(t, _)| *t).collect();
            let mut dedup = ticks.clone();
            dedup.dedup();
            assert_eq!(ticks, dedup);
        }
    }

    #[test]
    fn start_from_top_ignores_prior_cursor() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.set_cursor(
            0,
            Position {
                song_row: 0,
                chain_row: 0,
                phrase_row: 2,
            },
        );
        seq.start(StartMode::Top, TrackTarget::One(0));
        let log = run(&mut seq, &comp, 1);
        assert_eq!(log.entries()[0].1.note(), Some(60));
    }

    #[test]
    fn resume_from_cursor_after_stop() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.start(StartMode::Top, TrackTarget::One(0));
        run(&mut seq, &comp, 3);
        seq.stop(TrackTarget::One(0), false);
        let kept = seq.snapshot()[0].position;
        assert_eq!(kept.phrase_row, 2);

        seq.start(StartMode::Cursor, TrackTarget::One(0));
        let log = run(&mut seq, &comp, 1);
        assert_eq!(log.entries()[0].1.note(), Some(64));
    }

    #[test]
    fn stop_with_reset_zeroes_cursor() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.start(StartMode::Top, TrackTarget::All);
        run(&mut seq, &comp, 3);
        seq.stop(TrackTarget::All, true);
        assert!(seq.snapshot().iter().all(|s| s.position == Position::default()));
        assert!(!seq.is_playing());
    }

    #[test]
    fn stopped_track_emits_nothing_next_tick() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.start(StartMode::Top, TrackTarget::All);
        run(&mut seq, &comp, 1);
        seq.stop(TrackTarget::All, false);
        assert!(run(&mut seq, &comp, 4).is_empty());
    }

    #[test]
    fn phrase_mode_plays_the_given_phrase() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        seq.start(StartMode::Phrase(0), TrackTarget::One(0));
        let log = run(&mut seq, &comp, 3);
        let notes: Vec<Option<u8>> = log.entries().iter().map(|(_, t)| t.note()).collect();
        assert_eq!(notes, vec![Some(60), Some(64)]);
        assert!(matches!(log.entries()[0].1, Trigger::Instrument(_)));
        assert_eq!(seq.snapshot()[0].state, PlayState::Playing(Scope::Phrase(0)));
    }

    #[test]
    fn out_of_range_track_is_ignored() {
        let mut seq = Sequencer::new(None);
        seq.start(StartMode::Top, TrackTarget::One(TRACKS));
        assert!(!seq.is_playing());
        seq.set_cursor(99, Position::default());
    }

    #[test]
    fn tick_numbering_restarts_with_playback() {
        let comp = composition();
        let mut seq = Sequencer::new(Some(7));
        run(&mut seq, &comp, 5);
        assert_eq!(seq.current_tick(), 5);
        seq.start(StartMode::Top, TrackTarget::One(0));
        assert_eq!(seq.current_tick(), 0);
        let log = run(&mut seq, &comp, 1);
        assert_eq!(log.entries()[0].0, 0);
    }
}
