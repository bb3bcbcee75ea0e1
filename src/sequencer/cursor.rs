//! Per-track playback cursor: the song → chain → phrase automaton.
//!
//! Every visited phrase row costs at least one tick: a row without a delta
//! time rests for one tick, a row with delta time `N` triggers and holds for
//! `N`. Structural moves (end of phrase, silent phrase, end of chain, next
//! song row) are free and happen within the tick that needs them, except an
//! empty chain row, which dwells for one tick.

use log::{debug, trace};

use crate::clock::Clock;
use crate::effect::{ActiveEffects, EpisodeEvent, RowEffects, TrackEffects};
use crate::model::{Chain, Composition, Phrase, Slot, TrackKind, CHAIN_ROWS, PHRASE_ROWS, SONG_ROWS};
use crate::modulate::{track_rng, IncrementCounters, TrackRng};
use crate::resolve::{resolve_row, ResolveState, StickyColumns};
use crate::trigger::{instrument_trigger, sampler_trigger, Trigger};

/// Upper bound on free structural moves within one tick.
const MAX_TRANSITIONS: usize = SONG_ROWS * (CHAIN_ROWS + 2) + 4;

/// What a playing track walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// The track's song column, ending after the last song row.
    #[default]
    Song,
    /// One chain, looping.
    Chain(u8),
    /// One phrase, looping.
    Phrase(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing(Scope),
}

impl PlayState {
    pub fn is_playing(self) -> bool {
        matches!(self, PlayState::Playing(_))
    }
}

/// Row pointers of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub song_row: usize,
    pub chain_row: usize,
    pub phrase_row: usize,
}

/// Which pointer moves when a hold runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    PhraseRow,
    ChainRow,
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    remaining: u32,
    then: Step,
}

/// Outcome of visiting the cursor's position.
enum Visit {
    /// A row triggered; the trigger is absent when it resolved to silence
    /// at the transport (e.g. a vanished sample file).
    Row(Option<Trigger>),
    /// Nothing triggered this tick.
    Rest,
    End(&'static str),
}

/// What a UI needs to draw one track's playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSnapshot {
    pub track: usize,
    pub state: PlayState,
    pub position: Position,
    pub chain: Option<u8>,
    pub phrase: Option<u8>,
    pub sticky: StickyColumns,
    pub effects: ActiveEffects,
}

/// Playback automaton for one track.
#[derive(Debug, Clone)]
pub struct TrackCursor {
    track: usize,
    state: PlayState,
    /// Scope of the last start, reused when resuming from the cursor.
    scope: Scope,
    position: Position,
    chain: Option<u8>,
    phrase: Option<u8>,
    hold: Option<Hold>,
    sticky: StickyColumns,
    rng: TrackRng,
    counters: IncrementCounters,
    effects: TrackEffects,
}

impl TrackCursor {
    pub fn new(track: usize) -> Self {
        Self {
            track,
            state: PlayState::Stopped,
            scope: Scope::Song,
            position: Position::default(),
            chain: None,
            phrase: None,
            hold: None,
            sticky: StickyColumns::default(),
            rng: track_rng(Some(track as u64)),
            counters: IncrementCounters::new(),
            effects: TrackEffects::new(),
        }
    }

    pub fn track(&self) -> usize {
        self.track
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Begin a playback session. Sticky values, increment counters and
    /// effects start fresh; the random stream is reseeded.
    pub fn start(&mut self, scope: Scope, position: Position, seed: Option<u64>) {
        self.scope = scope;
        self.position = position;
        self.state = PlayState::Playing(scope);
        self.chain = None;
        self.phrase = None;
        self.hold = None;
        self.sticky = StickyColumns::default();
        self.rng = track_rng(seed);
        self.counters.reset();
        self.effects.reset();
    }

    /// Stop immediately, discarding running episodes. Without `reset` the
    /// position is kept for a later resume.
    pub fn stop(&mut self, reset: bool) {
        self.state = PlayState::Stopped;
        self.hold = None;
        self.effects.clear();
        if reset {
            self.position = Position::default();
            self.scope = Scope::Song;
            self.chain = None;
            self.phrase = None;
        }
    }

    /// Move the resume position. A playing track continues from it on its
    /// next tick.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
        self.hold = None;
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            track: self.track,
            state: self.state,
            position: self.position,
            chain: self.chain,
            phrase: self.phrase,
            sticky: self.sticky,
            effects: self.effects.active(),
        }
    }

    /// Advance one tick. Returns at most one trigger: the row's own, or else
    /// a follow-up from a running effect episode. Episodes advance on every
    /// tick; a follow-up due on a tick where the row triggers is dropped.
    pub fn tick(&mut self, composition: &Composition, clock: &Clock, tick: u64) -> Option<Trigger> {
        let PlayState::Playing(scope) = self.state else {
            return None;
        };
        let episode = self.effects.advance(tick, clock);

        if let Some(hold) = self.hold.as_mut() {
            hold.remaining = hold.remaining.saturating_sub(1);
            if hold.remaining > 0 {
                return episode.and_then(|event| self.episode_trigger(event, composition, clock));
            }
            let then = hold.then;
            self.hold = None;
            match then {
                Step::PhraseRow => self.position.phrase_row += 1,
                Step::ChainRow => self.next_chain_row(),
            }
        }

        match self.visit(scope, composition, clock, tick) {
            Visit::Row(trigger) => {
                if episode.is_some() {
                    trace!("track {}: row at tick {tick} replaces an effect follow-up", self.track);
                }
                trigger
            }
            Visit::Rest => episode.and_then(|event| self.episode_trigger(event, composition, clock)),
            Visit::End(reason) => {
                debug!("track {} ended at tick {tick}: {reason}", self.track);
                self.stop(false);
                self.position = Position::default();
                None
            }
        }
    }

    fn next_chain_row(&mut self) {
        self.position.chain_row += 1;
        self.position.phrase_row = 0;
    }

    fn next_song_row(&mut self) {
        self.position.song_row += 1;
        self.position.chain_row = 0;
        self.position.phrase_row = 0;
    }

    fn visit(&mut self, scope: Scope, composition: &Composition, clock: &Clock, tick: u64) -> Visit {
        let kind = composition.track_kind(self.track);

        if let Scope::Phrase(id) = scope {
            self.chain = None;
            self.phrase = Some(id);
            let Some(phrase) = composition.phrase(kind, Slot::new(id)).filter(|p| !p.is_silent()) else {
                return Visit::End("phrase has nothing to play");
            };
            if self.position.phrase_row >= PHRASE_ROWS {
                self.position.phrase_row = 0;
            }
            return self.visit_row(phrase, kind, composition, clock, tick);
        }

        for _ in 0..MAX_TRANSITIONS {
            let chain_id = match scope {
                Scope::Chain(id) => id,
                _ => {
                    if self.position.song_row >= SONG_ROWS {
                        return Visit::End("end of song");
                    }
                    match composition.song.cell(self.track, self.position.song_row).get() {
                        Some(id) => id,
                        None => return Visit::End("no chain on song row"),
                    }
                }
            };
            self.chain = Some(chain_id);

            let chain = composition
                .chain(kind, Slot::new(chain_id))
                .filter(|c| chain_has_sound(composition, kind, c));
            let Some(chain) = chain else {
                if scope == Scope::Song {
                    debug!("track {}: chain {chain_id:02X} is empty", self.track);
                    self.next_song_row();
                    continue;
                }
                return Visit::End("chain has nothing to play");
            };

            if self.position.chain_row >= CHAIN_ROWS {
                if scope == Scope::Song {
                    self.next_song_row();
                } else {
                    self.position.chain_row = 0;
                    self.position.phrase_row = 0;
                }
                continue;
            }

            let phrase_id = chain.phrase_at(self.position.chain_row);
            self.phrase = phrase_id.get();
            let Some(phrase) = composition.phrase(kind, phrase_id) else {
                self.hold = Some(Hold {
                    remaining: 1,
                    then: Step::ChainRow,
                });
                return Visit::Rest;
            };
            if phrase.is_silent() || self.position.phrase_row >= PHRASE_ROWS {
                self.next_chain_row();
                continue;
            }
            return self.visit_row(phrase, kind, composition, clock, tick);
        }

        Visit::End("no playable position found")
    }

    fn visit_row(
        &mut self,
        phrase: &Phrase,
        kind: TrackKind,
        composition: &Composition,
        clock: &Clock,
        tick: u64,
    ) -> Visit {
        let row = phrase.row(self.position.phrase_row).copied().unwrap_or_default();
        let Some(dt) = row.delta_time() else {
            self.hold = Some(Hold {
                remaining: 1,
                then: Step::PhraseRow,
            });
            return Visit::Rest;
        };
        self.hold = Some(Hold {
            remaining: dt,
            then: Step::PhraseRow,
        });

        let resolved = resolve_row(
            &row,
            kind,
            &composition.settings,
            ResolveState {
                sticky: &mut self.sticky,
                rng: &mut self.rng,
                counters: &mut self.counters,
            },
        );
        let Some(resolved) = resolved else {
            debug!(
                "track {}: row {:02X} has nothing to play",
                self.track, self.position.phrase_row
            );
            return Visit::Rest;
        };
        if kind.resolves_sample() && composition.file(Slot::from(resolved.file)).is_none() {
            debug!(
                "track {}: sample file {:?} is not loaded",
                self.track, resolved.file
            );
            return Visit::Rest;
        }

        let RowEffects {
            retrigger,
            stretch,
            arpeggio,
        } = self
            .effects
            .start_row(&resolved, &composition.settings, tick, clock, &mut self.rng);

        let trigger = match kind {
            TrackKind::Instrument => {
                let notes = arpeggio.unwrap_or_else(|| resolved.notes.clone());
                Some(Trigger::Instrument(instrument_trigger(
                    self.track,
                    &resolved,
                    notes,
                    retrigger.as_ref(),
                )))
            }
            TrackKind::Sampler => {
                sampler_trigger(self.track, &resolved, composition, clock.bpm(), retrigger, stretch)
                    .map(Trigger::Sampler)
            }
        };
        Visit::Row(trigger)
    }

    fn episode_trigger(&self, event: EpisodeEvent, composition: &Composition, clock: &Clock) -> Option<Trigger> {
        match event {
            EpisodeEvent::Retrigger {
                source,
                hit,
                stretch,
            } => match source.kind {
                TrackKind::Instrument => Some(Trigger::Instrument(instrument_trigger(
                    self.track,
                    &source,
                    source.notes.clone(),
                    Some(&hit),
                ))),
                TrackKind::Sampler => {
                    sampler_trigger(self.track, &source, composition, clock.bpm(), Some(hit), stretch)
                        .map(Trigger::Sampler)
                }
            },
            EpisodeEvent::Arpeggio { source, notes, hit } => Some(Trigger::Instrument(instrument_trigger(
                self.track,
                &source,
                notes,
                hit.as_ref(),
            ))),
        }
    }
}

/// Whether any row of `chain` points at a phrase that plays something.
fn chain_has_sound(composition: &Composition, kind: TrackKind, chain: &Chain) -> bool {
    (0..CHAIN_ROWS).any(|row| {
        composition
            .phrase(kind, chain.phrase_at(row))
            .is_some_and(|p| !p.is_silent())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PhraseRow;

    fn playing_row(note: u8, dt: u8) -> PhraseRow {
        PhraseRow {
            note: Slot::new(note),
            dt: Slot::new(dt),
            ..Default::default()
        }
    }

    /// Instrument track 0: song row 0 → chain 0 → phrase 0.
    fn composition(rows: &[(usize, PhraseRow)]) -> Composition {
        let mut comp = Composition::new();
        comp.set_track_kind(0, TrackKind::Instrument);
        comp.song.set_cell(0, 0, Slot::new(0));
        let pool = comp.pool_mut(TrackKind::Instrument);
        if let Some(chain) = pool.chains.get_mut(0) {
            chain.set_phrase(0, Slot::new(0));
        }
        if let Some(phrase) = pool.phrases.get_mut(0) {
            for &(index, row) in rows {
                phrase.set_row(index, row);
            }
        }
        comp
    }

    fn run(cursor: &mut TrackCursor, comp: &Composition, ticks: u64) -> Vec<(u64, Trigger)> {
        let clock = Clock::new(120.0, 4);
        (0..ticks)
            .filter_map(|t| cursor.tick(comp, &clock, t).map(|trig| (t, trig)))
            .collect()
    }

    #[test]
    fn stopped_cursor_does_nothing() {
        let comp = composition(&[(0, playing_row(60, 1))]);
        let mut cursor = TrackCursor::new(0);
        assert!(run(&mut cursor, &comp, 4).is_empty());
        assert_eq!(cursor.position(), Position::default());
    }

    #[test]
    fn trigger_then_hold() {
        let comp = composition(&[(0, playing_row(60, 3)), (3, playing_row(62, 1))]);
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Song, Position::default(), Some(1));
        let triggers = run(&mut cursor, &comp, 8);
        let ticks: Vec<u64> = triggers.iter().map(|(t, _)| *t).collect();
        // Row 0 holds ticks 0..=2, rows 1 and 2 rest a tick each, row 3 at tick 5.
        assert_eq!(ticks, vec![0, 5]);
        assert_eq!(triggers[1].1.note(), Some(62));
    }

    #[test]
    fn rest_rows_advance_one_per_tick() {
        let comp = composition(&[(10, playing_row(60, 1))]);
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Song, Position::default(), Some(1));
        let clock = Clock::new(120.0, 4);
        for t in 0..5u64 {
            assert!(cursor.tick(&comp, &clock, t).is_none());
            assert_eq!(cursor.position().phrase_row, t as usize);
        }
    }

    #[test]
    fn song_row_without_chain_ends_track() {
        let comp = Composition::new();
        let mut cursor = TrackCursor::new(3);
        cursor.start(Scope::Song, Position::default(), None);
        assert!(run(&mut cursor, &comp, 1).is_empty());
        assert_eq!(cursor.state(), PlayState::Stopped);
    }

    #[test]
    fn empty_chain_row_dwells_one_tick() {
        let mut comp = composition(&[(0, playing_row(60, 1))]);
        let pool = comp.pool_mut(TrackKind::Instrument);
        // Chain 0: row 0 empty, row 1 phrase 0.
        if let Some(chain) = pool.chains.get_mut(0) {
            chain.set_phrase(0, Slot::EMPTY);
            chain.set_phrase(1, Slot::new(0));
        }
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Song, Position::default(), Some(1));
        let triggers = run(&mut cursor, &comp, 3);
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].0, 1);
    }

    #[test]
    fn silent_phrase_is_skipped_within_the_tick() {
        let mut comp = composition(&[(0, playing_row(60, 1))]);
        let pool = comp.pool_mut(TrackKind::Instrument);
        // Chain 0: row 0 phrase 1 (silent), row 1 phrase 0.
        if let Some(chain) = pool.chains.get_mut(0) {
            chain.set_phrase(0, Slot::new(1));
            chain.set_phrase(1, Slot::new(0));
        }
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Song, Position::default(), Some(1));
        let triggers = run(&mut cursor, &comp, 1);
        assert_eq!(triggers.len(), 1);
        assert_eq!(cursor.position().chain_row, 1);
    }

    #[test]
    fn phrase_scope_loops() {
        let comp = composition(&[(0, playing_row(60, 1))]);
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Phrase(0), Position::default(), Some(1));
        let triggers = run(&mut cursor, &comp, 2 * PHRASE_ROWS as u64);
        let ticks: Vec<u64> = triggers.iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![0, PHRASE_ROWS as u64]);
        assert!(cursor.state().is_playing());
    }

    #[test]
    fn chain_scope_loops_and_never_leaves_the_chain() {
        let comp = composition(&[(0, playing_row(60, 1))]);
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Chain(0), Position::default(), Some(1));
        // One pass: 255 rows of phrase 0, then 15 empty chain rows dwell.
        let period = PHRASE_ROWS as u64 + (CHAIN_ROWS as u64 - 1);
        let triggers = run(&mut cursor, &comp, period + 1);
        let ticks: Vec<u64> = triggers.iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![0, period]);
        assert_eq!(cursor.position().song_row, 0);
    }

    #[test]
    fn silent_scopes_stop() {
        let comp = composition(&[]);
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Phrase(0), Position::default(), None);
        run(&mut cursor, &comp, 1);
        assert_eq!(cursor.state(), PlayState::Stopped);

        cursor.start(Scope::Chain(0), Position::default(), None);
        run(&mut cursor, &comp, 1);
        assert_eq!(cursor.state(), PlayState::Stopped);
    }

    #[test]
    fn stop_keeps_position_unless_reset() {
        let comp = composition(&[(0, playing_row(60, 1))]);
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Song, Position::default(), Some(1));
        run(&mut cursor, &comp, 6);
        cursor.stop(false);
        assert_eq!(cursor.position().phrase_row, 5);
        cursor.stop(true);
        assert_eq!(cursor.position(), Position::default());
    }

    #[test]
    fn snapshot_reports_ids_and_sticky() {
        let comp = composition(&[(0, playing_row(60, 2))]);
        let mut cursor = TrackCursor::new(0);
        cursor.start(Scope::Song, Position::default(), Some(1));
        run(&mut cursor, &comp, 1);
        let snap = cursor.snapshot();
        assert_eq!(snap.chain, Some(0));
        assert_eq!(snap.phrase, Some(0));
        assert_eq!(snap.sticky.note, Some(60));
        assert_eq!(snap.sticky.dt, Some(2));
    }
}
