//! Retrigger episodes: a burst of hits spread over a number of beats.

use crate::clock::Clock;
use crate::model::RetriggerSettings;
use crate::resolve::ResolvedRow;

/// Parameters of one hit in a retrigger burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetriggerHit {
    /// Zero-based hit number; hit 0 is the row trigger itself.
    pub index: u8,
    pub times: u8,
    /// Playback rate, interpolated from start to end rate.
    pub rate: f32,
    /// Semitone offset from the row's pitch.
    pub pitch: f32,
    /// Gain offset in decibels.
    pub volume_db: f32,
}

/// An in-flight burst.
#[derive(Debug, Clone)]
pub struct RetriggerEpisode {
    settings: RetriggerSettings,
    source: ResolvedRow,
    start_tick: u64,
    total_ticks: f64,
    next_hit: u8,
}

impl RetriggerEpisode {
    /// Start a burst at `start_tick`. Hit 0 is consumed by the caller as part
    /// of the row trigger. Returns `None` for entries with zero hits.
    pub fn start(
        settings: RetriggerSettings,
        source: ResolvedRow,
        start_tick: u64,
        clock: &Clock,
    ) -> Option<Self> {
        if settings.times == 0 {
            return None;
        }
        Some(Self {
            settings,
            source,
            start_tick,
            total_ticks: clock.beats_to_ticks(f64::from(settings.beats)),
            next_hit: 1,
        })
    }

    pub fn source(&self) -> &ResolvedRow {
        &self.source
    }

    /// Tick offset of hit `k` from the start.
    fn offset(&self, k: u8) -> u64 {
        let spacing = self.total_ticks / f64::from(self.settings.times);
        (spacing * f64::from(k)).floor() as u64
    }

    /// Parameters of hit `k`.
    pub fn hit(&self, k: u8) -> RetriggerHit {
        let s = &self.settings;
        let last = s.times.saturating_sub(1);
        let progress = if last == 0 {
            0.0
        } else {
            f32::from(k) / f32::from(last)
        };
        let mut pitch = s.pitch_change * f32::from(k);
        let mut volume_db = s.volume_db * f32::from(k);
        if k == last && k > 0 {
            if s.final_pitch_to_start {
                pitch = 0.0;
            }
            if s.final_volume_to_start {
                volume_db = 0.0;
            }
        }
        RetriggerHit {
            index: k,
            times: s.times,
            rate: s.start_rate + (s.end_rate - s.start_rate) * progress,
            pitch,
            volume_db,
        }
    }

    /// Take the hit due at `tick`, if any. Hits that fall on the same tick
    /// collapse into the last of them; hits from earlier ticks that were
    /// never taken are dropped.
    pub fn take_due(&mut self, tick: u64) -> Option<RetriggerHit> {
        let elapsed = tick.saturating_sub(self.start_tick);
        let mut due = None;
        while self.next_hit < self.settings.times {
            let offset = self.offset(self.next_hit);
            if offset > elapsed {
                break;
            }
            if offset == elapsed {
                due = Some(self.hit(self.next_hit));
            }
            self.next_hit += 1;
        }
        due
    }

    pub fn is_finished(&self) -> bool {
        self.next_hit >= self.settings.times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhraseRow, TrackKind};
    use assert_approx_eq::assert_approx_eq;

    fn source() -> ResolvedRow {
        ResolvedRow {
            kind: TrackKind::Sampler,
            note: 0,
            notes: vec![0],
            dt: 1,
            file: Some(0),
            row: PhraseRow::default(),
        }
    }

    fn settings(times: u8, beats: f32) -> RetriggerSettings {
        RetriggerSettings {
            times,
            beats,
            ..Default::default()
        }
    }

    #[test]
    fn zero_times_has_no_episode() {
        let clock = Clock::new(120.0, 4);
        assert!(RetriggerEpisode::start(settings(0, 1.0), source(), 0, &clock).is_none());
    }

    #[test]
    fn hits_spread_evenly() {
        // 4 hits over 1 beat at PPQ 8: one hit every 2 ticks.
        let clock = Clock::new(120.0, 8);
        let mut ep = RetriggerEpisode::start(settings(4, 1.0), source(), 10, &clock).unwrap();
        let fired: Vec<Option<u8>> = (10..18)
            .map(|t| ep.take_due(t).map(|h| h.index))
            .collect();
        assert_eq!(
            fired,
            vec![None, None, Some(1), None, Some(2), None, Some(3), None]
        );
        assert!(ep.is_finished());
    }

    #[test]
    fn rate_interpolates_linearly() {
        let clock = Clock::new(120.0, 4);
        let s = RetriggerSettings {
            times: 5,
            start_rate: 1.0,
            end_rate: 2.0,
            ..Default::default()
        };
        let ep = RetriggerEpisode::start(s, source(), 0, &clock).unwrap();
        assert_approx_eq!(ep.hit(0).rate, 1.0, 1e-6);
        assert_approx_eq!(ep.hit(2).rate, 1.5, 1e-6);
        assert_approx_eq!(ep.hit(4).rate, 2.0, 1e-6);
    }

    #[test]
    fn pitch_and_volume_slide_and_snap_back() {
        let clock = Clock::new(120.0, 4);
        let s = RetriggerSettings {
            times: 3,
            pitch_change: 2.0,
            volume_db: -3.0,
            final_pitch_to_start: true,
            ..Default::default()
        };
        let ep = RetriggerEpisode::start(s, source(), 0, &clock).unwrap();
        assert_approx_eq!(ep.hit(1).pitch, 2.0, 1e-6);
        assert_approx_eq!(ep.hit(1).volume_db, -3.0, 1e-6);
        assert_approx_eq!(ep.hit(2).pitch, 0.0, 1e-6);
        assert_approx_eq!(ep.hit(2).volume_db, -6.0, 1e-6);
    }

    #[test]
    fn sub_tick_hits_collapse() {
        // 8 hits over a quarter beat at PPQ 4 = 1 tick: all follow-ups land on tick 0.
        let clock = Clock::new(120.0, 4);
        let mut ep = RetriggerEpisode::start(settings(8, 0.25), source(), 0, &clock).unwrap();
        let hit = ep.take_due(0).unwrap();
        assert_eq!(hit.index, 7);
        assert!(ep.is_finished());
        assert!(ep.take_due(1).is_none());
    }

    #[test]
    fn missed_hits_are_dropped() {
        // Hits at offsets 2, 4, 6; nothing taken until offset 7.
        let clock = Clock::new(120.0, 8);
        let mut ep = RetriggerEpisode::start(settings(4, 1.0), source(), 10, &clock).unwrap();
        assert!(ep.take_due(17).is_none());
        assert!(ep.is_finished());
    }

    #[test]
    fn only_the_current_tick_fires_after_a_gap() {
        let clock = Clock::new(120.0, 8);
        let mut ep = RetriggerEpisode::start(settings(4, 1.0), source(), 10, &clock).unwrap();
        assert_eq!(ep.take_due(16).map(|h| h.index), Some(3));
    }
}
