//! Timestretch episodes: a stretch ratio moving linearly over a number of beats.

use crate::clock::Clock;
use crate::model::TimestretchSettings;

/// Stretch parameters attached to a sampler trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchParams {
    /// Ratio at the time of the trigger.
    pub ratio: f32,
    /// Ratio the stretch is heading to.
    pub end_ratio: f32,
    /// Seconds remaining until `end_ratio` is reached.
    pub seconds: f32,
}

#[derive(Debug, Clone)]
pub struct TimestretchEpisode {
    settings: TimestretchSettings,
    start_tick: u64,
    total_ticks: f64,
}

impl TimestretchEpisode {
    pub fn start(settings: TimestretchSettings, start_tick: u64, clock: &Clock) -> Self {
        Self {
            settings,
            start_tick,
            total_ticks: clock.beats_to_ticks(f64::from(settings.beats)),
        }
    }

    pub fn progress(&self, tick: u64) -> f64 {
        if self.total_ticks <= 0.0 {
            return 1.0;
        }
        (tick.saturating_sub(self.start_tick) as f64 / self.total_ticks).min(1.0)
    }

    /// Current ratio. A zero-length stretch sits at its start ratio.
    pub fn ratio(&self, tick: u64) -> f32 {
        if self.total_ticks <= 0.0 {
            return self.settings.start;
        }
        let p = self.progress(tick) as f32;
        self.settings.start + (self.settings.end - self.settings.start) * p
    }

    pub fn params(&self, tick: u64, clock: &Clock) -> StretchParams {
        let remaining_ticks = (self.total_ticks * (1.0 - self.progress(tick))).max(0.0);
        StretchParams {
            ratio: self.ratio(tick),
            end_ratio: self.settings.end,
            seconds: (remaining_ticks * clock.period_secs()) as f32,
        }
    }

    /// Finished once its full length has elapsed; a zero-length stretch
    /// finishes after its start tick.
    pub fn is_finished(&self, tick: u64) -> bool {
        let elapsed = tick.saturating_sub(self.start_tick) as f64;
        if self.total_ticks <= 0.0 {
            return tick > self.start_tick;
        }
        elapsed >= self.total_ticks
    }
}
