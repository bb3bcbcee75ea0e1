//! Arpeggio episodes: a 16-row pattern unrolled over a chord's notes.

use crate::clock::Clock;
use crate::model::{ArpDirection, ArpeggioSettings};
use crate::resolve::ResolvedRow;

/// One scheduled arpeggio note.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArpStep {
    offset: u64,
    note: u8,
}

/// Expand a pattern over `notes` into `(tick offset, note)` pairs.
///
/// Each row plays `count` notes spaced `ppq / divisor` ticks apart (divisor 0
/// counts as 1). `Up` rows walk the note list from its first entry, `Down`
/// rows from its last, wrapping around. `None` rows are skipped.
fn unroll(settings: &ArpeggioSettings, notes: &[u8], ppq: u32) -> Vec<ArpStep> {
    let mut steps = Vec::new();
    if notes.is_empty() {
        return steps;
    }
    let len = notes.len();
    let mut time = 0.0f64;
    for row in settings.rows.iter() {
        if row.direction == ArpDirection::None || row.count == 0 {
            continue;
        }
        let spacing = f64::from(ppq) / f64::from(row.divisor.max(1));
        for i in 0..usize::from(row.count) {
            let index = match row.direction {
                ArpDirection::Up => i % len,
                ArpDirection::Down => len - 1 - (i % len),
                ArpDirection::None => continue,
            };
            steps.push(ArpStep {
                offset: time.floor() as u64,
                note: notes[index],
            });
            time += spacing;
        }
    }
    steps
}

#[derive(Debug, Clone)]
pub struct ArpeggioEpisode {
    source: ResolvedRow,
    steps: Vec<ArpStep>,
    start_tick: u64,
    next: usize,
}

impl ArpeggioEpisode {
    /// Start an arpeggio over the source row's chord notes. Returns `None`
    /// when the pattern has no playable rows.
    pub fn start(
        settings: &ArpeggioSettings,
        source: ResolvedRow,
        start_tick: u64,
        clock: &Clock,
    ) -> Option<Self> {
        let steps = unroll(settings, &source.notes, clock.ppq());
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            source,
            steps,
            start_tick,
            next: 0,
        })
    }

    pub fn source(&self) -> &ResolvedRow {
        &self.source
    }

    /// Notes due at `tick`, merged when several fall on the same tick. Steps
    /// of earlier ticks that were never taken are dropped.
    pub fn take_due(&mut self, tick: u64) -> Vec<u8> {
        let elapsed = tick.saturating_sub(self.start_tick);
        let mut due = Vec::new();
        while let Some(step) = self.steps.get(self.next) {
            if step.offset > elapsed {
                break;
            }
            if step.offset == elapsed {
                due.push(step.note);
            }
            self.next += 1;
        }
        due
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.steps.len()
    }
}
