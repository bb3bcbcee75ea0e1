//! Every/probability gating for effect episodes.

use std::collections::HashMap;

use rand::Rng;

use super::EffectKind;
use crate::model::Activation;

/// Counts row triggers per effect entry on one track.
#[derive(Debug, Clone, Default)]
pub struct ActivationCounters {
    counts: HashMap<(EffectKind, u8), u64>,
}

impl ActivationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger of `entry` and decide whether it starts an episode.
    ///
    /// The first trigger passes the `every` gate, then every Nth after it.
    /// A passing trigger then fires with `probability` percent; 100 or more
    /// always fires and 0 never does. The random stream is only consumed for
    /// probabilities strictly between those.
    pub fn should_activate<R: Rng>(
        &mut self,
        kind: EffectKind,
        entry: u8,
        activation: &Activation,
        rng: &mut R,
    ) -> bool {
        let count = self.counts.entry((kind, entry)).or_insert(0);
        let nth = *count;
        *count += 1;

        let every = u64::from(activation.every.max(1));
        if nth % every != 0 {
            return false;
        }
        match activation.probability {
            0 => false,
            p if p >= 100 => true,
            p => rng.gen_range(0..100u8) < p,
        }
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulate::track_rng;

    fn gate(every: u8, probability: u8) -> Activation {
        Activation { every, probability }
    }

    #[test]
    fn default_always_activates() {
        let mut c = ActivationCounters::new();
        let mut rng = track_rng(Some(0));
        for _ in 0..10 {
            assert!(c.should_activate(EffectKind::Retrigger, 0, &Activation::default(), &mut rng));
        }
    }

    #[test]
    fn every_third_trigger() {
        let mut c = ActivationCounters::new();
        let mut rng = track_rng(Some(0));
        let fired: Vec<bool> = (0..7)
            .map(|_| c.should_activate(EffectKind::Timestretch, 4, &gate(3, 100), &mut rng))
            .collect();
        assert_eq!(fired, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn counters_are_per_entry_and_kind() {
        let mut c = ActivationCounters::new();
        let mut rng = track_rng(Some(0));
        let g = gate(2, 100);
        assert!(c.should_activate(EffectKind::Retrigger, 1, &g, &mut rng));
        assert!(c.should_activate(EffectKind::Retrigger, 2, &g, &mut rng));
        assert!(c.should_activate(EffectKind::Timestretch, 1, &g, &mut rng));
        assert!(!c.should_activate(EffectKind::Retrigger, 1, &g, &mut rng));
    }

    #[test]
    fn zero_probability_never_fires() {
        let mut c = ActivationCounters::new();
        let mut rng = track_rng(Some(0));
        for _ in 0..20 {
            assert!(!c.should_activate(EffectKind::Retrigger, 0, &gate(1, 0), &mut rng));
        }
    }

    #[test]
    fn partial_probability_is_seeded() {
        let run = || {
            let mut c = ActivationCounters::new();
            let mut rng = track_rng(Some(11));
            (0..64)
                .map(|_| c.should_activate(EffectKind::Retrigger, 0, &gate(1, 50), &mut rng))
                .collect::<Vec<_>>()
        };
        let a = run();
        assert_eq!(a, run());
        assert!(a.iter().any(|&f| f));
        assert!(a.iter().any(|&f| !f));
    }

    #[test]
    fn reset_restarts_counting() {
        let mut c = ActivationCounters::new();
        let mut rng = track_rng(Some(0));
        let g = gate(2, 100);
        assert!(c.should_activate(EffectKind::Retrigger, 0, &g, &mut rng));
        c.reset();
        assert!(c.should_activate(EffectKind::Retrigger, 0, &g, &mut rng));
    }
}
