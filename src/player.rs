//! Player: wires the shared composition, clock, sequencer and trigger sink.
//!
//! The editor holds the composition's write lock while it mutates; each tick
//! holds the read lock for its whole duration, so a cursor never sees an
//! edit half-applied. Lock order is composition, sequencer, sink.
//!
//! The clock thread runs only while a track plays: it ends itself on the
//! tick where the last track finishes, and `play` starts a fresh one.

use std::io;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use log::info;

use crate::clock::{Clock, ClockRunner, SharedClock};
use crate::model::{SharedComposition, TRACKS};
use crate::sequencer::{CursorSnapshot, Position, Sequencer, StartMode, TrackTarget};
use crate::trigger::TriggerSink;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State shared with the clock thread.
struct Shared<S> {
    composition: SharedComposition,
    clock: SharedClock,
    sequencer: Mutex<Sequencer>,
    sink: Mutex<S>,
    /// A clock thread is live. Only changed with the sequencer lock held.
    ticking: AtomicBool,
}

impl<S: TriggerSink> Shared<S> {
    fn advance(&self) -> u64 {
        let composition = read(&self.composition);
        let clock: Clock = *lock(&self.clock);
        let mut sequencer = lock(&self.sequencer);
        let mut sink = lock(&self.sink);
        sequencer.tick(&composition, &clock, &mut *sink)
    }

    /// One tick of the clock thread; breaks once nothing plays any more.
    fn clock_tick(&self) -> ControlFlow<()> {
        let composition = read(&self.composition);
        let clock: Clock = *lock(&self.clock);
        let mut sequencer = lock(&self.sequencer);
        {
            let mut sink = lock(&self.sink);
            sequencer.tick(&composition, &clock, &mut *sink);
        }
        if sequencer.is_playing() {
            ControlFlow::Continue(())
        } else {
            self.ticking.store(false, Ordering::SeqCst);
            info!("all tracks ended at tick {}", sequencer.current_tick());
            ControlFlow::Break(())
        }
    }
}

pub struct Player<S: TriggerSink + Send + 'static> {
    shared: Arc<Shared<S>>,
    runner: Option<ClockRunner>,
}

impl<S: TriggerSink + Send + 'static> Player<S> {
    pub fn new(composition: SharedComposition, clock: SharedClock, sink: S, seed: Option<u64>) -> Self {
        Self {
            shared: Arc::new(Shared {
                composition,
                clock,
                sequencer: Mutex::new(Sequencer::new(seed)),
                sink: Mutex::new(sink),
                ticking: AtomicBool::new(false),
            }),
            runner: None,
        }
    }

    pub fn composition(&self) -> SharedComposition {
        Arc::clone(&self.shared.composition)
    }

    pub fn clock(&self) -> SharedClock {
        Arc::clone(&self.shared.clock)
    }

    /// Start tracks and make sure the clock thread is running.
    pub fn play(&mut self, mode: StartMode, target: TrackTarget) -> io::Result<()> {
        let clock_live = {
            let mut sequencer = lock(&self.shared.sequencer);
            sequencer.start(mode, target);
            self.shared.ticking.swap(true, Ordering::SeqCst)
        };
        if clock_live {
            return Ok(());
        }
        // A previous thread, if any, has already decided to end.
        self.halt_clock();
        let shared = Arc::clone(&self.shared);
        match ClockRunner::start(self.clock(), move |_| shared.clock_tick()) {
            Ok(runner) => {
                info!("clock started");
                self.runner = Some(runner);
                Ok(())
            }
            Err(e) => {
                self.shared.ticking.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Stop tracks. The clock thread stops with the last playing track.
    pub fn stop(&mut self, target: TrackTarget, reset: bool) {
        let still_playing = {
            let mut sequencer = lock(&self.shared.sequencer);
            sequencer.stop(target, reset);
            let playing = sequencer.is_playing();
            if !playing {
                self.shared.ticking.store(false, Ordering::SeqCst);
            }
            playing
        };
        if !still_playing {
            self.halt_clock();
        }
    }

    /// Whether the clock thread is currently ticking.
    pub fn is_clock_running(&self) -> bool {
        self.runner.as_ref().is_some_and(ClockRunner::is_running)
    }

    /// Advance one tick by hand, without the clock thread.
    pub fn tick(&self) -> u64 {
        self.shared.advance()
    }

    /// Start tracks without starting the clock thread; drive with
    /// [`Player::tick`].
    pub fn cue(&self, mode: StartMode, target: TrackTarget) {
        lock(&self.shared.sequencer).start(mode, target);
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.shared.sequencer).is_playing()
    }

    pub fn current_tick(&self) -> u64 {
        lock(&self.shared.sequencer).current_tick()
    }

    pub fn set_cursor(&self, track: usize, position: Position) {
        lock(&self.shared.sequencer).set_cursor(track, position);
    }

    pub fn snapshot(&self) -> [CursorSnapshot; TRACKS] {
        lock(&self.shared.sequencer).snapshot()
    }

    /// Access the sink, e.g. to inspect a collected log.
    pub fn sink(&self) -> MutexGuard<'_, S> {
        lock(&self.shared.sink)
    }

    fn halt_clock(&mut self) {
        if let Some(mut runner) = self.runner.take() {
            runner.stop();
            info!("clock stopped");
        }
    }
}

impl<S: TriggerSink + Send + 'static> Drop for Player<S> {
    fn drop(&mut self) {
        self.halt_clock();
    }
}
