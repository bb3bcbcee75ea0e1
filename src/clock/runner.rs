//! Clock runner: invokes a tick callback on a dedicated thread.

use std::io;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use super::{Clock, SharedClock};

/// Longest single sleep, so a stop request is noticed quickly even at 1 BPM.
const MAX_SLEEP: Duration = Duration::from_millis(20);

/// Active tick source running on a background thread.
pub struct ClockRunner {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ClockRunner {
    /// Start ticking. `on_tick` receives the running tick index, starting at 0
    /// immediately. The thread ends on [`ClockRunner::stop`] or when `on_tick`
    /// returns `ControlFlow::Break`.
    ///
    /// Deadlines accumulate from the start instant rather than from the end
    /// of each callback, so callback time does not drift the grid. If the
    /// thread falls more than one period behind, the grid is re-anchored to
    /// now instead of firing a catch-up burst.
    pub fn start<F>(clock: SharedClock, mut on_tick: F) -> io::Result<Self>
    where
        F: FnMut(u64) -> ControlFlow<()> + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = thread::Builder::new()
            .name("gridtrack-clock".to_string())
            .spawn(move || {
                let mut tick: u64 = 0;
                let mut deadline = Instant::now();
                while !stop_clone.load(Ordering::Relaxed) {
                    if on_tick(tick).is_break() {
                        debug!("clock thread finished after tick {tick}");
                        break;
                    }
                    tick += 1;

                    let period = clock
                        .lock()
                        .map(|c| c.period())
                        .unwrap_or_else(|poisoned| poisoned.into_inner().period());
                    deadline += period;

                    let now = Instant::now();
                    if now > deadline + period {
                        debug!("clock fell behind at tick {tick}, re-anchoring");
                        deadline = now;
                    }

                    while !stop_clone.load(Ordering::Relaxed) {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::sleep((deadline - now).min(MAX_SLEEP));
                    }
                }
            })?;

        Ok(Self {
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Convenience for a clock that nobody else adjusts.
    pub fn start_fixed<F>(clock: Clock, on_tick: F) -> io::Result<Self>
    where
        F: FnMut(u64) -> ControlFlow<()> + Send + 'static,
    {
        Self::start(clock.into_shared(), on_tick)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the thread to stop and wait for it.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ClockRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn ticks_arrive_in_order() {
        let (tx, rx) = mpsc::channel();
        // 999 BPM × 32 PPQ ≈ 1.9 ms per tick.
        let mut runner = ClockRunner::start_fixed(Clock::new(999.0, 32), move |tick| {
            let _ = tx.send(tick);
            ControlFlow::Continue(())
        })
        .unwrap();
        let ticks: Vec<u64> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        runner.stop();
        assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn stop_is_prompt_with_slow_tempo() {
        let mut runner = ClockRunner::start_fixed(Clock::new(1.0, 1), |_| ControlFlow::Continue(())).unwrap();
        assert!(runner.is_running());
        let started = Instant::now();
        runner.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!runner.is_running());
    }

    #[test]
    fn tempo_change_applies_to_next_tick() {
        let clock = Clock::new(999.0, 32).into_shared();
        let shared = clock.clone();
        let (tx, rx) = mpsc::channel();
        let mut runner = ClockRunner::start(clock, move |tick| {
            if tick == 2 {
                if let Ok(mut c) = shared.lock() {
                    c.set_bpm(60.0);
                    c.set_ppq(1);
                }
            }
            let _ = tx.send(tick);
            ControlFlow::Continue(())
        })
        .unwrap();
        for expected in 0..3 {
            assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), expected);
        }
        // Tick 3 is now a full second away.
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
        runner.stop();
    }

    #[test]
    fn callback_can_end_the_thread() {
        let (tx, rx) = mpsc::channel();
        let mut runner = ClockRunner::start_fixed(Clock::new(999.0, 32), move |tick| {
            let _ = tx.send(tick);
            if tick == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while runner.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!runner.is_running());
        let ticks: Vec<u64> = rx.try_iter().collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        runner.stop();
    }
}
