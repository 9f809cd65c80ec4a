//! Fixed-cadence tick source and the loop that drives [`MemoryEditor::tick`].

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::editor::{MemoryEditor, TickReport};
use crate::memory::ProcessProvider;

/// Longest single sleep, bounds how late a shutdown request is noticed
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Fixed-interval schedule.
///
/// Deadlines are spaced by `interval` regardless of how long each tick took.
/// When a tick overruns one or more deadlines those ticks are dropped rather
/// than fired back to back.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
    missed: u64,
}

impl Ticker {
    /// The first tick fires immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
            missed: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks skipped because the caller was late
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Block until the next deadline.
    ///
    /// Returns `false` if `shutdown` was set while waiting.
    pub fn wait(&mut self, shutdown: &AtomicBool) -> bool {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return false;
            }
            let now = Instant::now();
            if now >= self.next {
                break;
            }
            thread::sleep((self.next - now).min(SHUTDOWN_POLL));
        }

        self.next += self.interval;
        let now = Instant::now();
        if self.next <= now && !self.interval.is_zero() {
            let behind = (now - self.next).as_nanos() / self.interval.as_nanos() + 1;
            let behind = u32::try_from(behind).unwrap_or(u32::MAX);
            self.missed += behind as u64;
            self.next += self.interval.saturating_mul(behind);
            debug!("Tick overran, dropped {} tick(s)", behind);
        }
        true
    }
}

/// Tick `editor` at its configured interval until `shutdown` is set or
/// `on_tick` breaks. Returns the number of ticks run.
///
/// Everything runs on the calling thread, so refreshes, diffs and edits made
/// from `on_tick` never overlap.
pub fn run_loop<P, F>(editor: &mut MemoryEditor<P>, shutdown: &AtomicBool, mut on_tick: F) -> u64
where
    P: ProcessProvider,
    F: FnMut(&mut MemoryEditor<P>, &TickReport) -> ControlFlow<()>,
{
    let mut ticker = Ticker::new(editor.config().poll_interval);
    let mut ticks = 0u64;

    info!(
        "Polling {} every {}ms",
        editor.config().target,
        ticker.interval().as_millis()
    );

    while ticker.wait(shutdown) {
        let report = editor.tick();
        ticks += 1;
        if on_tick(editor, &report).is_break() {
            break;
        }
    }

    debug!("Stopped after {} ticks ({} dropped)", ticks, ticker.missed());
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::memory::{MockMemoryBuilder, MockProvider};
    use crate::schema::builtin_schema;
    use std::sync::Arc;

    #[test]
    fn test_first_tick_is_immediate() {
        let mut ticker = Ticker::new(Duration::from_secs(10));
        let shutdown = AtomicBool::new(false);
        let start = Instant::now();
        assert!(ticker.wait(&shutdown));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_ticks_are_spaced_by_interval() {
        let mut ticker = Ticker::new(Duration::from_millis(20));
        let shutdown = AtomicBool::new(false);
        ticker.wait(&shutdown);

        let start = Instant::now();
        ticker.wait(&shutdown);
        ticker.wait(&shutdown);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(200));
        assert_eq!(ticker.missed(), 0);
    }

    #[test]
    fn test_missed_ticks_are_dropped() {
        let mut ticker = Ticker::new(Duration::from_millis(20));
        let shutdown = AtomicBool::new(false);
        ticker.wait(&shutdown);

        // Simulate a slow tick spanning several deadlines.
        thread::sleep(Duration::from_millis(75));
        ticker.wait(&shutdown);
        assert!(ticker.missed() >= 2);

        // Next deadline lies in the future instead of firing immediately.
        let start = Instant::now();
        ticker.wait(&shutdown);
        assert!(start.elapsed() >= Duration::from_millis(1));
    }

    #[test]
    fn test_shutdown_interrupts_wait() {
        let mut ticker = Ticker::new(Duration::from_secs(10));
        let shutdown = Arc::new(AtomicBool::new(false));
        ticker.wait(&shutdown);

        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            flag.store(true, Ordering::SeqCst);
        });

        let start = Instant::now();
        assert!(!ticker.wait(&shutdown));
        assert!(start.elapsed() < Duration::from_secs(1));
        handle.join().unwrap();
    }

    #[test]
    fn test_run_loop_stops_on_break() {
        let provider = MockProvider::new(MockMemoryBuilder::new().build());
        provider.refuse_next(usize::MAX);
        let config = EditorConfig::builder()
            .poll_interval(Duration::from_millis(1))
            .build();
        let mut editor = MemoryEditor::new(provider, builtin_schema(), config).unwrap();
        let shutdown = AtomicBool::new(false);

        let mut seen = Vec::new();
        let ticks = run_loop(&mut editor, &shutdown, |_, report| {
            seen.push(report.tick);
            if report.tick == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(ticks, 3);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_run_loop_honours_shutdown() {
        let provider = MockProvider::new(MockMemoryBuilder::new().build());
        let mut editor =
            MemoryEditor::new(provider, builtin_schema(), EditorConfig::default()).unwrap();
        let shutdown = AtomicBool::new(true);

        let ticks = run_loop(&mut editor, &shutdown, |_, _| ControlFlow::Continue(()));
        assert_eq!(ticks, 0);
    }
}
