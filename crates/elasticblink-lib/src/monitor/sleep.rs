//! Interruptible waiting and the shutdown flag that interrupts it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Granularity at which [`InterruptibleSleeper`] checks for shutdown.
const SLICE: Duration = Duration::from_millis(250);

/// Process-wide stop request, shared between the signal handler and the loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blocks the control thread for a fixed duration.
pub trait Sleeper {
    /// Wait for `duration`. Returns `false` if shutdown was requested before
    /// (or while) waiting, `true` if the full duration elapsed.
    fn sleep(&self, duration: Duration) -> bool;
}

/// Real-time sleeper that wakes every 250 ms to observe the shutdown flag.
#[derive(Debug, Clone)]
pub struct InterruptibleSleeper {
    shutdown: ShutdownFlag,
}

impl InterruptibleSleeper {
    pub fn new(shutdown: ShutdownFlag) -> Self {
        Self { shutdown }
    }
}

impl Sleeper for InterruptibleSleeper {
    fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.shutdown.is_requested() {
                return false;
            }
            let step = remaining.min(SLICE);
            std::thread::sleep(step);
            remaining -= step;
        }
        !self.shutdown.is_requested()
    }
}

/// Sleepers for tests.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Records requested durations without waiting.
    ///
    /// With [`ManualSleeper::stop_after`], requests shutdown once the given
    /// number of sleeps of at least `threshold` have been recorded, which lets
    /// tests run an exact number of poll cycles.
    #[derive(Debug, Default)]
    pub struct ManualSleeper {
        pub sleeps: RefCell<Vec<Duration>>,
        shutdown: Option<ShutdownFlag>,
        threshold: Duration,
        remaining: Cell<usize>,
    }

    impl ManualSleeper {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn stop_after(shutdown: ShutdownFlag, long_sleeps: usize, threshold: Duration) -> Self {
            ManualSleeper {
                sleeps: RefCell::new(Vec::new()),
                shutdown: Some(shutdown),
                threshold,
                remaining: Cell::new(long_sleeps),
            }
        }

        pub fn total(&self) -> Duration {
            self.sleeps.borrow().iter().sum()
        }
    }

    impl Sleeper for ManualSleeper {
        fn sleep(&self, duration: Duration) -> bool {
            self.sleeps.borrow_mut().push(duration);
            let Some(shutdown) = &self.shutdown else {
                return true;
            };
            if shutdown.is_requested() {
                return false;
            }
            if duration >= self.threshold && self.remaining.get() > 0 {
                self.remaining.set(self.remaining.get() - 1);
                if self.remaining.get() == 0 {
                    shutdown.request();
                    return false;
                }
            }
            true
        }
    }
}
