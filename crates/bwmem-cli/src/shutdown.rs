use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown flag shared by the Ctrl+C handler, the key monitor and the tick loop.
///
/// The tick loop only sees the inner `AtomicBool`; its waits are sliced so a
/// trigger is noticed within a few milliseconds.
pub struct ShutdownSignal {
    shutdown: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn as_atomic(&self) -> &AtomicBool {
        &self.shutdown
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
