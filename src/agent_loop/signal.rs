//! Cooperative stop flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clonable cooperative-stop flag shared between a runner and whoever may
/// need to abort it (the active-event registry, a command handler, a test).
///
/// Raising the flag never interrupts an in-flight buffered call; the runner
/// observes it at step start and between streaming deltas.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
