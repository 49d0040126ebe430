//! Cooperative cancellation shared between threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap, cloneable stop flag checked once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Trip `token` on Ctrl+C.
///
/// This should be called once at program startup.
pub fn setup_ctrlc_handler(token: StopToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        token.stop();
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}
