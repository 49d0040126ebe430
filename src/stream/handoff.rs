//! Single-slot, most-recent-wins frame handoff.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::decoder::DecodedFrame;

/// An averaged frame as seen by the display side.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedFrame {
    /// Increases by one per publish; gaps mean the consumer skipped frames
    pub sequence: u64,
    pub frame: DecodedFrame,
    pub published_at: Instant,
}

#[derive(Debug, Default)]
struct SlotState {
    latest: Option<PublishedFrame>,
    published: u64,
}

/// Latest finished frame, shared between the reader thread and the display.
///
/// Publishing overwrites whatever is there; the consumer only ever sees the
/// newest frame. The lock is held just long enough to swap or clone.
#[derive(Debug, Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents. Returns the sequence number assigned.
    pub fn publish(&self, frame: DecodedFrame) -> u64 {
        let mut state = self.lock();
        state.published += 1;
        let sequence = state.published;
        state.latest = Some(PublishedFrame {
            sequence,
            frame,
            published_at: Instant::now(),
        });
        sequence
    }

    /// Copy of the newest frame, leaving it in place.
    pub fn latest(&self) -> Option<PublishedFrame> {
        self.lock().latest.clone()
    }

    /// Remove and return the newest frame.
    pub fn take(&self) -> Option<PublishedFrame> {
        self.lock().latest.take()
    }

    /// Total frames ever published to this slot.
    pub fn published_count(&self) -> u64 {
        self.lock().published
    }

    /// Poison is ignored; every critical section leaves the state whole.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        match self.inner.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
