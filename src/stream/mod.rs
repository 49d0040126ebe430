//! Live streaming: a background reader feeding a single-slot handoff.
//!
//! - Thread lifecycle via [`StreamController`]
//! - Frame handoff via [`FrameSlot`] and [`PublishedFrame`]

mod controller;
mod handoff;
mod stream_loop;

pub use controller::{StreamController, StreamSettings};
pub use handoff::{FrameSlot, PublishedFrame};
pub use stream_loop::{StreamExit, StreamReport};
