//! Background reader thread body.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::handoff::FrameSlot;
use crate::channel::LineChannel;
use crate::decoder::{FrameDecoder, RawRecord};
use crate::error::ChannelError;
use crate::exposure::ExposureAccumulator;
use crate::signal::StopToken;

/// Why the reader thread returned.
#[derive(Debug)]
pub enum StreamExit {
    /// The stop token was tripped
    Stopped,
    /// The serial link failed
    ChannelFailed(ChannelError),
}

/// Counters collected over one run of the reader thread.
#[derive(Debug)]
pub struct StreamReport {
    pub exit: StreamExit,
    /// Complete lines received
    pub lines: u64,
    /// Lines that were not valid stream frames
    pub dropped: u64,
    /// Averaged frames handed to the slot
    pub published: u64,
}

/// Everything the reader thread needs besides the channel.
pub(super) struct LoopContext {
    pub decoder: FrameDecoder,
    pub accumulator: Arc<Mutex<ExposureAccumulator>>,
    pub slot: FrameSlot,
    pub stop: StopToken,
    pub running: Arc<AtomicBool>,
    pub idle_interval: Duration,
}

/// Owns the channel for the lifetime of the loop.
///
/// On drop the transport is closed first, then the running flag cleared,
/// so an observer that sees "not running" can reopen the port.
struct Session<T> {
    channel: Option<LineChannel<T>>,
    running: Arc<AtomicBool>,
}

impl<T> Drop for Session<T> {
    fn drop(&mut self) {
        drop(self.channel.take());
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Run poll -> decode -> accumulate -> publish until stopped or the link fails.
pub(super) fn run_stream_loop<T: Read>(channel: LineChannel<T>, ctx: LoopContext) -> StreamReport {
    let mut session = Session {
        channel: Some(channel),
        running: Arc::clone(&ctx.running),
    };
    let mut report = StreamReport {
        exit: StreamExit::Stopped,
        lines: 0,
        dropped: 0,
        published: 0,
    };

    log::info!("Stream reader started ({})", ctx.decoder.shape());

    while !ctx.stop.is_stopped() {
        let Some(channel) = session.channel.as_mut() else {
            break;
        };

        let line = match channel.poll() {
            Ok(Some(line)) => line,
            Ok(None) => {
                thread::sleep(ctx.idle_interval);
                continue;
            }
            Err(e) => {
                log::error!("Stream reader stopping: {}", e);
                report.exit = StreamExit::ChannelFailed(e);
                break;
            }
        };
        report.lines += 1;

        let frame = match ctx.decoder.decode(&line) {
            RawRecord::StreamFrame(frame) => frame,
            RawRecord::Unrecognized { reason } => {
                report.dropped += 1;
                log::debug!("Dropped line ({}): {:.60}", reason, line);
                continue;
            }
            other => {
                report.dropped += 1;
                log::debug!("Ignoring {:?} while streaming", other);
                continue;
            }
        };

        let averaged = match ctx.accumulator.lock() {
            Ok(mut acc) => acc.push(frame),
            Err(poisoned) => poisoned.into_inner().push(frame),
        };

        if let Some(averaged) = averaged {
            ctx.slot.publish(averaged);
            report.published += 1;
        }
    }

    drop(session);
    log::info!(
        "Stream reader finished: {} lines, {} dropped, {} frames published",
        report.lines,
        report.dropped,
        report.published
    );
    report
}
