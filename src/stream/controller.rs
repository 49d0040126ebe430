//! Live stream handle and public API.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use super::handoff::{FrameSlot, PublishedFrame};
use super::stream_loop::{run_stream_loop, LoopContext, StreamExit, StreamReport};
use crate::channel::{LineChannel, DEFAULT_IDLE_INTERVAL};
use crate::decoder::{DataMode, FrameDecoder};
use crate::error::ConfigError;
use crate::exposure::ExposureAccumulator;
use crate::profile::{FrameShape, MAX_EXPOSURE_FRAMES};
use crate::signal::StopToken;

/// Settings for live streaming.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Frames averaged into each published frame
    pub exposure: usize,
    /// Upper bound accepted by `set_exposure`
    pub max_exposure: usize,
    /// Sleep between polls when no line is ready
    pub idle_interval: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            exposure: 1,
            max_exposure: MAX_EXPOSURE_FRAMES,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }
}

/// Live stream handle.
///
/// `start()` hands a [`LineChannel`] to a background thread which decodes
/// `STREAM` records, averages them and publishes the result to a
/// [`FrameSlot`]. Call `latest_frame()` or `take_frame()` from the display
/// side to pick up the newest frame.
pub struct StreamController {
    decoder: FrameDecoder,
    /// Shared with the reader thread so exposure changes can't race a push
    accumulator: Arc<Mutex<ExposureAccumulator>>,
    slot: FrameSlot,
    stop_signal: StopToken,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<StreamReport>>,
    /// Report of a reader that exited on its own, kept until `stop()`
    finished: Option<StreamReport>,
    settings: StreamSettings,
}

impl std::fmt::Debug for StreamController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("settings", &self.settings)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl StreamController {
    /// # Errors
    /// * `ConfigError::InvalidExposure` - exposure outside `1..=max_exposure`
    pub fn new(shape: FrameShape, settings: StreamSettings) -> Result<Self, ConfigError> {
        let accumulator = ExposureAccumulator::new(settings.exposure, settings.max_exposure)?;
        Ok(Self {
            decoder: FrameDecoder::new(shape, DataMode::Stream),
            accumulator: Arc::new(Mutex::new(accumulator)),
            slot: FrameSlot::new(),
            stop_signal: StopToken::new(),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            finished: None,
            settings,
        })
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn shape(&self) -> &FrameShape {
        self.decoder.shape()
    }

    /// Start reading `channel` on a background thread.
    ///
    /// Does nothing if a reader is already running; the extra channel is
    /// dropped, which closes its transport.
    pub fn start<T>(&mut self, channel: LineChannel<T>)
    where
        T: Read + Send + 'static,
    {
        if self.is_running() {
            log::warn!("Stream already running, ignoring start request");
            return;
        }
        // Reap a reader that exited on its own (e.g. disconnect).
        if let Some(report) = self.join_worker().or_else(|| self.finished.take()) {
            log::debug!("Previous reader exited with {:?}", report.exit);
        }

        self.stop_signal.reset();
        self.running.store(true, Ordering::SeqCst);
        self.lock_accumulator().reset();

        let ctx = LoopContext {
            decoder: self.decoder,
            accumulator: Arc::clone(&self.accumulator),
            slot: self.slot.clone(),
            stop: self.stop_signal.clone(),
            running: Arc::clone(&self.running),
            idle_interval: self.settings.idle_interval,
        };

        let handle = std::thread::spawn(move || run_stream_loop(channel, ctx));
        self.worker = Some(handle);
    }

    /// Stop the reader thread and wait for it to finish.
    ///
    /// Returns the run's report, or `None` if nothing was running.
    pub fn stop(&mut self) -> Option<StreamReport> {
        self.stop_signal.stop();
        self.join_worker().or_else(|| self.finished.take())
    }

    /// Why the reader thread exited, once it has.
    ///
    /// `None` while a reader is still running or if none ever ran.
    pub fn last_exit(&mut self) -> Option<&StreamExit> {
        if !self.is_running() {
            if let Some(report) = self.join_worker() {
                self.finished = Some(report);
            }
        }
        self.finished.as_ref().map(|report| &report.exit)
    }

    /// True while the reader thread owns an open transport.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Change the number of frames averaged together.
    ///
    /// Any partially filled window is discarded.
    pub fn set_exposure(&mut self, exposure: usize) -> Result<(), ConfigError> {
        self.lock_accumulator().set_exposure(exposure)?;
        self.settings.exposure = exposure;
        log::info!("Exposure set to {} frame(s)", exposure);
        Ok(())
    }

    pub fn exposure(&self) -> usize {
        self.settings.exposure
    }

    /// Newest published frame, left in place.
    pub fn latest_frame(&self) -> Option<PublishedFrame> {
        self.slot.latest()
    }

    /// Newest published frame, removed from the slot.
    pub fn take_frame(&self) -> Option<PublishedFrame> {
        self.slot.take()
    }

    /// A handle to the handoff slot for other consumers.
    pub fn slot(&self) -> FrameSlot {
        self.slot.clone()
    }

    fn lock_accumulator(&self) -> MutexGuard<'_, ExposureAccumulator> {
        match self.accumulator.lock() {
            Ok(acc) => acc,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn join_worker(&mut self) -> Option<StreamReport> {
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                log::error!("Stream reader thread panicked");
                self.running.store(false, Ordering::SeqCst);
                None
            }
        }
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.stop();
    }
}
