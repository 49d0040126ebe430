//! Synchronous download of a stored image batch.

use std::convert::Infallible;
use std::fmt;
use std::io::Read;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::channel::{LineChannel, DEFAULT_IDLE_INTERVAL};
use crate::decoder::{DataMode, DecodedFrame, FrameDecoder, RawRecord};
use crate::profile::DeviceProfile;
use crate::sequencer::{
    EndReason, FrameSequencer, SequencerEvent, DEFAULT_BEGIN_POLL, DEFAULT_BEGIN_TIMEOUT,
};
use crate::signal::StopToken;

/// Receives each downloaded frame with its session index.
pub trait PersistSink {
    type Error: fmt::Display;

    fn persist(&mut self, index: usize, frame: DecodedFrame) -> Result<(), Self::Error>;
}

/// Collects frames in memory.
impl PersistSink for Vec<(usize, DecodedFrame)> {
    type Error = Infallible;

    fn persist(&mut self, index: usize, frame: DecodedFrame) -> Result<(), Self::Error> {
        self.push((index, frame));
        Ok(())
    }
}

/// Settings for a batch download.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Stop after this many images even if the device keeps sending
    pub max_images: usize,
    /// How long to wait for the begin marker
    pub begin_timeout: Duration,
    /// Sleep between polls while waiting for the begin marker
    pub begin_poll: Duration,
    /// Sleep between polls while collecting
    pub idle_interval: Duration,
}

impl BatchSettings {
    /// Defaults with the image limit taken from `profile`.
    pub fn for_profile(profile: &DeviceProfile) -> Self {
        Self {
            max_images: profile.max_images,
            begin_timeout: DEFAULT_BEGIN_TIMEOUT,
            begin_poll: DEFAULT_BEGIN_POLL,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }
}

/// Result of one download run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Valid image records sequenced
    pub images_found: usize,
    /// Images the sink accepted
    pub images_persisted: usize,
    pub ended_by: EndReason,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl BatchSummary {
    fn new(ended_by: EndReason, started_at: DateTime<Local>) -> Self {
        Self {
            images_found: 0,
            images_persisted: 0,
            ended_by,
            started_at,
            finished_at: started_at,
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Local::now();
        self
    }

    /// True when the device completed the transfer (end marker or limit).
    pub fn succeeded(&self) -> bool {
        matches!(
            self.ended_by,
            EndReason::EndMarker | EndReason::MaxImagesReached
        )
    }
}

/// Drives one begin/collect/end session over a channel.
#[derive(Debug)]
pub struct BatchController {
    decoder: FrameDecoder,
    settings: BatchSettings,
    ready_banner: String,
}

impl BatchController {
    pub fn new(profile: &DeviceProfile, settings: BatchSettings) -> Self {
        Self {
            decoder: FrameDecoder::new(profile.shape, DataMode::Image),
            settings,
            ready_banner: profile.ready_banner.clone(),
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Wait for the begin marker, then hand every image to `sink`.
    ///
    /// The channel, and with it the transport, is closed when this returns.
    /// Failures are reported through [`BatchSummary::ended_by`].
    pub fn run<T, S>(&self, channel: LineChannel<T>, sink: &mut S, stop: &StopToken) -> BatchSummary
    where
        T: Read,
        S: PersistSink,
    {
        let started_at = Local::now();
        let mut channel = channel;
        let mut sequencer = FrameSequencer::new(self.settings.max_images);

        log::info!("Waiting for camera...");
        if let Some(reason) = self.wait_for_begin(&mut channel, &mut sequencer, stop) {
            log::warn!("Download aborted before start: {}", reason);
            return BatchSummary::new(reason, started_at).finish();
        }
        if sequencer.is_complete() {
            return BatchSummary::new(EndReason::MaxImagesReached, started_at).finish();
        }

        log::info!("Downloading images...");
        let mut summary = BatchSummary::new(EndReason::EndMarker, started_at);
        summary.ended_by = loop {
            if stop.is_stopped() {
                break EndReason::Cancelled;
            }

            let line = match channel.poll() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    thread::sleep(self.settings.idle_interval);
                    continue;
                }
                Err(e) => {
                    log::error!("Download interrupted: {}", e);
                    break EndReason::ChannelError;
                }
            };

            let record = self.decoder.decode(&line);
            if let RawRecord::Unrecognized { reason } = &record {
                if line.starts_with("IMAGE,") {
                    log::warn!("Rejected image record: {}", reason);
                } else {
                    log::debug!("Ignoring line ({}): {:.60}", reason, line);
                }
                continue;
            }

            match sequencer.feed(record) {
                SequencerEvent::Frame { index, frame } => {
                    summary.images_found += 1;
                    match sink.persist(index, frame) {
                        Ok(()) => {
                            summary.images_persisted += 1;
                            log::info!(
                                "Downloaded {}/{} images",
                                summary.images_found,
                                self.settings.max_images
                            );
                        }
                        Err(e) => log::error!("Failed to save image {}: {}", index, e),
                    }
                    if sequencer.is_complete() {
                        break EndReason::MaxImagesReached;
                    }
                }
                SequencerEvent::Finished(reason) => break reason,
                SequencerEvent::Started | SequencerEvent::Ignored => {}
            }
        };

        log::info!(
            "Download finished ({}): {} found, {} saved",
            summary.ended_by,
            summary.images_found,
            summary.images_persisted
        );
        summary.finish()
    }

    /// Poll until the sequencer leaves `AwaitingBegin`.
    ///
    /// Returns the failure reason, or `None` once the session has started.
    fn wait_for_begin<T: Read>(
        &self,
        channel: &mut LineChannel<T>,
        sequencer: &mut FrameSequencer,
        stop: &StopToken,
    ) -> Option<EndReason> {
        let deadline = Instant::now() + self.settings.begin_timeout;

        while Instant::now() < deadline {
            if stop.is_stopped() {
                return Some(EndReason::Cancelled);
            }

            match channel.poll() {
                Ok(Some(line)) => {
                    if line.contains(&self.ready_banner) {
                        log::debug!("Camera ready: {}", line);
                    }
                    match sequencer.feed(self.decoder.decode(&line)) {
                        SequencerEvent::Started | SequencerEvent::Finished(_) => return None,
                        _ => continue,
                    }
                }
                Ok(None) => thread::sleep(self.settings.begin_poll),
                Err(e) => {
                    log::error!("Serial link failed while waiting for camera: {}", e);
                    return Some(EndReason::ChannelError);
                }
            }
        }
        Some(EndReason::BeginTimeout)
    }
}
