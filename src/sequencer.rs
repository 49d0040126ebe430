//! Batch session state machine.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::decoder::{DecodedFrame, RawRecord};

/// How long to wait for the device to announce a batch.
pub const DEFAULT_BEGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for the begin marker.
pub const DEFAULT_BEGIN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingBegin,
    Collecting,
    Complete,
}

/// Why a batch session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// No begin marker arrived in time
    BeginTimeout,
    /// The device sent its end marker
    EndMarker,
    /// `max_images` frames were collected
    MaxImagesReached,
    /// The serial link failed
    ChannelError,
    /// Stopped from outside (Ctrl+C)
    Cancelled,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::BeginTimeout => "timed out waiting for camera",
            EndReason::EndMarker => "end of transfer",
            EndReason::MaxImagesReached => "image limit reached",
            EndReason::ChannelError => "serial link failed",
            EndReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Outcome of feeding one record to the sequencer.
#[derive(Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    Ignored,
    Started,
    Frame { index: usize, frame: DecodedFrame },
    Finished(EndReason),
}

/// Assigns contiguous indices to the image records of one session.
#[derive(Debug)]
pub struct FrameSequencer {
    state: SessionState,
    max_images: usize,
    next_index: usize,
}

impl FrameSequencer {
    pub fn new(max_images: usize) -> Self {
        Self {
            state: SessionState::AwaitingBegin,
            max_images,
            next_index: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames sequenced so far.
    pub fn frames_collected(&self) -> usize {
        self.next_index
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn feed(&mut self, record: RawRecord) -> SequencerEvent {
        match self.state {
            SessionState::AwaitingBegin => match record {
                RawRecord::Begin | RawRecord::BothMarkers => {
                    self.state = SessionState::Collecting;
                    if self.max_images == 0 {
                        self.state = SessionState::Complete;
                        return SequencerEvent::Finished(EndReason::MaxImagesReached);
                    }
                    SequencerEvent::Started
                }
                _ => SequencerEvent::Ignored,
            },
            SessionState::Collecting => match record {
                RawRecord::ImageFrame(frame) => {
                    let index = self.next_index;
                    self.next_index += 1;
                    if self.next_index >= self.max_images {
                        self.state = SessionState::Complete;
                    }
                    SequencerEvent::Frame { index, frame }
                }
                RawRecord::End | RawRecord::BothMarkers => {
                    self.state = SessionState::Complete;
                    SequencerEvent::Finished(EndReason::EndMarker)
                }
                _ => SequencerEvent::Ignored,
            },
            SessionState::Complete => SequencerEvent::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::UnrecognizedReason;

    fn image(value: u16) -> RawRecord {
        RawRecord::ImageFrame(DecodedFrame::new(vec![value; 4], 2))
    }

    fn junk() -> RawRecord {
        RawRecord::Unrecognized {
            reason: UnrecognizedReason::NotARecord,
        }
    }

    fn index_of(event: SequencerEvent) -> usize {
        match event {
            SequencerEvent::Frame { index, .. } => index,
            other => panic!("Expected Frame, got {:?}", other),
        }
    }

    #[test]
    fn test_records_before_begin_are_ignored() {
        let mut seq = FrameSequencer::new(5);
        assert_eq!(seq.feed(image(1)), SequencerEvent::Ignored);
        assert_eq!(seq.feed(RawRecord::End), SequencerEvent::Ignored);
        assert_eq!(seq.state(), SessionState::AwaitingBegin);
        assert_eq!(seq.feed(RawRecord::Begin), SequencerEvent::Started);
        assert_eq!(seq.state(), SessionState::Collecting);
    }

    #[test]
    fn test_indices_are_contiguous_despite_rejects() {
        let mut seq = FrameSequencer::new(10);
        seq.feed(RawRecord::Begin);
        assert_eq!(index_of(seq.feed(image(1))), 0);
        assert_eq!(seq.feed(junk()), SequencerEvent::Ignored);
        assert_eq!(seq.feed(junk()), SequencerEvent::Ignored);
        assert_eq!(index_of(seq.feed(image(2))), 1);
        assert_eq!(seq.feed(RawRecord::Begin), SequencerEvent::Ignored);
        assert_eq!(index_of(seq.feed(image(3))), 2);
        assert_eq!(seq.frames_collected(), 3);
    }

    #[test]
    fn test_max_images_completes_session() {
        let mut seq = FrameSequencer::new(2);
        seq.feed(RawRecord::Begin);
        seq.feed(image(1));
        assert!(!seq.is_complete());
        seq.feed(image(2));
        assert!(seq.is_complete());
        assert_eq!(seq.feed(image(3)), SequencerEvent::Ignored);
        assert_eq!(seq.feed(RawRecord::End), SequencerEvent::Ignored);
    }

    #[test]
    fn test_end_marker_completes_session() {
        let mut seq = FrameSequencer::new(14);
        seq.feed(RawRecord::Begin);
        seq.feed(image(1));
        assert_eq!(
            seq.feed(RawRecord::End),
            SequencerEvent::Finished(EndReason::EndMarker)
        );
        assert_eq!(seq.feed(RawRecord::Begin), SequencerEvent::Ignored);
        assert_eq!(seq.state(), SessionState::Complete);
    }

    #[test]
    fn test_line_with_both_markers_follows_state() {
        let mut seq = FrameSequencer::new(14);
        assert_eq!(seq.feed(RawRecord::BothMarkers), SequencerEvent::Started);
        assert_eq!(index_of(seq.feed(image(1))), 0);
        assert_eq!(
            seq.feed(RawRecord::BothMarkers),
            SequencerEvent::Finished(EndReason::EndMarker)
        );
        assert!(seq.is_complete());
    }

    #[test]
    fn test_zero_capacity_finishes_on_begin() {
        let mut seq = FrameSequencer::new(0);
        assert_eq!(
            seq.feed(RawRecord::Begin),
            SequencerEvent::Finished(EndReason::MaxImagesReached)
        );
    }
}
