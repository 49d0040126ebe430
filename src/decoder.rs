//! Classification and parsing of protocol lines.
//!
//! Data records look like `STREAM,v0,...,vN,STREAM` (live mode) or
//! `IMAGE,v0,...,vN,IMAGE` (download mode). Session markers are any line
//! that merely contains `BEGIN` or `END`; a line containing both is
//! reported as [`RawRecord::BothMarkers`] and the session state decides.

use std::fmt;

use crate::profile::FrameShape;

pub const BEGIN_MARKER: &str = "BEGIN";
pub const END_MARKER: &str = "END";

/// Which data record the decoder is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// Live frames; values are compressed into the display range.
    Stream,
    /// Stored images; values are kept at their raw (clamped) scale.
    Image,
}

impl DataMode {
    fn prefix(&self) -> &'static str {
        match self {
            DataMode::Stream => "STREAM,",
            DataMode::Image => "IMAGE,",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            DataMode::Stream => ",STREAM",
            DataMode::Image => ",IMAGE",
        }
    }
}

/// A complete frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pixels: Vec<u16>,
    width: usize,
}

impl DecodedFrame {
    /// Wrap a pixel buffer; `pixels.len()` must be a multiple of `width`.
    pub(crate) fn new(pixels: Vec<u16>, width: usize) -> Self {
        debug_assert!(width > 0 && pixels.len() % width == 0);
        Self { pixels, width }
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u16> {
        self.pixels
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.pixels.len() / self.width
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Value at `(row, col)`, or `None` outside the frame.
    pub fn get(&self, row: usize, col: usize) -> Option<u16> {
        if col >= self.width {
            return None;
        }
        self.pixels.get(row * self.width + col).copied()
    }

    /// Iterate over rows.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, u16> {
        self.pixels.chunks_exact(self.width)
    }

    pub fn min(&self) -> u16 {
        self.pixels.iter().copied().min().unwrap_or(0)
    }

    pub fn max(&self) -> u16 {
        self.pixels.iter().copied().max().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().map(|&p| p as f64).sum::<f64>() / self.pixels.len() as f64
    }
}

/// One classified line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    StreamFrame(DecodedFrame),
    ImageFrame(DecodedFrame),
    Begin,
    End,
    /// Contains both `BEGIN` and `END`
    BothMarkers,
    Unrecognized { reason: UnrecognizedReason },
}

impl RawRecord {
    /// Take the frame out of a data record.
    pub fn into_frame(self) -> Option<DecodedFrame> {
        match self {
            RawRecord::StreamFrame(frame) | RawRecord::ImageFrame(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Why a line was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnrecognizedReason {
    /// Neither a data record for this mode nor a marker
    NotARecord,
    /// A token that doesn't parse as an integer
    BadToken { position: usize, token: String },
    /// Wrong number of values for the frame shape
    WrongCount { expected: usize, actual: usize },
}

impl fmt::Display for UnrecognizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnrecognizedReason::NotARecord => write!(f, "not a data record or marker"),
            UnrecognizedReason::BadToken { position, token } => {
                write!(f, "non-integer token '{}' at position {}", token, position)
            }
            UnrecognizedReason::WrongCount { expected, actual } => {
                write!(f, "expected {} pixels, got {}", expected, actual)
            }
        }
    }
}

/// Turns protocol lines into [`RawRecord`]s for one frame shape.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    shape: FrameShape,
    mode: DataMode,
}

impl FrameDecoder {
    pub fn new(shape: FrameShape, mode: DataMode) -> Self {
        Self { shape, mode }
    }

    pub fn shape(&self) -> &FrameShape {
        &self.shape
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    /// Classify and parse one trimmed line. Never fails.
    pub fn decode(&self, line: &str) -> RawRecord {
        let prefix = self.mode.prefix();
        let suffix = self.mode.suffix();

        // Data records are checked before markers: a well-formed record wins
        // even if its payload happens to contain a marker token.
        if line.len() >= prefix.len() + suffix.len()
            && line.starts_with(prefix)
            && line.ends_with(suffix)
        {
            let body = &line[prefix.len()..line.len() - suffix.len()];
            return match self.parse_pixels(body) {
                Ok(frame) => match self.mode {
                    DataMode::Stream => RawRecord::StreamFrame(frame),
                    DataMode::Image => RawRecord::ImageFrame(frame),
                },
                Err(reason) => RawRecord::Unrecognized { reason },
            };
        }

        match (line.contains(BEGIN_MARKER), line.contains(END_MARKER)) {
            (true, true) => RawRecord::BothMarkers,
            (true, false) => RawRecord::Begin,
            (false, true) => RawRecord::End,
            (false, false) => RawRecord::Unrecognized {
                reason: UnrecognizedReason::NotARecord,
            },
        }
    }

    fn parse_pixels(&self, body: &str) -> Result<DecodedFrame, UnrecognizedReason> {
        let expected = self.shape.pixel_count();
        let max = i64::from(self.shape.max_pixel_value());
        let mut pixels = Vec::with_capacity(expected);

        for (position, token) in body.split(',').map(str::trim).enumerate() {
            if token.is_empty() {
                continue;
            }
            let value = parse_saturating(token).ok_or_else(|| UnrecognizedReason::BadToken {
                position,
                token: token.to_string(),
            })?;
            let clamped = value.clamp(0, max) as u16;
            pixels.push(match self.mode {
                DataMode::Stream => clamped / self.shape.encoding_divisor(),
                DataMode::Image => clamped,
            });
        }

        if pixels.len() != expected {
            return Err(UnrecognizedReason::WrongCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(DecodedFrame::new(pixels, self.shape.width()))
    }
}

/// Parse a decimal integer, saturating at the `i64` bounds.
///
/// Returns `None` only for tokens that are not integers at all.
fn parse_saturating(token: &str) -> Option<i64> {
    if let Ok(value) = token.parse::<i64>() {
        return Some(value);
    }
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}
