//! Newline framing over a byte transport.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use crate::error::ChannelError;

/// Default pause between polls when no complete line is available.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(10);

/// Pending bytes without a newline beyond this size are thrown away.
const MAX_PENDING_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 1024;

/// Yields complete, trimmed text lines from a byte transport.
///
/// The transport is expected to have its own read timeout (the serial port
/// is opened with one); a timed-out read simply means no line is ready yet.
/// Dropping the channel drops, and therefore closes, the transport.
pub struct LineChannel<T> {
    transport: T,
    pending: Vec<u8>,
    chunk: Box<[u8]>,
}

impl<T> std::fmt::Debug for LineChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineChannel")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<T: Read> LineChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pending: Vec::new(),
            chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
        }
    }

    /// Return the next complete line, or `None` if one isn't available yet.
    ///
    /// Performs at most one transport read. Empty lines are skipped.
    ///
    /// # Errors
    /// * `ChannelError::Disconnected` - the transport reported end of stream
    /// * `ChannelError::Io` - any other transport failure
    pub fn poll(&mut self) -> Result<Option<String>, ChannelError> {
        if let Some(line) = self.next_buffered_line() {
            return Ok(Some(line));
        }

        match self.transport.read(&mut self.chunk) {
            Ok(0) => return Err(ChannelError::Disconnected),
            Ok(n) => self.pending.extend_from_slice(&self.chunk[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                return Ok(None)
            }
            Err(e) => return Err(ChannelError::Io(e)),
        }

        if let Some(line) = self.next_buffered_line() {
            return Ok(Some(line));
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            log::warn!(
                "Discarding {} bytes received without a line terminator",
                self.pending.len()
            );
            self.pending.clear();
        }
        Ok(None)
    }

    /// Give the transport back, discarding any partial line.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn next_buffered_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = decode_line(&raw);
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

/// Lossy UTF-8 decode that drops undecodable bytes, then trims.
fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let cleaned: String = text.chars().filter(|&c| c != '\u{FFFD}').collect();
    cleaned.trim().to_string()
}
