//! Shared helpers for integration tests: an in-memory serial device.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serialcam::channel::LineChannel;

/// What the transport does once its script runs out.
#[derive(Debug, Clone, Copy)]
pub enum AfterScript {
    /// Report end of stream (device unplugged)
    Disconnect,
    /// Keep timing out like a quiet serial port
    Silence,
    /// Repeat the whole script forever
    Loop,
}

/// Serves one scripted chunk per read, then follows `AfterScript`.
pub struct ScriptedTransport {
    chunks: VecDeque<Vec<u8>>,
    original: Vec<Vec<u8>>,
    after: AfterScript,
    closed: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new(lines: &[String], after: AfterScript) -> (Self, Arc<AtomicBool>) {
        let original: Vec<Vec<u8>> = lines
            .iter()
            .map(|l| format!("{}\r\n", l).into_bytes())
            .collect();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            chunks: original.iter().cloned().collect(),
            original,
            after,
            closed: Arc::clone(&closed),
        };
        (transport, closed)
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.chunks.is_empty() {
            match self.after {
                AfterScript::Disconnect => return Ok(0),
                AfterScript::Silence => {
                    thread::sleep(Duration::from_millis(1));
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
                }
                AfterScript::Loop => self.chunks = self.original.iter().cloned().collect(),
            }
        }
        let chunk = match self.chunks.pop_front() {
            Some(chunk) => chunk,
            None => return Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk[n..].to_vec());
        }
        Ok(n)
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A channel over a scripted transport plus its "closed" flag.
pub fn channel(lines: &[String], after: AfterScript) -> (LineChannel<ScriptedTransport>, Arc<AtomicBool>) {
    let (transport, closed) = ScriptedTransport::new(lines, after);
    (LineChannel::new(transport), closed)
}

/// `TAG,v0,...,vN,TAG`
pub fn record<T: ToString>(tag: &str, values: &[T]) -> String {
    let body: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("{},{},{}", tag, body.join(","), tag)
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}
