//! Temporal averaging of consecutive frames.

use crate::decoder::DecodedFrame;
use crate::error::ConfigError;

/// Collects frames until the exposure count is reached, then emits their
/// per-pixel mean.
#[derive(Debug)]
pub struct ExposureAccumulator {
    window: Vec<DecodedFrame>,
    exposure: usize,
    max_exposure: usize,
}

impl ExposureAccumulator {
    /// # Errors
    /// * `ConfigError::InvalidExposure` - `exposure` outside `1..=max_exposure`
    pub fn new(exposure: usize, max_exposure: usize) -> Result<Self, ConfigError> {
        validate(exposure, max_exposure)?;
        Ok(Self {
            window: Vec::with_capacity(exposure),
            exposure,
            max_exposure,
        })
    }

    pub fn exposure(&self) -> usize {
        self.exposure
    }

    pub fn max_exposure(&self) -> usize {
        self.max_exposure
    }

    /// Frames waiting in the current window.
    pub fn pending(&self) -> usize {
        self.window.len()
    }

    /// Change the exposure count. The partial window is discarded.
    pub fn set_exposure(&mut self, exposure: usize) -> Result<(), ConfigError> {
        validate(exposure, self.max_exposure)?;
        if !self.window.is_empty() {
            log::debug!(
                "Exposure changed {} -> {}, dropping {} pending frame(s)",
                self.exposure,
                exposure,
                self.window.len()
            );
        }
        self.exposure = exposure;
        self.window.clear();
        Ok(())
    }

    /// Discard the partial window, keeping the exposure count.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Add a frame; returns the averaged frame once the window is full.
    pub fn push(&mut self, frame: DecodedFrame) -> Option<DecodedFrame> {
        if let Some(first) = self.window.first() {
            if first.len() != frame.len() || first.width() != frame.width() {
                log::warn!("Frame geometry changed mid-exposure, restarting window");
                self.window.clear();
            }
        }

        self.window.push(frame);
        if self.window.len() < self.exposure {
            return None;
        }

        let averaged = average(&self.window);
        self.window.clear();
        Some(averaged)
    }
}

fn validate(exposure: usize, max_exposure: usize) -> Result<(), ConfigError> {
    if exposure == 0 || exposure > max_exposure {
        return Err(ConfigError::InvalidExposure {
            requested: exposure,
            max: max_exposure,
        });
    }
    Ok(())
}

/// Per-pixel mean, rounded to the nearest integer. `frames` is non-empty.
fn average(frames: &[DecodedFrame]) -> DecodedFrame {
    let width = frames[0].width();
    let mut sums = vec![0u64; frames[0].len()];
    for frame in frames {
        for (sum, &p) in sums.iter_mut().zip(frame.pixels()) {
            *sum += u64::from(p);
        }
    }

    let n = frames.len() as f64;
    let pixels = sums
        .into_iter()
        .map(|sum| (sum as f64 / n).round() as u16)
        .collect();
    DecodedFrame::new(pixels, width)
}
