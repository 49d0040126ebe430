//! Terminal preview of live frames.
//!
//! Frames are tiny (a few dozen pixels), so they are blown up with
//! nearest-neighbor scaling and drawn with a brightness ramp.

use std::time::{Duration, Instant};

use crate::decoder::DecodedFrame;
use crate::profile::FrameShape;

/// Standard ASCII density ramp (10 levels), darkest first.
pub const STANDARD_CHARSET: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Unicode block ramp (5 levels).
pub const BLOCKS_CHARSET: &[char] = &[' ', '░', '▒', '▓', '█'];

/// Minimal ramp (4 levels).
pub const MINIMAL_CHARSET: &[char] = &[' ', '.', ':', '#'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    #[default]
    Standard,
    Blocks,
    Minimal,
}

impl CharSet {
    pub fn chars(&self) -> &'static [char] {
        match self {
            CharSet::Standard => STANDARD_CHARSET,
            CharSet::Blocks => BLOCKS_CHARSET,
            CharSet::Minimal => MINIMAL_CHARSET,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharSet::Standard => "standard",
            CharSet::Blocks => "blocks",
            CharSet::Minimal => "minimal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(CharSet::Standard),
            "blocks" => Some(CharSet::Blocks),
            "minimal" => Some(CharSet::Minimal),
            _ => None,
        }
    }
}

/// Map a brightness value (0-255) onto the ramp.
pub fn brightness_to_char(brightness: u8, chars: &[char]) -> char {
    if chars.is_empty() {
        return ' ';
    }
    let index = (brightness as usize * (chars.len() - 1) + 127) / 255;
    chars[index.min(chars.len() - 1)]
}

/// Scale a row-major 8-bit image by an integer factor, repeating pixels.
pub fn upscale_nearest(pixels: &[u8], width: usize, height: usize, factor: usize) -> Vec<u8> {
    if factor <= 1 {
        return pixels.to_vec();
    }
    let out_width = width * factor;
    let mut out = Vec::with_capacity(out_width * height * factor);
    for row in pixels.chunks_exact(width).take(height) {
        let mut scaled_row = Vec::with_capacity(out_width);
        for &p in row {
            scaled_row.extend(std::iter::repeat(p).take(factor));
        }
        for _ in 0..factor {
            out.extend_from_slice(&scaled_row);
        }
    }
    out
}

/// Renders frames as text.
#[derive(Debug, Clone)]
pub struct AsciiPreview {
    shape: FrameShape,
    charset: CharSet,
    /// Horizontal cells per pixel; terminal cells are about twice as tall
    /// as wide, so rows use half this factor
    scale: usize,
    invert: bool,
}

impl AsciiPreview {
    pub fn new(shape: FrameShape, charset: CharSet, scale: usize) -> Self {
        Self {
            shape,
            charset,
            scale: scale.max(1),
            invert: false,
        }
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Render a frame whose values are already in display range (0-255).
    pub fn render(&self, frame: &DecodedFrame) -> String {
        let brightness: Vec<u8> = frame
            .pixels()
            .iter()
            .map(|&p| {
                let b = p.min(255) as u8;
                if self.invert {
                    255 - b
                } else {
                    b
                }
            })
            .collect();

        let width = frame.width();
        let rows = (self.scale / 2).max(1);
        let chars = self.charset.chars();
        let mut out = String::with_capacity((width * self.scale + 1) * frame.height() * rows);

        for row in brightness.chunks_exact(width) {
            let mut line = String::with_capacity(width * self.scale);
            for &b in row {
                let c = brightness_to_char(b, chars);
                line.extend(std::iter::repeat(c).take(self.scale));
            }
            for _ in 0..rows {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }

    pub fn shape(&self) -> &FrameShape {
        &self.shape
    }
}

/// Frames-per-second meter updated about once per second.
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one frame; returns the current rate.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f64 {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f64 / elapsed.as_secs_f64();
            self.frames = 0;
            self.window_start = now;
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DeviceProfile;

    #[test]
    fn test_brightness_extremes() {
        assert_eq!(brightness_to_char(0, STANDARD_CHARSET), ' ');
        assert_eq!(brightness_to_char(255, STANDARD_CHARSET), '@');
        assert_eq!(brightness_to_char(255, BLOCKS_CHARSET), '█');
        assert_eq!(brightness_to_char(10, &[]), ' ');
    }

    #[test]
    fn test_upscale_nearest() {
        let out = upscale_nearest(&[1, 2, 3, 4], 2, 2, 2);
        assert_eq!(
            out,
            vec![1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]
        );
        assert_eq!(upscale_nearest(&[9], 1, 1, 1), vec![9]);
    }

    #[test]
    fn test_render_dimensions() {
        let shape = DeviceProfile::kodak12().shape;
        let preview = AsciiPreview::new(shape, CharSet::Minimal, 4);
        let frame = DecodedFrame::new(vec![255; 12], 4);
        let text = preview.render(&frame);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3 * 2);
        assert!(lines.iter().all(|l| l.chars().count() == 16));
        assert!(lines.iter().all(|l| l.chars().all(|c| c == '#')));
    }

    #[test]
    fn test_render_invert() {
        let shape = DeviceProfile::kodak12().shape;
        let preview = AsciiPreview::new(shape, CharSet::Standard, 1).with_invert(true);
        let frame = DecodedFrame::new(vec![0; 12], 4);
        assert!(preview.render(&frame).lines().all(|l| l == "@@@@"));
    }

    #[test]
    fn test_charset_names() {
        for cs in [CharSet::Standard, CharSet::Blocks, CharSet::Minimal] {
            assert_eq!(CharSet::from_name(cs.name()), Some(cs));
        }
        assert_eq!(CharSet::from_name("braille"), None);
    }

    #[test]
    fn test_fps_counter() {
        let mut fps = FpsCounter::new();
        let start = fps.window_start;
        for _ in 0..9 {
            fps.tick_at(start + Duration::from_millis(500));
        }
        assert_eq!(fps.fps(), 0.0);
        let rate = fps.tick_at(start + Duration::from_secs(2));
        assert!((rate - 5.0).abs() < 1e-9);
    }
}
