//! Sensor geometry and per-device constants.
//!
//! Both supported cameras run the same protocol; they differ only in the
//! numbers collected here. A [`DeviceProfile`] is chosen once at startup and
//! shared read-only by every stage of the pipeline.

use std::fmt;

use crate::error::ConfigError;

/// Largest exposure count the accumulator accepts.
pub const MAX_EXPOSURE_FRAMES: usize = 20;

/// Shape and value range of one sensor frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    width: usize,
    height: usize,
    max_pixel_value: u16,
    encoding_divisor: u16,
}

impl FrameShape {
    /// Build a validated frame shape.
    ///
    /// # Errors
    /// * `ConfigError::InvalidShape` - zero dimension, a value range other
    ///   than 8 or 16 bit, or a zero divisor
    pub fn new(
        width: usize,
        height: usize,
        max_pixel_value: u16,
        encoding_divisor: u16,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidShape(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if max_pixel_value != 255 && max_pixel_value != u16::MAX {
            return Err(ConfigError::InvalidShape(format!(
                "max pixel value must be 255 or 65535, got {}",
                max_pixel_value
            )));
        }
        if encoding_divisor == 0 {
            return Err(ConfigError::InvalidShape(
                "encoding divisor must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            max_pixel_value,
            encoding_divisor,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of values in one frame (`width * height`).
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn max_pixel_value(&self) -> u16 {
        self.max_pixel_value
    }

    /// Divisor that squeezes a raw value into the 0-255 display range.
    pub fn encoding_divisor(&self) -> u16 {
        self.encoding_divisor
    }

    /// Bytes one raw value occupies in device memory.
    pub fn bytes_per_pixel(&self) -> usize {
        if self.max_pixel_value > 255 {
            2
        } else {
            1
        }
    }

    /// Compress a raw (clamped) value into 8 bits for display or PNG export.
    pub fn to_display(&self, raw: u16) -> u8 {
        (raw.min(self.max_pixel_value) / self.encoding_divisor).min(255) as u8
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} (0-{}, /{})",
            self.width, self.height, self.max_pixel_value, self.encoding_divisor
        )
    }
}

/// Everything that distinguishes one camera model from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Short identifier, also used in archive headers
    pub name: String,
    pub shape: FrameShape,
    /// Capacity of the device's image store
    pub max_images: usize,
    /// Informational line the firmware prints after boot
    pub ready_banner: String,
}

impl DeviceProfile {
    /// 7x5 sensor with 16-bit samples, 14 stored images.
    pub fn agfa35() -> Self {
        Self {
            name: "Agfa35".to_string(),
            shape: FrameShape {
                width: 7,
                height: 5,
                max_pixel_value: u16::MAX,
                encoding_divisor: 256,
            },
            max_images: 14,
            ready_banner: "Agfa35 Camera V2 Ready".to_string(),
        }
    }

    /// 4x3 sensor with 8-bit samples, 20 stored images.
    pub fn kodak12() -> Self {
        Self {
            name: "Kodak12".to_string(),
            shape: FrameShape {
                width: 4,
                height: 3,
                max_pixel_value: 255,
                encoding_divisor: 1,
            },
            max_images: 20,
            ready_banner: "Kodak12 Camera V2 Ready".to_string(),
        }
    }

    /// Look up a built-in profile by case-insensitive name.
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "agfa35" => Ok(Self::agfa35()),
            "kodak12" => Ok(Self::kodak12()),
            _ => Err(ConfigError::UnknownProfile(name.to_string())),
        }
    }

    /// Names accepted by [`DeviceProfile::by_name`].
    pub fn builtin_names() -> &'static [&'static str] {
        &["agfa35", "kodak12"]
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} max {} images",
            self.name, self.shape, self.max_images
        )
    }
}
