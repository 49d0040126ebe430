//! Configuration file handling for serialcam.
//!
//! Loads configuration from `<config dir>/serialcam/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::BatchSettings;
use crate::error::ConfigError;
use crate::port::{PortSettings, DEFAULT_BAUD_RATE};
use crate::profile::{DeviceProfile, FrameShape, MAX_EXPOSURE_FRAMES};
use crate::stream::StreamSettings;

/// Configuration file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path; auto-detected when absent
    pub port: Option<String>,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: 100,
            settle_ms: 2000,
        }
    }
}

/// Device profile selection plus optional per-field overrides.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub profile: String,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub max_pixel_value: Option<u16>,
    pub encoding_divisor: Option<u16>,
    pub max_images: Option<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            profile: "agfa35".to_string(),
            width: None,
            height: None,
            max_pixel_value: None,
            encoding_divisor: None,
            max_images: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub exposure: usize,
    pub idle_ms: u64,
    /// How often the preview checks for a new frame
    pub refresh_ms: u64,
    /// Terminal cells per sensor pixel
    pub scale: usize,
    pub charset: String,
    pub invert: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            exposure: 1,
            idle_ms: 10,
            refresh_ms: 50,
            scale: 8,
            charset: "blocks".to_string(),
            invert: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub begin_timeout_s: u64,
    pub begin_poll_ms: u64,
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            begin_timeout_s: 30,
            begin_poll_ms: 100,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_path(path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content, &path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolve the device profile, applying any overrides.
    pub fn profile(&self) -> Result<DeviceProfile, ConfigError> {
        let d = &self.device;
        let mut profile = DeviceProfile::by_name(&d.profile)?;
        let base = profile.shape;
        profile.shape = FrameShape::new(
            d.width.unwrap_or(base.width()),
            d.height.unwrap_or(base.height()),
            d.max_pixel_value.unwrap_or(base.max_pixel_value()),
            d.encoding_divisor.unwrap_or(base.encoding_divisor()),
        )?;
        if let Some(max_images) = d.max_images {
            profile.max_images = max_images;
        }
        Ok(profile)
    }

    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            path: self.serial.port.clone(),
            baud_rate: self.serial.baud_rate,
            read_timeout: Duration::from_millis(self.serial.timeout_ms),
            settle_delay: Duration::from_millis(self.serial.settle_ms),
        }
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            exposure: self.stream.exposure,
            max_exposure: MAX_EXPOSURE_FRAMES,
            idle_interval: Duration::from_millis(self.stream.idle_ms),
        }
    }

    pub fn batch_settings(&self, profile: &DeviceProfile) -> BatchSettings {
        BatchSettings {
            begin_timeout: Duration::from_secs(self.batch.begin_timeout_s),
            begin_poll: Duration::from_millis(self.batch.begin_poll_ms),
            idle_interval: Duration::from_millis(self.stream.idle_ms),
            ..BatchSettings::for_profile(profile)
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("serialcam").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/serialcam/config.toml")
        })
}

/// The `--config` path if given, otherwise [`default_path`].
pub fn resolve_path(custom: Option<&Path>) -> PathBuf {
    custom.map(PathBuf::from).unwrap_or_else(default_path)
}

/// Commented default file written by `config init`.
pub const DEFAULT_CONFIG: &str = r#"# serialcam configuration

[serial]
# Serial device path (auto-detected when omitted)
# port = "/dev/ttyUSB0"
baud_rate = 115200
# Read timeout per poll
timeout_ms = 100
# Wait after opening the port while the camera boots
settle_ms = 2000

[device]
# Built-in profile: agfa35 (7x5, 16-bit) or kodak12 (4x3, 8-bit)
profile = "agfa35"
# Optional overrides
# width = 7
# height = 5
# max_pixel_value = 65535
# encoding_divisor = 256
# max_images = 14

[stream]
# Frames averaged per displayed frame (1-20)
exposure = 1
# Pause between serial polls when idle
idle_ms = 10
# Preview refresh interval
refresh_ms = 50
# Terminal cells per sensor pixel
scale = 8
# Character set: standard, blocks, minimal
charset = "blocks"
invert = false

[batch]
# Give up if the camera doesn't start a transfer in time
begin_timeout_s = 30
begin_poll_ms = 100
# Where exported_images/, scaled_images/, source_images/ and metadata/ go
output_dir = "."
"#;
