//! Error types shared across the acquisition pipeline.
//!
//! Malformed protocol lines are not errors: the decoder reports them as
//! [`crate::decoder::RawRecord::Unrecognized`] and processing continues.

use std::path::PathBuf;

/// Transport failures surfaced by [`crate::channel::LineChannel`].
///
/// These end the owning controller's loop; reconnecting is up to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Serial device disconnected")]
    Disconnected,

    #[error("Serial read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors opening or enumerating serial ports.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("No serial ports found. Make sure the camera is plugged in")]
    NoPorts,

    #[error("Failed to list serial ports: {0}")]
    Enumerate(String),

    #[error("Failed to open serial port '{port}': {message}")]
    Open { port: String, message: String },
}

/// Invalid configuration, rejected before any acquisition starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid frame shape: {0}")]
    InvalidShape(String),

    #[error("Exposure count must be between 1 and {max}, got {requested}")]
    InvalidExposure { requested: usize, max: usize },

    #[error("Unknown device profile '{0}'. Available profiles: agfa35, kodak12")]
    UnknownProfile(String),

    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Errors writing frames to the on-disk archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Metadata encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame has {actual} pixels, profile expects {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}
