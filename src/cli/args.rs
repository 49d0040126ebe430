//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{CharacterSet, Profile};
use crate::config::Config;
use crate::profile::MAX_EXPOSURE_FRAMES;

/// Live preview and image download for serial-attached pixel cameras
#[derive(Parser, Debug)]
#[command(name = "serialcam")]
#[command(version, about = "Stream and download frames from a serial pixel camera", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Serial port (auto-detect if not specified)
    #[arg(long, short, global = true)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(long, short, global = true)]
    pub baud_rate: Option<u32>,

    /// Camera profile
    #[arg(long, global = true)]
    pub profile: Option<Profile>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a live preview in the terminal
    #[command(after_help = "While streaming, type a number and press Enter to change the exposure.")]
    Stream {
        /// Frames averaged per displayed frame
        #[arg(long, short, value_parser = clap::value_parser!(u64).range(1..=MAX_EXPOSURE_FRAMES as u64))]
        exposure: Option<u64>,

        /// Terminal cells per sensor pixel
        #[arg(long, short)]
        scale: Option<usize>,

        /// ASCII character set
        #[arg(long)]
        charset: Option<CharacterSet>,

        /// Invert brightness (for light terminals)
        #[arg(long)]
        invert: bool,
    },
    /// Download stored images to disk
    Download {
        /// Maximum images to download
        #[arg(long, short)]
        max_images: Option<usize>,

        /// Output directory
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List available serial ports
    ListPorts,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Fold command-line overrides into the file configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.serial.port = Some(port.clone());
        }
        if let Some(baud) = self.baud_rate {
            config.serial.baud_rate = baud;
        }
        if let Some(profile) = self.profile {
            config.device.profile = profile.key().to_string();
        }
        match &self.command {
            Command::Stream {
                exposure,
                scale,
                charset,
                invert,
            } => {
                if let Some(exposure) = exposure {
                    config.stream.exposure = *exposure as usize;
                }
                if let Some(scale) = scale {
                    config.stream.scale = *scale;
                }
                if let Some(charset) = charset {
                    config.stream.charset = crate::display::CharSet::from(*charset).name().to_string();
                }
                if *invert {
                    config.stream.invert = true;
                }
            }
            Command::Download { max_images, output } => {
                if let Some(max_images) = max_images {
                    config.device.max_images = Some(*max_images);
                }
                if let Some(output) = output {
                    config.batch.output_dir = output.clone();
                }
            }
            Command::ListPorts | Command::Config { .. } => {}
        }
    }
}
