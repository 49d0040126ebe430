//! On-disk archive for downloaded images.
//!
//! Layout under the archive root:
//! - `exported_images/` - 8-bit PNG at sensor resolution
//! - `scaled_images/` - the same PNG blown up 100x
//! - `source_images/` - raw values as text
//! - `metadata/` - per-image JSON plus one download summary per run

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use image::{GrayImage, ImageFormat};
use serde::Serialize;

use crate::batch::{BatchSummary, PersistSink};
use crate::decoder::DecodedFrame;
use crate::display::upscale_nearest;
use crate::error::ArchiveError;
use crate::profile::DeviceProfile;

/// Scale factor for the enlarged PNG copy.
pub const SCALED_FACTOR: usize = 100;

/// Offset of the first image in the device's EEPROM.
const EEPROM_BASE: usize = 24;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Serialize)]
struct ImageMetadata {
    image_number: usize,
    timestamp: String,
    dimensions: String,
    pixel_count: usize,
    eeprom_address: usize,
    min_value: u16,
    max_value: u16,
    avg_value: f64,
}

#[derive(Debug, Serialize)]
struct DownloadSummary<'a> {
    download_timestamp: String,
    finished_timestamp: String,
    camera_version: String,
    images_downloaded: usize,
    total_images_found: usize,
    ended_by: &'a crate::sequencer::EndReason,
    download_summary: String,
}

/// Writes each image in several formats.
#[derive(Debug)]
pub struct FileArchive {
    root: PathBuf,
    profile: DeviceProfile,
}

impl FileArchive {
    /// Create the directory tree under `root`.
    pub fn create(root: impl Into<PathBuf>, profile: DeviceProfile) -> Result<Self, ArchiveError> {
        let archive = Self {
            root: root.into(),
            profile,
        };
        for dir in [
            archive.exported_dir(),
            archive.scaled_dir(),
            archive.source_dir(),
            archive.metadata_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(archive)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exported_dir(&self) -> PathBuf {
        self.root.join("exported_images")
    }

    pub fn scaled_dir(&self) -> PathBuf {
        self.root.join("scaled_images")
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join("source_images")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    /// Byte address the device stored image `index` at.
    pub fn eeprom_address(&self, index: usize) -> usize {
        let shape = &self.profile.shape;
        index * shape.pixel_count() * shape.bytes_per_pixel() + EEPROM_BASE
    }

    /// Write every format for one image.
    pub fn save(&self, index: usize, frame: &DecodedFrame) -> Result<(), ArchiveError> {
        let shape = &self.profile.shape;
        if frame.len() != shape.pixel_count() {
            return Err(ArchiveError::SizeMismatch {
                expected: shape.pixel_count(),
                actual: frame.len(),
            });
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let stem = format!("image_{:03}_{}", index, timestamp);
        let (w, h) = (shape.width(), shape.height());

        let display: Vec<u8> = frame.pixels().iter().map(|&p| shape.to_display(p)).collect();
        let scaled = upscale_nearest(&display, w, h, SCALED_FACTOR);

        save_gray_png(&display, w, h, &self.exported_dir().join(format!("{}.png", stem)))?;
        save_gray_png(
            &scaled,
            w * SCALED_FACTOR,
            h * SCALED_FACTOR,
            &self.scaled_dir().join(format!("{}_100x.png", stem)),
        )?;
        self.write_raw(index, &timestamp, frame, &self.source_dir().join(format!("{}.raw", stem)))?;

        let metadata = ImageMetadata {
            image_number: index,
            timestamp,
            dimensions: format!("{}x{}", w, h),
            pixel_count: frame.len(),
            eeprom_address: self.eeprom_address(index),
            min_value: frame.min(),
            max_value: frame.max(),
            avg_value: frame.mean(),
        };
        let file = fs::File::create(self.metadata_dir().join(format!("{}_metadata.json", stem)))?;
        write_json(file, &metadata)?;

        log::info!("Saved: {}.png", stem);
        Ok(())
    }

    /// Write the per-run summary JSON; returns its path.
    pub fn write_summary(&self, summary: &BatchSummary) -> Result<PathBuf, ArchiveError> {
        let record = DownloadSummary {
            download_timestamp: summary.started_at.to_rfc3339(),
            finished_timestamp: summary.finished_at.to_rfc3339(),
            camera_version: format!("{}_V2", self.profile.name),
            images_downloaded: summary.images_persisted,
            total_images_found: summary.images_found,
            ended_by: &summary.ended_by,
            download_summary: format!(
                "Downloaded {} images from {} Camera V2",
                summary.images_persisted, self.profile.name
            ),
        };
        let path = self.metadata_dir().join(format!(
            "download_summary_{}.json",
            summary.started_at.format(TIMESTAMP_FORMAT)
        ));
        let file = fs::File::create(&path)?;
        write_json(file, &record)?;
        Ok(path)
    }

    fn write_raw(
        &self,
        index: usize,
        timestamp: &str,
        frame: &DecodedFrame,
        path: &Path,
    ) -> Result<(), ArchiveError> {
        let shape = &self.profile.shape;
        let (bits, cell) = if shape.bytes_per_pixel() == 2 { (16, 5) } else { (8, 3) };

        let mut out = BufWriter::new(fs::File::create(path)?);
        writeln!(out, "# {} Camera V2 Raw Data - Image {}", self.profile.name, index)?;
        writeln!(out, "# Timestamp: {}", timestamp)?;
        writeln!(out, "# Dimensions: {}x{}", shape.width(), shape.height())?;
        writeln!(out, "# EEPROM Address: {}", self.eeprom_address(index))?;
        writeln!(
            out,
            "# Pixel values ({}-bit, 0-{}):",
            bits,
            shape.max_pixel_value()
        )?;
        for row in frame.rows() {
            let cells: Vec<String> = row.iter().map(|p| format!("{:>cell$}", p, cell = cell)).collect();
            writeln!(out, "{}", cells.join(" "))?;
        }
        out.flush()?;
        Ok(())
    }
}

impl PersistSink for FileArchive {
    type Error = ArchiveError;

    fn persist(&mut self, index: usize, frame: DecodedFrame) -> Result<(), Self::Error> {
        self.save(index, &frame)
    }
}

/// Pretty-print `value` as JSON; buffered, flushed before returning.
fn write_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<(), ArchiveError> {
    let mut out = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}

fn save_gray_png(pixels: &[u8], width: usize, height: usize, path: &Path) -> Result<(), ArchiveError> {
    let img = GrayImage::from_raw(width as u32, height as u32, pixels.to_vec()).ok_or(
        ArchiveError::SizeMismatch {
            expected: width * height,
            actual: pixels.len(),
        },
    )?;
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
