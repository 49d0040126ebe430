//! serialcam library crate.
//!
//! Acquisition pipeline for serial-attached pixel cameras: line framing,
//! record decoding, exposure averaging, batch sequencing, and the two
//! controllers that drive them.

pub mod archive;
pub mod batch;
pub mod channel;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod display;
pub mod error;
pub mod exposure;
pub mod port;
pub mod profile;
pub mod sequencer;
pub mod signal;
pub mod stream;
