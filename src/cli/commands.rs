//! Subcommand handlers.

use std::error::Error;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use super::args::ConfigAction;
use crate::archive::FileArchive;
use crate::batch::BatchController;
use crate::config::{resolve_path, Config, DEFAULT_CONFIG};
use crate::display::{AsciiPreview, CharSet, FpsCounter};
use crate::port;
use crate::signal::StopToken;
use crate::stream::{StreamController, StreamExit};

/// List available serial ports and print them to stdout.
pub fn list_ports() {
    match port::list_ports() {
        Ok(ports) => {
            if ports.is_empty() {
                println!("No serial ports found.");
                println!();
                println!("Make sure the camera is plugged in.");
            } else {
                println!("Available ports:");
                let preferred = port::pick_camera_port(&ports).map(|p| p.name.clone());
                for p in &ports {
                    let marker = if preferred.as_deref() == Some(p.name.as_str()) {
                        " (auto)"
                    } else {
                        ""
                    };
                    println!("  {}{}", p, marker);
                }
                println!();
                println!("Use --port <path> to select a port.");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle config subcommand actions.
///
/// `custom_path` is the `--config` override, if any.
pub fn handle_config_action(action: ConfigAction, config: &Config, custom_path: Option<&Path>) {
    let config_path = resolve_path(custom_path);
    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            match toml::to_string_pretty(config) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Error formatting configuration: {}", e),
            }
            match config.profile() {
                Ok(profile) => println!("Resolved profile: {}", profile),
                Err(e) => println!("Resolved profile: invalid ({})", e),
            }

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'serialcam config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            if let Err(e) = std::fs::write(&config_path, DEFAULT_CONFIG) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}

/// Run the live terminal preview until Ctrl+C or the link drops.
pub fn run_stream(config: &Config, stop: &StopToken) -> Result<(), Box<dyn Error>> {
    let profile = config.profile()?;
    let charset = CharSet::from_name(&config.stream.charset).unwrap_or_default();
    let preview = AsciiPreview::new(profile.shape, charset, config.stream.scale)
        .with_invert(config.stream.invert);
    let mut controller = StreamController::new(profile.shape, config.stream_settings())?;

    let channel = port::open_channel(&config.port_settings())?;
    controller.start(channel);

    let exposure_rx = spawn_exposure_reader();
    let refresh = Duration::from_millis(config.stream.refresh_ms.max(1));
    let mut fps = FpsCounter::new();
    let stdout = std::io::stdout();

    while !stop.is_stopped() && controller.is_running() {
        while let Ok(requested) = exposure_rx.try_recv() {
            if let Err(e) = controller.set_exposure(requested) {
                log::warn!("{}", e);
            }
        }

        if let Some(published) = controller.take_frame() {
            let rate = fps.tick();
            let mut out = stdout.lock();
            // Clear screen and home the cursor before each redraw.
            write!(out, "\x1b[2J\x1b[H{}", preview.render(&published.frame))?;
            writeln!(
                out,
                "{} | exposure {} | frame #{} | {:.1} fps",
                profile.name,
                controller.exposure(),
                published.sequence,
                rate
            )?;
            out.flush()?;
        }
        thread::sleep(refresh);
    }

    match controller.stop() {
        Some(report) => match report.exit {
            StreamExit::Stopped => Ok(()),
            StreamExit::ChannelFailed(e) => Err(e.into()),
        },
        None => Ok(()),
    }
}

/// Read exposure counts typed on stdin.
fn spawn_exposure_reader() -> Receiver<usize> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.trim().parse::<usize>() {
                Ok(n) => {
                    if tx.send(n).is_err() {
                        break;
                    }
                }
                Err(_) => log::warn!("Not an exposure count: '{}'", line.trim()),
            }
        }
    });
    rx
}

/// Download stored images into the archive directory.
pub fn run_download(config: &Config, stop: &StopToken) -> Result<(), Box<dyn Error>> {
    let profile = config.profile()?;
    let settings = config.batch_settings(&profile);
    let mut archive = FileArchive::create(&config.batch.output_dir, profile.clone())?;

    let channel = port::open_channel(&config.port_settings())?;
    let summary = BatchController::new(&profile, settings).run(channel, &mut archive, stop);

    let summary_path = archive.write_summary(&summary)?;
    println!(
        "Download {}: {} of {} images saved ({})",
        if summary.succeeded() { "complete" } else { "failed" },
        summary.images_persisted,
        summary.images_found,
        summary.ended_by
    );
    println!("Summary: {}", summary_path.display());

    if summary.succeeded() {
        Ok(())
    } else {
        Err(format!("download ended early: {}", summary.ended_by).into())
    }
}
