#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]
mod backend;
mod config;
mod graphics;
mod overlays;
mod windowing;

use std::process::ExitCode;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{config::GeneralConfig, graphics::Color};

/// Highlights the focused X11 window, and every other open window, with translucent overlays
#[derive(Default, Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Overlay color of the focused window (#RRGGBB, #RRGGBBAA or r,g,b,a)
    #[arg(long, value_name = "COLOR")]
    active_color: Option<Color>,

    /// Overlay color of all other windows
    #[arg(long, value_name = "COLOR")]
    inactive_color: Option<Color>,

    /// Only highlight the focused window
    #[arg(long)]
    active_only: bool,

    /// Path to write logs to
    #[arg(short, long, value_name = "FILE_PATH")]
    log_to: Option<String>,
}

fn main() -> ExitCode {
    let mut args = Args::parse();

    logging_init(&mut args);

    log::info!(
        "Welcome to {} version {}!",
        env!("CARGO_PKG_NAME"),
        env!("FOCUS_OVERLAY_BUILD"),
    );
    log::info!("It is {}.", chrono::Local::now().format("%c"));

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: invalid configuration: {e:#}", env!("CARGO_PKG_NAME"));
            return ExitCode::FAILURE;
        }
    };

    match auto_run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:?}");
            eprintln!("{}: {e:#}", env!("CARGO_PKG_NAME"));
            ExitCode::FAILURE
        }
    }
}

/// Defaults, then `FOCUS_OVERLAY_*` environment variables, then command-line flags.
fn load_config(args: &Args) -> anyhow::Result<GeneralConfig> {
    let mut config = GeneralConfig::load()?;

    if let Some(color) = args.active_color {
        config.active_color = color;
    }
    if let Some(color) = args.inactive_color {
        config.inactive_color = color;
    }
    if args.active_only {
        config.track_inactive = false;
    }
    Ok(config)
}

#[cfg(feature = "x11")]
fn auto_run(config: &GeneralConfig) -> anyhow::Result<()> {
    use std::sync::mpsc;

    use anyhow::Context;

    use crate::{
        backend::{x11::XcbBackend, Notification},
        windowing::manager::OverlayManager,
    };

    let backend = XcbBackend::connect().context("Could not connect to the X server")?;

    let (sender, receiver) = mpsc::channel();
    backend
        .spawn_event_pump(sender.clone())
        .context("Could not start the X11 event thread")?;

    if let Err(e) = ctrlc::set_handler(move || {
        let _ = sender.send(Notification::Shutdown);
    }) {
        log::warn!("Could not install termination handler: {e:?}");
    }

    let mut manager = OverlayManager::new(backend, config);
    manager.run(&receiver)?;

    Ok(())
}

#[cfg(not(feature = "x11"))]
fn auto_run(_config: &GeneralConfig) -> anyhow::Result<()> {
    compile_error!("No desktop support! Enable the x11 feature!");
}

fn logging_init(args: &mut Args) {
    let log_file_path = args
        .log_to
        .take()
        .or_else(|| std::env::var("FOCUS_OVERLAY_LOGFILE").ok());

    let file_writer = log_file_path.and_then(|path| {
        match std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
        {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Failed to open log file (path: {path}): {e:?}");
                None
            }
        }
    });

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            /* read RUST_LOG env var */
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        );

    if let Some(writer) = file_writer {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry.init();
    }

    log_panics::init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "focus-overlay",
            "--active-color",
            "#0000ff",
            "--active-only",
        ]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.active_color, Color::new(0.0, 0.0, 1.0, 1.0).unwrap());
        assert!(!config.track_inactive);
    }

    #[test]
    fn rejects_bad_color_flag() {
        let result = Args::try_parse_from(["focus-overlay", "--inactive-color", "1,1,1,7"]);
        assert!(result.is_err());
    }
}
