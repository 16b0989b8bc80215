//! Headless front end for the bottle resonance lab.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use bottle_resonance::audio::list_input_devices;
use bottle_resonance::session::{Event, Experiment, RenderCommand};
use bottle_resonance::{MonitorConfig, ResonanceMonitor};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bottle-lab", about = "Bottle resonance measurements: live tone monitor and data views")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List audio input devices
    Devices,

    /// Listen on the default input and print the detected tone
    Monitor {
        /// Stop after this many seconds (default: until stdin closes)
        #[arg(long)]
        seconds: Option<f64>,

        /// How often to poll for new frames, in milliseconds
        #[arg(long, default_value_t = 50)]
        poll_ms: u64,
    },

    /// Read `row column value` lines from stdin and print every data view
    Table,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Devices => run_devices(),
        Command::Monitor { seconds, poll_ms } => run_monitor(seconds, poll_ms),
        Command::Table => run_table(),
    }
}

fn run_devices() -> Result<()> {
    let devices = list_input_devices().context("failed to enumerate input devices")?;
    if devices.is_empty() {
        println!("no input devices found");
    }
    for (index, device) in devices.iter().enumerate() {
        println!(
            "{}: {} ({} Hz, {} ch)",
            index, device.name, device.sample_rate, device.channels
        );
    }
    Ok(())
}

fn run_monitor(seconds: Option<f64>, poll_ms: u64) -> Result<()> {
    let config = MonitorConfig::default();
    config.validate()?;

    let deadline = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => Some(Instant::now() + Duration::from_secs_f64(s)),
        Some(s) => bail!("--seconds must be a positive number, got {}", s),
        None => None,
    };

    let mut monitor = ResonanceMonitor::open_default(&config)
        .context("frequency monitor unavailable")?;
    info!(device = %monitor.device_info().name, "listening");
    monitor.start().context("failed to start capture")?;

    // Without a deadline, closing stdin ends the session
    let shutdown = Arc::new(AtomicBool::new(false));
    if deadline.is_none() {
        let flag = Arc::clone(&shutdown);
        thread::spawn(move || {
            let stdin = io::stdin();
            for _ in stdin.lock().lines() {}
            flag.store(true, Ordering::SeqCst);
        });
    }

    let poll = Duration::from_millis(poll_ms.max(1));
    let mut shown = String::new();

    while !shutdown.load(Ordering::SeqCst) && deadline.map_or(true, |d| Instant::now() < d) {
        if let Some(update) = monitor.latest() {
            if update.label != shown {
                if update.label.is_empty() {
                    println!("(no tone)");
                } else {
                    println!("{}", update.label);
                }
                shown = update.label;
            }
        }
        thread::sleep(poll);
    }

    monitor.stop();
    info!("capture stopped, device released");
    Ok(())
}

fn run_table() -> Result<()> {
    let mut experiment = Experiment::default();

    let stdin = io::stdin();
    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line.context("failed to read stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.splitn(3, char::is_whitespace);
        let (Some(row), Some(column)) = (parts.next(), parts.next()) else {
            warn!(line = line_no + 1, "expected `row column value`");
            continue;
        };
        let (Ok(row), Ok(column)) = (row.parse::<usize>(), column.parse::<usize>()) else {
            warn!(line = line_no + 1, "row and column must be integers");
            continue;
        };
        let value = parts.next().unwrap_or("").to_string();

        for command in experiment.update(Event::CellEdited { row, column, value }) {
            if let RenderCommand::ClearCell { row, column } = command {
                println!("cell ({}, {}) cleared: not a number", row, column);
            }
        }
    }

    let labels = experiment.tab_labels();
    for command in experiment.render_all() {
        match command {
            RenderCommand::PlotSeries(render) => {
                println!(
                    "[{}] x = {}, y = {}",
                    labels[render.view + 1],
                    render.x_label,
                    render.y_label
                );
                for (x, y) in render.series.xs.iter().zip(render.series.ys.iter()) {
                    println!("  {:>12.6}  {:>10.2}", x, y);
                }
                if render.series.dropped > 0 {
                    println!("  ({} rows left out: transform undefined)", render.series.dropped);
                }
                if let Some(equation) = render.equation() {
                    println!("  {}", equation);
                }
            }
            RenderCommand::SkipRender { view, reason } => {
                println!("[{}] skipped: {}", labels[view + 1], reason);
            }
            _ => {}
        }
    }

    Ok(())
}
