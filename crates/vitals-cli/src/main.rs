use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use plotters::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use vitals_lib::{
    config::{load_config, PlaybackConfig},
    io::text as text_io,
    monitor::{Monitor, SessionId},
    viewport::Frame,
};

#[derive(Parser)]
#[command(
    name = "vitals",
    version,
    about = "vitals: multi-channel cine signal viewer tools"
)]
struct Cli {
    /// Playback configuration (TOML); built-in defaults otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum WaveKind {
    /// ECG-like trace: baseline wander plus beat bumps with jitter
    Ecg,
    /// Plain sine
    Sine,
    /// Two stacked sines
    Composite,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Emit {
    /// One JSON object with the final state of both sessions
    Summary,
    /// One JSON line per delivered frame
    Frames,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic signal as newline-delimited samples
    Simulate {
        #[arg(long, default_value_t = 5000)]
        samples: usize,
        #[arg(long, value_enum, default_value = "ecg")]
        wave: WaveKind,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long, default_value_t = 0.02)]
        noise: f64,
        /// Output path; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load channels into the two graph lanes and run a scripted
    /// playback pass of N ticks
    Play {
        /// Sample file loaded into Graph A (repeatable)
        #[arg(long = "channel-a")]
        channel_a: Vec<PathBuf>,
        /// Sample file loaded into Graph B (repeatable)
        #[arg(long = "channel-b")]
        channel_b: Vec<PathBuf>,
        #[arg(long, default_value_t = 10)]
        ticks: usize,
        /// Raw 0-100 speed slider for Graph A
        #[arg(long)]
        rate_a: Option<u8>,
        /// Raw 0-100 speed slider for Graph B
        #[arg(long)]
        rate_b: Option<u8>,
        /// Couple the lanes before ticking
        #[arg(long)]
        link: bool,
        #[arg(long, value_enum, default_value = "summary")]
        emit: Emit,
    },
    /// Render one frame of a loaded lane to a PNG
    Render {
        /// Sample file loaded as a channel (repeatable)
        #[arg(long = "channel")]
        channel: Vec<PathBuf>,
        /// Play cursor position to render at
        #[arg(long, default_value_t = 1000)]
        cursor: usize,
        /// Zoom presses: positive zooms in, negative zooms out
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        zoom: i32,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => load_config(path)?,
        None => PlaybackConfig::default(),
    };
    match cli.command {
        Commands::Simulate {
            samples,
            wave,
            seed,
            noise,
            out,
        } => cmd_simulate(samples, wave, seed, noise, out.as_deref()),
        Commands::Play {
            channel_a,
            channel_b,
            ticks,
            rate_a,
            rate_b,
            link,
            emit,
        } => cmd_play(config, &channel_a, &channel_b, ticks, rate_a, rate_b, link, emit),
        Commands::Render {
            channel,
            cursor,
            zoom,
            out,
        } => cmd_render(config, &channel, cursor, zoom, &out),
    }
}

fn cmd_simulate(
    samples: usize,
    wave: WaveKind,
    seed: u64,
    noise: f64,
    out: Option<&Path>,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let fs = 250.0;
    let mut data = Vec::with_capacity(samples);
    let beats = match wave {
        WaveKind::Ecg => beat_times(samples, fs, &mut rng),
        _ => Vec::new(),
    };
    for i in 0..samples {
        let t = i as f64 / fs;
        let clean = match wave {
            WaveKind::Sine => (2.0 * PI * 1.0 * t).sin(),
            WaveKind::Composite => {
                0.7 * (2.0 * PI * 0.8 * t).sin() + 0.3 * (2.0 * PI * 4.0 * t).sin()
            }
            WaveKind::Ecg => {
                let mut v = 0.05 * (2.0 * PI * 0.3 * t).sin();
                for &bt in &beats {
                    let width = 0.02;
                    v += 1.2 * (-0.5 * ((t - bt) / width).powi(2)).exp();
                }
                v
            }
        };
        data.push(clean + noise * (rng.gen::<f64>() - 0.5));
    }

    let mut text = data
        .iter()
        .map(|v| format!("{:.6}", v))
        .collect::<Vec<_>>()
        .join("\n");
    text.push('\n');
    match out {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}

/// Beat onsets with per-interval jitter, roughly 75 bpm.
fn beat_times(samples: usize, fs: f64, rng: &mut StdRng) -> Vec<f64> {
    let duration = samples as f64 / fs;
    let mut beats = Vec::new();
    let mut t = 0.4;
    while t < duration {
        beats.push(t);
        t += 0.8 + 0.08 * (rng.gen::<f64>() - 0.5);
    }
    beats
}

#[derive(Serialize)]
struct FrameLine<'a> {
    session: &'static str,
    #[serde(flatten)]
    frame: &'a Frame,
}

#[derive(Serialize)]
struct PlaySummary {
    linked: bool,
    sessions: Vec<SessionSummary>,
}

#[derive(Serialize)]
struct SessionSummary {
    id: &'static str,
    cursor: usize,
    rate: f64,
    playing: bool,
    zoom_factor: f64,
    channels: Vec<ChannelSummary>,
}

#[derive(Serialize)]
struct ChannelSummary {
    id: u64,
    name: String,
    color: u32,
    hidden: bool,
    samples: usize,
}

#[allow(clippy::too_many_arguments)]
fn cmd_play(
    config: PlaybackConfig,
    channel_a: &[PathBuf],
    channel_b: &[PathBuf],
    ticks: usize,
    rate_a: Option<u8>,
    rate_b: Option<u8>,
    link: bool,
    emit: Emit,
) -> Result<()> {
    let mut monitor = Monitor::new(config);
    load_lane(&mut monitor, SessionId::A, channel_a)?;
    load_lane(&mut monitor, SessionId::B, channel_b)?;
    if let Some(raw) = rate_a {
        monitor.set_rate_slider(SessionId::A, raw);
    }
    if let Some(raw) = rate_b {
        monitor.set_rate_slider(SessionId::B, raw);
    }
    if link {
        monitor.set_linked(true);
    }

    for _ in 0..ticks {
        if monitor.linked() {
            for (session, frame) in monitor.tick_linked() {
                emit_frame(emit, session, &frame)?;
            }
        } else {
            for session in SessionId::ALL {
                if let Some(frame) = monitor.tick_session(session) {
                    emit_frame(emit, session, &frame)?;
                }
            }
        }
    }

    if let Emit::Summary = emit {
        let summary = PlaySummary {
            linked: monitor.linked(),
            sessions: SessionId::ALL
                .iter()
                .map(|&id| summarize(&monitor, id))
                .collect(),
        };
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}

fn emit_frame(emit: Emit, session: SessionId, frame: &Frame) -> Result<()> {
    if let Emit::Frames = emit {
        let line = FrameLine {
            session: session.label(),
            frame,
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

fn summarize(monitor: &Monitor, id: SessionId) -> SessionSummary {
    let session = monitor.session(id);
    SessionSummary {
        id: id.label(),
        cursor: session.cursor(),
        rate: session.rate(),
        playing: session.is_playing(),
        zoom_factor: session.zoom_factor(),
        channels: session
            .channels()
            .iter()
            .map(|c| ChannelSummary {
                id: c.id.0,
                name: c.name.clone(),
                color: c.color.0,
                hidden: c.hidden,
                samples: c.len(),
            })
            .collect(),
    }
}

fn load_lane(monitor: &mut Monitor, session: SessionId, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let buffer = text_io::read_f64_series(path)?;
        let name = format!("Channel {}", monitor.session(session).channels().len() + 1);
        let id = monitor
            .load_channel(session, buffer, name)
            .with_context(|| format!("failed to load {}", path.display()))?;
        debug!("{}: {} -> channel {}", session.label(), path.display(), id);
    }
    Ok(())
}

fn cmd_render(
    config: PlaybackConfig,
    channels: &[PathBuf],
    cursor: usize,
    zoom: i32,
    out: &Path,
) -> Result<()> {
    if channels.is_empty() {
        anyhow::bail!("render needs at least one --channel");
    }
    let mut monitor = Monitor::new(config);
    load_lane(&mut monitor, SessionId::A, channels)?;
    for _ in 0..zoom.max(0) {
        monitor.zoom_in(SessionId::A);
    }
    for _ in 0..(-zoom).max(0) {
        monitor.zoom_out(SessionId::A);
    }
    for _ in 0..cursor {
        monitor.tick_session(SessionId::A);
    }
    let frame = monitor.frame(SessionId::A);
    draw_frame_png(out, &frame)?;
    Ok(())
}

fn draw_frame_png(path: &Path, frame: &Frame) -> Result<()> {
    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&BLACK)?;
    let x = frame.x_range;
    let y = frame.y_range;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(x.start..x.end, y.start..y.end)?;
    for slice in &frame.slices {
        let (r, g, b) = slice.color.rgb();
        let color = RGBColor(r, g, b);
        chart.draw_series(LineSeries::new(
            slice
                .samples
                .iter()
                .enumerate()
                .map(|(i, &v)| ((slice.start + i) as f64, v)),
            &color,
        ))?;
    }
    root.present()?;
    Ok(())
}
