#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the arcade racer headlessly and renders its sounds.

mod drive;
mod wav;

use std::path::PathBuf;

use anyhow::{Context, Result};
use arcade_racer_core::SoundCue;
use arcade_racer_synth::{
    music::{self, Song},
    synthesize, SoundBank,
};
use arcade_racer_track::RaceConfig;
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

/// Headless driver and sound tools for the arcade racer.
#[derive(Parser)]
#[command(name = "arcade-racer", about = "Headless arcade racer simulation and sound export")]
struct Cli {
    /// Maximum log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = parse_level)]
    log_level: LevelFilter,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a seeded race with scripted full-throttle input and print a summary
    Drive {
        /// Race configuration TOML; built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of 60 Hz ticks to simulate
        #[arg(long, default_value_t = 3_600)]
        ticks: u64,
        /// Seed of the simulation's random number generator
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Let the autopilot steer
        #[arg(long)]
        test_drive: bool,
        /// Disable the time budget
        #[arg(long)]
        free_ride: bool,
        /// Start the race in the rain
        #[arg(long)]
        rain: bool,
        /// Skip synthesizing sound effects
        #[arg(long)]
        mute: bool,
    },
    /// Render a sound effect preset, or raw synth parameters, to a WAV file
    Sound {
        /// Preset name (beep, engine, hit, bump, checkpoint, win, lose, rain, splash, speed-limit)
        #[arg(required_unless_present = "params")]
        cue: Option<SoundCue>,
        /// Comma separated synth parameters; empty slots keep their defaults
        #[arg(long, allow_hyphen_values = true, conflicts_with = "cue")]
        params: Option<String>,
        /// Output WAV path
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Render a background song to a WAV file
    Song {
        /// Song name (happy-birthday, twinkle, lullaby)
        song: Song,
        /// Tempo in beats per minute
        #[arg(long, default_value_t = music::TEMPO)]
        tempo: f32,
        /// Output WAV path
        #[arg(long, short)]
        out: PathBuf,
    },
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("invalid log level '{value}'"))
}

/// Entry point for the arcade racer command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(cli.log_level)
        .init()
        .context("failed to install logger")?;

    match cli.command {
        Commands::Drive {
            config,
            ticks,
            seed,
            test_drive,
            free_ride,
            rain,
            mute,
        } => {
            let config = match config {
                Some(path) => RaceConfig::load(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => RaceConfig::default(),
            };
            let options = drive::DriveOptions {
                ticks,
                seed,
                test_drive,
                free_ride,
                rain,
                mute,
            };
            let summary = drive::run(&config, &options);
            print!("{summary}");
        }
        Commands::Sound { cue, params, out } => {
            let params = match (params, cue) {
                (Some(csv), _) => wav::parse_params(&csv)?,
                (None, Some(cue)) => SoundBank::preset(cue),
                (None, None) => anyhow::bail!("either a preset or --params is required"),
            };
            let samples = synthesize(&params);
            wav::write(&out, &samples)?;
            info!("wrote {} samples to {}", samples.len(), out.display());
        }
        Commands::Song { song, tempo, out } => {
            let samples = music::render_song(song, tempo);
            wav::write(&out, &samples)?;
            info!(
                "wrote {} ({:.1}s) to {}",
                song.name(),
                song.duration(tempo),
                out.display()
            );
        }
    }
    Ok(())
}
