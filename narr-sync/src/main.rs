//! narr-sync - Narration sync engine tools
//!
//! Offline tools around the engine:
//! - `replay`: run a recorded host trace through a playback session and
//!   print the resolved hit, sentence and sequence position per step
//! - `plan`: print the alternating-track sequence plan of a chunk

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use narr_common::chunk::ChunkMetadata;
use narr_common::events::SequenceTrack;
use narr_common::human_time::format_media_time;
use narr_common::timing::TrackTimingPayload;
use narr_sync::config::SyncConfig;
use narr_sync::replay::{parse_trace, ScriptedMedia, TraceReplay};
use narr_sync::sequence::{build_sequence_plan, EnabledTracks, TrackPreferences};
use narr_sync::sync::clock::raw_time;
use narr_sync::{PlaybackSession, TrackPayloads};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "narr-sync")]
#[command(about = "Narration audio-to-text sync engine tools")]
#[command(version)]
struct Cli {
    /// Config file (overrides NARR_SYNC_CONFIG and the per-user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded host event trace
    Replay {
        /// Chunk metadata JSON
        #[arg(long)]
        chunk: PathBuf,

        /// Timing payload JSON, one per track
        #[arg(long, required = true)]
        timing: Vec<PathBuf>,

        /// Trace JSON (array of steps)
        #[arg(long)]
        trace: PathBuf,

        /// Animation frames emitted after each time update
        #[arg(long, default_value_t = 1)]
        frames_per_update: u8,

        /// Print one JSON object per step instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the sequence plan of a chunk
    Plan {
        /// Chunk metadata JSON
        #[arg(long)]
        chunk: PathBuf,

        /// Include the original track (both when neither flag is given)
        #[arg(long)]
        original: bool,

        /// Include the translation track
        #[arg(long)]
        translation: bool,
    },
}

fn init_tracing(config: &SyncConfig) {
    let level = &config.logging.level;
    let fallback = if level.contains('=') {
        level.clone()
    } else {
        format!("narr_sync={level},narr_common={level}")
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn read_chunk(path: &Path) -> Result<ChunkMetadata> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read chunk {}", path.display()))?;
    ChunkMetadata::from_json(&json)
        .with_context(|| format!("Failed to parse chunk {}", path.display()))
}

async fn read_payload(path: &Path) -> Result<TrackTimingPayload> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read timing payload {}", path.display()))?;
    TrackTimingPayload::from_json(&json)
        .with_context(|| format!("Failed to parse timing payload {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) =
        SyncConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config);

    info!(
        "narr-sync v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match source.path() {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    match cli.command {
        Commands::Replay {
            chunk,
            timing,
            trace,
            frames_per_update,
            json,
        } => replay(&config, &chunk, &timing, &trace, frames_per_update, json).await,
        Commands::Plan {
            chunk,
            original,
            translation,
        } => plan(&chunk, original, translation).await,
    }
}

async fn replay(
    config: &SyncConfig,
    chunk_path: &Path,
    timing_paths: &[PathBuf],
    trace_path: &Path,
    frames_per_update: u8,
    json: bool,
) -> Result<()> {
    let chunk = read_chunk(chunk_path).await?;
    let mut payloads = Vec::with_capacity(timing_paths.len());
    for path in timing_paths {
        payloads.push(read_payload(path).await?);
    }
    let trace_json = tokio::fs::read_to_string(trace_path)
        .await
        .with_context(|| format!("Failed to read trace {}", trace_path.display()))?;
    let steps = parse_trace(&trace_json)
        .with_context(|| format!("Failed to parse trace {}", trace_path.display()))?;

    let mut media = ScriptedMedia::new(config.events.capacity);
    for payload in &payloads {
        if let Some(track) = SequenceTrack::from_track_type(payload.track_type()) {
            let duration = raw_time(payload.duration(), payload.track_offset(), payload.tempo_factor());
            media.set_track_duration(track, duration);
        }
    }

    let mut session = PlaybackSession::new(config);
    session.load_chunk(chunk, TrackPayloads::from_payloads(payloads));

    info!("Replaying {} step(s) from {}", steps.len(), trace_path.display());
    let mut replay = TraceReplay::new(session, media).with_frames_per_update(frames_per_update);
    for (index, step) in steps.iter().enumerate() {
        let line = replay.step(index, step);
        if json {
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!("{}", line);
        }
    }

    if !json {
        println!("diagnostics: {}", replay.session().sync().diagnostics());
    }
    Ok(())
}

async fn plan(chunk_path: &Path, original: bool, translation: bool) -> Result<()> {
    let chunk = read_chunk(chunk_path).await?;
    let preferences = if original || translation {
        TrackPreferences {
            original,
            translation,
        }
    } else {
        TrackPreferences::default()
    };
    let enabled = EnabledTracks::resolve(chunk.availability, preferences);
    let plan = build_sequence_plan(&chunk, enabled);

    println!(
        "chunk {}: {} segment(s), alternating={}",
        plan.chunk_id(),
        plan.len(),
        plan.is_alternating()
    );
    for (index, segment) in plan.segments().iter().enumerate() {
        println!(
            "{:>4} sentence {:<4} {:<11} {} - {}",
            index,
            segment.sentence_index,
            segment.track.to_string(),
            format_media_time(segment.start),
            format_media_time(segment.end)
        );
    }
    Ok(())
}
