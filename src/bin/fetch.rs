#![forbid(unsafe_code)]

//! One-shot helper that runs a single extraction through the same pipeline as
//! the server and prints the response envelope. Handy for checking a yt-dlp
//! install without standing up the HTTP service.

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tubemeta::{
    command::Operation,
    config::{RuntimeOverrides, resolve_runtime_settings},
    error::{ApiError, SuccessEnvelope},
    extract::run_operation,
    identifier::{ChannelId, PlaylistId, ValidationError, VideoId},
    process::SystemLauncher,
    telemetry::{LogFormat, init_logging},
};

#[derive(Debug, Parser)]
#[command(name = "tubemeta-fetch", version, about = "Run one yt-dlp metadata extraction")]
struct FetchArgs {
    /// Path to the yt-dlp executable (YTDLP_PATH).
    #[arg(long)]
    extractor: Option<PathBuf>,
    #[arg(long)]
    max_output_bytes: Option<usize>,
    #[arg(long)]
    env_file: Option<PathBuf>,
    /// Emit extractor logs on stderr.
    #[arg(long)]
    verbose: bool,
    #[command(subcommand)]
    target: Target,
}

#[derive(Debug, Subcommand)]
enum Target {
    /// Video details with up to 50 comments.
    Video { id: String },
    /// Video details with up to 200 comments.
    Comments { id: String },
    /// Flat playlist listing.
    Playlist { id: String },
    /// Playlists published by a channel.
    ChannelPlaylists { id: String },
    /// Channel metadata without content entries.
    ChannelInfo { id: String },
}

impl Target {
    fn operation(&self) -> Result<Operation, ValidationError> {
        Ok(match self {
            Self::Video { id } => Operation::VideoDetail(VideoId::parse(id)?),
            Self::Comments { id } => Operation::Comments(VideoId::parse(id)?),
            Self::Playlist { id } => Operation::Playlist(PlaylistId::parse(id)?),
            Self::ChannelPlaylists { id } => Operation::ChannelPlaylists(ChannelId::parse(id)?),
            Self::ChannelInfo { id } => Operation::ChannelInfo(ChannelId::parse(id)?),
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = FetchArgs::parse();
    let settings = resolve_runtime_settings(RuntimeOverrides {
        extractor: args.extractor.clone(),
        max_output_bytes: args.max_output_bytes,
        env_path: args.env_file.clone(),
        ..RuntimeOverrides::default()
    })?;
    if args.verbose {
        init_logging(LogFormat::Pretty)?;
    }

    let outcome = match args.target.operation() {
        Ok(operation) => {
            let launcher = SystemLauncher::new(settings.max_output_bytes);
            run_operation(&launcher, &settings.extractor, &operation)
                .await
                .map_err(ApiError::from)
        }
        Err(err) => Err(ApiError::from(err)),
    };

    match outcome {
        Ok(data) => {
            print_json(&SuccessEnvelope::new(data))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_json(&err.body())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing response")?;
    println!("{rendered}");
    Ok(())
}
