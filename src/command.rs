//! Maps each logical operation to the exact yt-dlp argument vector.
//!
//! The extractor is spawned directly, never through a shell, and the
//! identifier only ever shows up inside the target URL, which is always a
//! single trailing argument.

use std::path::{Path, PathBuf};

use crate::identifier::{ChannelId, PlaylistId, VideoId};

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

// Keeps user or system yt-dlp config files from changing the output shape.
const IGNORE_CONFIG: &str = "--ignore-config";
const DUMP_SINGLE_JSON: &str = "--dump-single-json";

const VIDEO_EXTRACTOR_ARGS: &str = "youtube:max_comments=50,all;player_client=web";
const COMMENTS_EXTRACTOR_ARGS: &str = "youtube:max_comments=200,all;player_client=web";

/// Everything the API can ask the extractor for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    VideoDetail(VideoId),
    Comments(VideoId),
    Playlist(PlaylistId),
    ChannelPlaylists(ChannelId),
    ChannelInfo(ChannelId),
}

impl Operation {
    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VideoDetail(_) => "video",
            Self::Comments(_) => "comments",
            Self::Playlist(_) => "playlist",
            Self::ChannelPlaylists(_) => "channel_playlists",
            Self::ChannelInfo(_) => "channel_info",
        }
    }

    pub fn target_url(&self) -> String {
        match self {
            Self::VideoDetail(id) | Self::Comments(id) => {
                format!("{YOUTUBE_BASE_URL}/watch?v={id}")
            }
            Self::Playlist(id) => format!("{YOUTUBE_BASE_URL}/playlist?list={id}"),
            Self::ChannelPlaylists(id) => format!("{YOUTUBE_BASE_URL}/channel/{id}/playlists"),
            Self::ChannelInfo(id) => format!("{YOUTUBE_BASE_URL}/channel/{id}"),
        }
    }

    /// Builds the argument vector. Deterministic for a given operation.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![IGNORE_CONFIG.to_string()];
        match self {
            Self::VideoDetail(_) => push_video_flags(&mut args, VIDEO_EXTRACTOR_ARGS),
            Self::Comments(_) => push_video_flags(&mut args, COMMENTS_EXTRACTOR_ARGS),
            // Flat enumeration: entry stubs only, no per-item fetch.
            Self::Playlist(_) | Self::ChannelPlaylists(_) => {
                args.push("--flat-playlist".to_string());
                args.push(DUMP_SINGLE_JSON.to_string());
            }
            // Zero items keeps the result to channel metadata.
            Self::ChannelInfo(_) => {
                args.push("--playlist-items".to_string());
                args.push("0".to_string());
                args.push(DUMP_SINGLE_JSON.to_string());
            }
        }
        args.push(self.target_url());
        args
    }

    pub fn invocation(&self, program: &Path) -> Invocation {
        Invocation {
            program: program.to_path_buf(),
            args: self.arguments(),
        }
    }
}

fn push_video_flags(args: &mut Vec<String>, extractor_args: &str) {
    args.push("--no-playlist".to_string());
    args.push(DUMP_SINGLE_JSON.to_string());
    args.push("--extractor-args".to_string());
    args.push(extractor_args.to_string());
}

/// A fully-built external process call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// `<program> --version`, used for the startup diagnostic.
    pub fn version_probe(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: vec!["--version".to_string()],
        }
    }

    /// Human-readable command line for logs and error details.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}
