//! Path parameter cleanup and per-category validation.
//!
//! Every identifier is passed through [`sanitize`] first and only then checked
//! against the shape its category requires. The validated newtypes are the
//! only way to build an [`crate::command::Operation`], so raw path input can
//! never reach the command builder.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

static VIDEO_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern compiles"));
static PLAYLIST_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("playlist id pattern compiles"));

/// Rejections produced before any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid YouTube Video ID format.")]
    InvalidVideoId,
    #[error("Invalid YouTube Playlist ID format.")]
    InvalidPlaylistId,
    #[error("Channel ID or name is required.")]
    MissingChannel,
}

/// Strips everything outside `[A-Za-z0-9_-/:?=&]` and backslash-escapes any
/// quote left over. Never fails; an empty result simply won't validate.
pub fn sanitize(input: &str) -> String {
    let filtered: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | ':' | '?' | '=' | '&'))
        .collect();
    filtered.replace('"', "\\\"").replace('\'', "\\'")
}

/// Eleven-character YouTube video id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned = sanitize(raw);
        if VIDEO_ID_PATTERN.is_match(&cleaned) {
            Ok(Self(cleaned))
        } else {
            Err(ValidationError::InvalidVideoId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned = sanitize(raw);
        if PLAYLIST_ID_PATTERN.is_match(&cleaned) {
            Ok(Self(cleaned))
        } else {
            Err(ValidationError::InvalidPlaylistId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Channel ids (`UC...`) and custom names vary too much to pin down, so the
/// only requirement is that something survives sanitizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned = sanitize(raw);
        if cleaned.is_empty() {
            Err(ValidationError::MissingChannel)
        } else {
            Ok(Self(cleaned))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
