#![forbid(unsafe_code)]

//! HTTP façade over yt-dlp.
//!
//! Requests flow through three stages: [`identifier`] validates the path
//! parameter, [`command`] turns it into a fixed argument vector, and
//! [`extract`] runs the extractor through a [`process::Launcher`] and
//! normalizes whatever it printed into one JSON envelope.

pub mod api;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod identifier;
pub mod process;
pub mod security;
pub mod telemetry;
