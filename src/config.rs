#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    net::IpAddr,
    path::{Path, PathBuf},
};

use crate::process::DEFAULT_MAX_OUTPUT_BYTES;
use crate::telemetry::LogFormat;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const EXTRACTOR_NAME: &str = "yt-dlp";

/// Fully resolved settings for the server and the fetch helper.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub host: IpAddr,
    pub port: u16,
    pub extractor: PathBuf,
    pub max_output_bytes: usize,
    pub log_format: LogFormat,
    pub allow_root: bool,
}

/// Values supplied on the command line. They win over the environment and
/// the `.env` file.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub extractor: Option<PathBuf>,
    pub max_output_bytes: Option<usize>,
    pub log_format: Option<LogFormat>,
    pub allow_root: bool,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_settings(overrides: RuntimeOverrides) -> Result<RuntimeSettings> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    build_runtime_settings(&file_vars, env_var_string, &extractor_search_dirs(), overrides)
}

fn build_runtime_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    search_dirs: &[PathBuf],
    overrides: RuntimeOverrides,
) -> Result<RuntimeSettings> {
    let host = overrides
        .host
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| lookup_value("TUBEMETA_HOST", file_vars, &env_lookup))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let host = host
        .parse::<IpAddr>()
        .with_context(|| format!("expected a valid IPv4 or IPv6 listen address, got {host:?}"))?;
    let port = overrides
        .port
        .or_else(|| {
            lookup_value("TUBEMETA_PORT", file_vars, &env_lookup)
                .or_else(|| lookup_value("PORT", file_vars, &env_lookup))
                .and_then(|value| value.parse::<u16>().ok())
        })
        .unwrap_or(DEFAULT_PORT);
    let extractor = overrides
        .extractor
        .or_else(|| lookup_value("YTDLP_PATH", file_vars, &env_lookup).map(PathBuf::from))
        .unwrap_or_else(|| locate_extractor(search_dirs));
    let max_output_bytes = overrides
        .max_output_bytes
        .or_else(|| {
            lookup_value("TUBEMETA_MAX_OUTPUT_BYTES", file_vars, &env_lookup)
                .and_then(|value| value.parse::<usize>().ok())
        })
        .filter(|bytes| *bytes > 0)
        .unwrap_or(DEFAULT_MAX_OUTPUT_BYTES);
    let log_format = overrides
        .log_format
        .or_else(|| {
            lookup_value("TUBEMETA_LOG_FORMAT", file_vars, &env_lookup)
                .and_then(|value| LogFormat::parse(&value))
        })
        .unwrap_or_default();
    let allow_root = overrides.allow_root
        || lookup_value("TUBEMETA_ALLOW_ROOT", file_vars, &env_lookup)
            .is_some_and(|value| parse_flag(&value));

    Ok(RuntimeSettings {
        host,
        port,
        extractor,
        max_output_bytes,
        log_format,
        allow_root,
    })
}

/// Prefers a `yt-dlp` dropped next to the deployment over whatever is on
/// `PATH`; falls back to the bare name so the OS search path resolves it.
pub fn locate_extractor(search_dirs: &[PathBuf]) -> PathBuf {
    search_dirs
        .iter()
        .map(|dir| dir.join(EXTRACTOR_NAME))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(EXTRACTOR_NAME))
}

fn extractor_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }
    dirs
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| {
        file_vars
            .get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Parses a dotenv-style file. A missing file is not an error.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = unquote(value_raw.trim());
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .or_else(|| {
            value
                .strip_prefix('\'')
                .and_then(|value| value.strip_suffix('\''))
        })
        .unwrap_or(value)
}
