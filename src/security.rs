#![forbid(unsafe_code)]

//! Startup guard against running the server with root privileges.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Fails when `process` is started as root, unless `allow_root` is set. The
/// extractor is spawned with our privileges, so a regular service account is
/// the expected setup; containers that only run as root opt in explicitly.
pub fn ensure_not_root(process: &str, allow_root: bool) -> Result<()> {
    ensure_not_root_for(Uid::current(), process, allow_root)
}

fn ensure_not_root_for(uid: Uid, process: &str, allow_root: bool) -> Result<()> {
    if !uid.is_root() {
        return Ok(());
    }
    if allow_root {
        tracing::warn!(process, "running as root because root was explicitly allowed");
        return Ok(());
    }
    bail!(
        "{process} must not be run as root; use a regular user or pass --allow-root / TUBEMETA_ALLOW_ROOT=true"
    );
}
