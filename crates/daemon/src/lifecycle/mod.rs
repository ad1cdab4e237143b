// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, the startup lock, and
//! directory bootstrap.

use std::fs::File;
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;

/// Daemon configuration. Fixed paths under `~/.local/state/murmur/` (or
/// `$XDG_STATE_HOME/murmur/`) — one daemon serves every connector for a
/// user.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory.
    pub state_dir: PathBuf,
    /// Path to the lock/PID file.
    pub lock_path: PathBuf,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
    /// Path to the encrypted parameter store file.
    pub brain_path: PathBuf,
    /// Host:port the HTTP callback listener binds.
    pub callback_addr: String,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let callback_addr = std::env::var("MURMUR_CALLBACK_ADDR").unwrap_or_else(|_| "127.0.0.1:7117".to_string());

        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            brain_path: state_dir.join("brain.json"),
            callback_addr,
            state_dir,
        })
    }

    /// The `HTTP_POST` callback URL injected into every task's environment.
    pub fn http_post_base_url(&self) -> String {
        format!("http://{}/callback", self.callback_addr)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Holds the exclusive lock on [`Config::lock_path`] for the process
/// lifetime; released automatically on drop.
pub struct StartupLock {
    #[allow(dead_code)]
    lock_file: File,
}

/// Acquire the startup lock, creating the state directory if needed and
/// writing the current PID into the lock file.
pub fn acquire_lock(config: &Config) -> Result<StartupLock, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    Ok(StartupLock { lock_file })
}

/// Remove the lock/PID file. The file descriptor's exclusive lock is
/// released when [`StartupLock`] drops regardless of whether this runs.
pub fn release_lock(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MURMUR_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join("murmur"))
        .ok_or(LifecycleError::NoStateDir)
}

#[cfg(test)]
#[path = "../lifecycle_tests.rs"]
mod tests;
