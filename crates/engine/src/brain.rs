// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value persistence interface the parameter store gateway reads and
//! writes encrypted parameter bundles through.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Minimal persistence contract: get/set an opaque byte value by key.
/// Richer backends (a real database, a remote brain service) are external
/// collaborators that satisfy this same trait.
#[async_trait]
pub trait Brain: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BrainError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), BrainError>;
}

/// File-backed brain: an in-memory mirror guarded by a mutex, flushed as a
/// single JSON blob to disk on every write so the daemon has somewhere to
/// persist parameters without a database dependency.
pub struct FileBrain {
    path: PathBuf,
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl FileBrain {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BrainError> {
        let path = path.into();
        let data = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    fn flush(&self) -> Result<(), BrainError> {
        let snapshot = self.data.lock().clone();
        let bytes = serde_json::to_vec(&snapshot)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

#[async_trait]
impl Brain for FileBrain {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BrainError> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), BrainError> {
        self.data.lock().insert(key.to_string(), value);
        self.flush()
    }
}

/// In-memory only brain, for tests and for running the daemon without
/// persistence.
#[derive(Default)]
pub struct MemoryBrain {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BrainError> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), BrainError> {
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }
}

pub type SharedBrain = Arc<dyn Brain>;

#[cfg(test)]
#[path = "brain_tests.rs"]
mod tests;
