// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline id allocation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier for a pipeline context, unique for the life of the process.
///
/// Never zero: zero is reserved to mean "no pipeline" in contexts that
/// reference an id optionally (e.g. a context with no parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PipelineId(u64);

impl PipelineId {
    /// Wrap a raw value. Only used by the allocator and by parsing a
    /// `CALLER_ID` string received over the callback channel.
    pub fn from_raw(v: u64) -> Option<Self> {
        if v == 0 {
            None
        } else {
            Some(Self(v))
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PipelineId {
    type Err = ParsePipelineIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: u64 = s.parse().map_err(|_| ParsePipelineIdError)?;
        Self::from_raw(v).ok_or(ParsePipelineIdError)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid pipeline id")]
pub struct ParsePipelineIdError;

/// Allocates unique, non-zero [`PipelineId`]s for the process lifetime.
///
/// A lock-free counter. If the counter wraps to zero it is bumped to one;
/// collisions with still-live ids at that point are not this allocator's
/// problem to solve (see the Active Registry for the actual uniqueness
/// guarantee among *live* contexts).
#[derive(Clone, Default)]
pub struct IdAllocator {
    counter: Arc<AtomicU64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn next(&self) -> PipelineId {
        loop {
            let prev = self.counter.fetch_add(1, Ordering::Relaxed);
            let v = prev.wrapping_add(1);
            if let Some(id) = PipelineId::from_raw(v) {
                return id;
            }
        }
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
