// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shutdown coordinator (C9): refuses new pipelines once draining has
//! begun, and lets the daemon block exit until every live pipeline has
//! deregistered.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
#[error("shutdown in progress, new pipelines are refused")]
pub struct ShuttingDownError;

struct Inner {
    shutting_down: AtomicBool,
    live: AtomicU64,
    drained: Notify,
}

/// Shared handle; clone freely, all clones observe the same state.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

/// RAII handle for one live pipeline. Dropping it (normal return, early
/// return, or panic unwind) decrements the live count and wakes a waiting
/// `wait_for_drain`.
pub struct PipelineGuard {
    inner: Arc<Inner>,
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        let remaining = self.inner.live.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            self.inner.drained.notify_one();
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                shutting_down: AtomicBool::new(false),
                live: AtomicU64::new(0),
                drained: Notify::new(),
            }),
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    /// Flip the shutting-down flag. Idempotent.
    pub fn begin_shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::Release);
    }

    pub fn live_count(&self) -> u64 {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Register a new pipeline as live, or refuse if draining has started.
    pub fn begin_pipeline(&self) -> Result<PipelineGuard, ShuttingDownError> {
        if self.is_shutting_down() {
            return Err(ShuttingDownError);
        }
        self.inner.live.fetch_add(1, Ordering::AcqRel);
        Ok(PipelineGuard {
            inner: self.inner.clone(),
        })
    }

    /// Wait until the live-pipeline count reaches zero. Resolves
    /// immediately if it is already zero.
    pub async fn wait_for_drain(&self) {
        loop {
            // Subscribe before checking the count: a guard dropped between
            // the check and the await must not be missed.
            let notified = self.inner.drained.notified();
            if self.live_count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
