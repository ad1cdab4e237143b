// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named mutual-exclusion tags shared across pipelines.

use std::collections::{HashMap, VecDeque};

use murmur_core::PipelineId;
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Outcome of [`ExclusivityManager::claim`].
pub enum Claim {
    /// The tag was free; the caller now holds it.
    Acquired,
    /// The tag was held by another pipeline; the caller has been queued and
    /// must await the returned handle before proceeding.
    Queued(QueuedClaim),
    /// The tag was held and `queue_if_busy` was false.
    Refused,
}

/// A suspended claim attempt. Resolves once this pipeline becomes the
/// holder of the tag it queued on.
pub struct QueuedClaim {
    rx: oneshot::Receiver<()>,
}

impl QueuedClaim {
    pub async fn wait(self) {
        // The sender side is always dropped after sending, or dropped by
        // `release` abandoning a cancelled waiter; either way resolving the
        // await is the right behavior (a closed channel means "proceed,
        // there's nothing left to wait for").
        let _ = self.rx.await;
    }
}

#[derive(Default)]
struct TagState {
    holder: Option<PipelineId>,
    waiters: VecDeque<(PipelineId, oneshot::Sender<()>)>,
}

/// Process-wide table of exclusivity tags.
///
/// The table's mutex is held only for the duration of a single `claim` or
/// `release` call; it is never held across a task's execution.
#[derive(Default)]
pub struct ExclusivityManager {
    tags: Mutex<HashMap<String, TagState>>,
}

impl ExclusivityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, tag: &str, id: PipelineId, queue_if_busy: bool) -> Claim {
        let mut tags = self.tags.lock();
        let state = tags.entry(tag.to_string()).or_default();
        if state.holder.is_none() {
            state.holder = Some(id);
            return Claim::Acquired;
        }
        if !queue_if_busy {
            return Claim::Refused;
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.push_back((id, tx));
        Claim::Queued(QueuedClaim { rx })
    }

    /// Release the tag. If this pipeline is not the recorded holder this is
    /// a no-op (idempotent, matching a pipeline that never claimed a tag).
    pub fn release(&self, tag: &str, id: PipelineId) {
        let mut tags = self.tags.lock();
        let Some(state) = tags.get_mut(tag) else {
            return;
        };
        if state.holder != Some(id) {
            return;
        }
        match state.waiters.pop_front() {
            Some((next_id, tx)) => {
                state.holder = Some(next_id);
                let _ = tx.send(());
            }
            None => {
                state.holder = None;
            }
        }
    }

    #[cfg(test)]
    fn holder(&self, tag: &str) -> Option<PipelineId> {
        self.tags.lock().get(tag).and_then(|s| s.holder)
    }

    #[cfg(test)]
    fn queue_len(&self, tag: &str) -> usize {
        self.tags.lock().get(tag).map(|s| s.waiters.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "exclusivity_tests.rs"]
mod tests;
