// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide table of live pipeline contexts, keyed by id.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use murmur_core::{PipelineContext, PipelineId};
use parking_lot::RwLock;

/// Concurrent map from [`PipelineId`] to its live context.
///
/// Readers (lookups from the HTTP callback listener, mostly) and writers
/// (register/deregister from the pipeline executor) may proceed
/// concurrently; a lookup never blocks behind another lookup.
#[derive(Default)]
pub struct ActiveRegistry {
    contexts: RwLock<HashMap<PipelineId, Arc<PipelineContext>>>,
}

impl ActiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ctx: Arc<PipelineContext>) {
        self.contexts.write().insert(ctx.id, ctx);
    }

    /// Insert `ctx` and, if `parent` names a still-registered context, set
    /// `parent.child = ctx.id`, both under one write-lock acquisition so a
    /// concurrent `remove` of the parent can never land between the two.
    pub fn insert_with_parent_link(&self, ctx: Arc<PipelineContext>, parent: Option<PipelineId>) {
        let mut contexts = self.contexts.write();
        let id = ctx.id;
        contexts.insert(id, ctx);
        if let Some(parent_id) = parent {
            if let Some(parent_ctx) = contexts.get(&parent_id) {
                parent_ctx.with_state_mut(|s| s.child = Some(id));
            }
        }
    }

    pub fn remove(&self, id: PipelineId) -> Option<Arc<PipelineContext>> {
        self.contexts.write().remove(&id)
    }

    pub fn lookup(&self, id: PipelineId) -> Option<Arc<PipelineContext>> {
        self.contexts.read().get(&id).cloned()
    }

    /// Parse a `CALLER_ID` string (as received over the HTTP callback
    /// channel) and look it up. A parse failure is treated the same as an
    /// unknown id: absent.
    pub fn lookup_str(&self, s: &str) -> Option<Arc<PipelineContext>> {
        let id = PipelineId::from_str(s).ok()?;
        self.lookup(id)
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
