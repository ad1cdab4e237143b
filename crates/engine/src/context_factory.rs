// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The context factory (C4): builds a fresh context per inbound message,
//! or a registered sibling for a task-requested sub-pipeline.

use std::sync::Arc;

use murmur_core::environment::{CALLER_ID, CONFIGDIR, HTTP_POST, INSTALLDIR, WORKSPACE};
use murmur_core::{PipelineContext, PipelineId};
use parking_lot::RwLock;
use tracing::instrument;

use crate::brain::SharedBrain;
use crate::config::ConfigSnapshot;
use crate::error::EngineError;
use crate::params::{EncryptionKey, ParameterStoreGateway};
use crate::registry::ActiveRegistry;

/// Process-wide id allocator + registry + config + param-store collaborator
/// used to build and link contexts. See `Engine` for the type that owns one
/// of these alongside the rest of the engine's singletons.
pub struct ContextFactory {
    ids: murmur_core::IdAllocator,
    registry: Arc<ActiveRegistry>,
    brain: SharedBrain,
    encryption_key: Arc<RwLock<Option<EncryptionKey>>>,
    config: Arc<RwLock<ConfigSnapshot>>,
}

impl ContextFactory {
    pub fn new(
        registry: Arc<ActiveRegistry>,
        brain: SharedBrain,
        encryption_key: Arc<RwLock<Option<EncryptionKey>>>,
        config: Arc<RwLock<ConfigSnapshot>>,
    ) -> Self {
        Self {
            ids: murmur_core::IdAllocator::new(),
            registry,
            brain,
            encryption_key,
            config,
        }
    }

    /// Build a fresh, registered context for an inbound message.
    #[instrument(skip(self), fields(parent = ?parent))]
    pub async fn create(&self, parent: Option<PipelineId>) -> Result<Arc<PipelineContext>, EngineError> {
        let snapshot = self.config.read().clone();
        let key = self.encryption_key.read().clone();
        let stored_env = ParameterStoreGateway::fetch(self.brain.as_ref(), key.as_ref()).await?;

        let id = self.ids.next();
        let ctx = PipelineContext::bare(
            id,
            snapshot.default_protocol.clone(),
            snapshot.tasks.clone(),
            snapshot.repositories.clone(),
        );
        ctx.with_state_mut(|s| {
            s.environment.set(CALLER_ID, id.to_string());
            s.environment.set(INSTALLDIR, &snapshot.install_dir);
            s.environment.set(CONFIGDIR, &snapshot.config_dir);
            s.environment.set(WORKSPACE, &snapshot.workspace_dir);
            s.environment.set(HTTP_POST, &snapshot.http_post_base_url);
            s.working_directory = snapshot.workspace_dir.clone();
            s.stored_env = stored_env;
            s.parent = parent;
        });
        let ctx = Arc::new(ctx);
        self.registry.insert_with_parent_link(ctx.clone(), parent);
        Ok(ctx)
    }

    /// Produce a registered sibling context for a task-requested
    /// sub-pipeline: fresh empty environment and task queues, inherited
    /// task/repository catalog, linked to `parent`.
    pub fn clone_and_register(&self, parent: &Arc<PipelineContext>) -> Arc<PipelineContext> {
        let id = self.ids.next();
        let child_state = parent.clone_for_sub_pipeline(id);
        child_state.with_state_mut(|s| s.parent = Some(parent.id));
        let child = Arc::new(child_state);
        self.registry.insert(child.clone());
        parent.with_state_mut(|s| s.child = Some(id));
        child
    }
}

#[cfg(test)]
#[path = "context_factory_tests.rs"]
mod tests;
