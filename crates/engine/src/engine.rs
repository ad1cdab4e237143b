// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Engine`: bundles the singletons (registry, exclusivity table,
//! encryption key, config snapshot, shutdown coordinator) into one value
//! that every component is threaded through, instead of free-floating
//! globals. Tests construct a fresh `Engine` per case.

use std::sync::Arc;

use murmur_core::{PipelineContext, PipelineId};
use parking_lot::RwLock;

use crate::brain::SharedBrain;
use crate::config::ConfigSnapshot;
use crate::context_factory::ContextFactory;
use crate::error::EngineError;
use crate::exclusivity::ExclusivityManager;
use crate::params::EncryptionKey;
use crate::registry::ActiveRegistry;
use crate::shutdown::ShutdownCoordinator;

pub struct Engine {
    pub registry: Arc<ActiveRegistry>,
    pub exclusivity: Arc<ExclusivityManager>,
    pub shutdown: ShutdownCoordinator,
    pub context_factory: ContextFactory,
    encryption_key: Arc<RwLock<Option<EncryptionKey>>>,
    config: Arc<RwLock<ConfigSnapshot>>,
}

impl Engine {
    pub fn new(brain: SharedBrain, config: ConfigSnapshot) -> Self {
        let registry = Arc::new(ActiveRegistry::new());
        let encryption_key = Arc::new(RwLock::new(None));
        let config = Arc::new(RwLock::new(config));
        let context_factory = ContextFactory::new(registry.clone(), brain, encryption_key.clone(), config.clone());
        Self {
            registry,
            exclusivity: Arc::new(ExclusivityManager::new()),
            shutdown: ShutdownCoordinator::new(),
            context_factory,
            encryption_key,
            config,
        }
    }

    /// Initialize the process-wide encryption key. Contexts created before
    /// this call keep an empty `StoredEnv` forever (frozen at registration
    /// time); only contexts created after this call see decrypted
    /// parameters.
    pub fn initialize_encryption_key(&self, key: EncryptionKey) {
        *self.encryption_key.write() = Some(key);
    }

    pub fn has_encryption_key(&self) -> bool {
        self.encryption_key.read().is_some()
    }

    pub fn reload_config(&self, config: ConfigSnapshot) {
        *self.config.write() = config;
    }

    pub async fn create_context(&self, parent: Option<PipelineId>) -> Result<Arc<PipelineContext>, EngineError> {
        self.context_factory.create(parent).await
    }

    /// Take and release the encryption-key write lock: a quiescence fence
    /// on the parameter store gateway's only in-process synchronization
    /// point. Called once after every live pipeline has drained, before
    /// process exit, so no `create_context` started just before shutdown
    /// can still be mid-read when the Brain is closed.
    pub fn fence_brain(&self) {
        let _fence = self.encryption_key.write();
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
