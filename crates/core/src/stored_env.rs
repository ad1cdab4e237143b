// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decrypted task/repository parameter bundles, attached to a context once
//! the process-wide encryption key is initialized.

use std::collections::BTreeMap;

use crate::environment::Environment;

/// `task_params[task_name][var] = value`, `repository_params[repo_name][var] = value`.
///
/// Populated by the parameter store gateway at context-creation time and
/// frozen thereafter: a key initialized mid-pipeline does not retroactively
/// populate an already-running context's `StoredEnv`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredEnv {
    pub task_params: BTreeMap<String, BTreeMap<String, String>>,
    pub repository_params: BTreeMap<String, BTreeMap<String, String>>,
}

impl StoredEnv {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn task_param(&self, task: &str, var: &str) -> Option<&str> {
        self.task_params.get(task)?.get(var).map(String::as_str)
    }

    pub fn repository_param(&self, repo: &str, var: &str) -> Option<&str> {
        self.repository_params.get(repo)?.get(var).map(String::as_str)
    }

    pub fn set_task_param(&mut self, task: impl Into<String>, var: impl Into<String>, value: impl Into<String>) {
        self.task_params.entry(task.into()).or_default().insert(var.into(), value.into());
    }

    pub fn set_repository_param(&mut self, repo: impl Into<String>, var: impl Into<String>, value: impl Into<String>) {
        self.repository_params.entry(repo.into()).or_default().insert(var.into(), value.into());
    }

    /// Build a flat [`Environment`] from `task`'s decrypted parameters, to
    /// be layered over a pipeline's base environment before the task runs.
    pub fn task_environment(&self, task: &str) -> Environment {
        let mut env = Environment::new();
        if let Some(vars) = self.task_params.get(task) {
            for (k, v) in vars {
                env.set(k, v);
            }
        }
        env
    }
}

#[cfg(test)]
#[path = "stored_env_tests.rs"]
mod tests;
