// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and repository specifications.

use serde::{Deserialize, Serialize};

/// One entry in a pipeline's task table: configured at daemon startup,
/// snapshotted into a context when a pipeline begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    pub description: String,
}

/// A task queued to run, with the arguments it was invoked with.
///
/// This is what `next_tasks`/`fail_tasks`/`final_tasks` hold; it is distinct
/// from [`TaskConfig`] because the same configured task can be queued
/// multiple times with different arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub arguments: Vec<String>,
    /// Whether this task runs in "job" mode: the first such task in a
    /// pipeline fixes `job_name`/`run_index`/`job_channel` on the context.
    pub is_job: bool,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            is_job: false,
        }
    }

    pub fn job(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            is_job: true,
        }
    }
}

/// A configured code repository, snapshotted the same way task config is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
}
