// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-pipeline execution context.

use parking_lot::Mutex;

use crate::environment::Environment;
use crate::history::HistorySink;
use crate::id::PipelineId;
use crate::stage::Stage;
use crate::stored_env::StoredEnv;
use crate::task::{RepositoryConfig, TaskConfig, TaskSpec};

/// How a connector should render outgoing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    Raw,
    Fixed,
    Variable,
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self::Raw
    }
}

/// The mutable half of a [`PipelineContext`]: everything a running task may
/// read or rewrite. Held behind a single mutex so concurrent access from a
/// task and, say, a concurrently-arriving shutdown check never tears state.
#[derive(Debug, Clone)]
pub struct ContextState {
    pub user: String,
    pub channel: String,
    pub protocol: String,
    pub raw_message: String,
    pub format: MessageFormat,

    pub message_text: String,
    pub is_command: bool,
    pub direct: bool,

    pub tasks: Vec<TaskConfig>,
    pub repositories: Vec<RepositoryConfig>,

    pub environment: Environment,
    pub stored_env: StoredEnv,
    pub working_directory: String,

    pub stage: Stage,
    pub next_tasks: Vec<TaskSpec>,
    pub fail_tasks: Vec<TaskSpec>,
    pub final_tasks: Vec<TaskSpec>,

    pub current_task: Option<TaskSpec>,
    pub task_name: Option<String>,
    pub task_desc: Option<String>,

    /// Name and description of the task that started this pipeline, set
    /// once on the first primary task and carried across clones.
    pub pipe_name: Option<String>,
    pub pipe_desc: Option<String>,

    pub failed_task_name: Option<String>,
    pub failed_task_description: Option<String>,

    pub job_initialized: bool,
    pub job_name: Option<String>,
    pub job_channel: Option<String>,
    pub ns_extension: Option<String>,
    pub run_index: u64,
    pub verbose: bool,

    pub exclusive_tag: Option<String>,
    pub exclusive: bool,
    pub queue_task: bool,
    pub abort_pipeline: bool,

    pub parent: Option<PipelineId>,
    pub child: Option<PipelineId>,

    pub time_zone: String,
    pub automatic_task: bool,
    pub elevated: bool,

    /// pid of the currently-running external task process, if any, so the
    /// shutdown coordinator or an abort action can signal it.
    pub os_process: Option<u32>,

    /// Sink captured task stdout/stderr is forwarded to, timestamped in
    /// `time_zone`.
    pub history_logger: HistorySink,
}

impl ContextState {
    /// The three-way task-table snapshot and an empty pipeline: what both
    /// `ContextFactory::create` and `ContextFactory::clone` start from.
    fn bare(protocol: String, tasks: Vec<TaskConfig>, repositories: Vec<RepositoryConfig>) -> Self {
        Self {
            user: String::new(),
            channel: String::new(),
            protocol,
            raw_message: String::new(),
            format: MessageFormat::default(),
            message_text: String::new(),
            is_command: false,
            direct: false,
            tasks,
            repositories,
            environment: Environment::new(),
            stored_env: StoredEnv::empty(),
            working_directory: String::new(),
            stage: Stage::Primary,
            next_tasks: Vec::new(),
            fail_tasks: Vec::new(),
            final_tasks: Vec::new(),
            current_task: None,
            task_name: None,
            task_desc: None,
            pipe_name: None,
            pipe_desc: None,
            failed_task_name: None,
            failed_task_description: None,
            job_initialized: false,
            job_name: None,
            job_channel: None,
            ns_extension: None,
            run_index: 0,
            verbose: false,
            exclusive_tag: None,
            exclusive: false,
            queue_task: false,
            abort_pipeline: false,
            parent: None,
            child: None,
            time_zone: "UTC".to_string(),
            automatic_task: false,
            elevated: false,
            os_process: None,
            history_logger: HistorySink::default(),
        }
    }

    /// Append a task spec to the task list for `target`, honoring the
    /// one-way phase rule (see [`Stage::may_append_to`]).
    pub fn append_task(&mut self, target: Stage, spec: TaskSpec) -> bool {
        if !self.stage.may_append_to(target) {
            return false;
        }
        match target {
            Stage::Primary => self.next_tasks.push(spec),
            Stage::Fail => self.fail_tasks.push(spec),
            Stage::Final => self.final_tasks.push(spec),
        }
        true
    }
}

/// A single pipeline's execution context: an immutable id plus a mutex
/// around everything that changes while tasks run.
#[derive(Debug)]
pub struct PipelineContext {
    pub id: PipelineId,
    state: Mutex<ContextState>,
}

impl PipelineContext {
    pub(crate) fn new(id: PipelineId, state: ContextState) -> Self {
        Self {
            id,
            state: Mutex::new(state),
        }
    }

    /// Build a fresh, unregistered, empty-pipeline context. Used by the
    /// context factory before it seeds the environment and registers it.
    pub fn bare(id: PipelineId, protocol: impl Into<String>, tasks: Vec<TaskConfig>, repositories: Vec<RepositoryConfig>) -> Self {
        Self::new(id, ContextState::bare(protocol.into(), tasks, repositories))
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&ContextState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn with_state_mut<R>(&self, f: impl FnOnce(&mut ContextState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn snapshot(&self) -> ContextState {
        self.state.lock().clone()
    }

    pub fn stage(&self) -> Stage {
        self.state.lock().stage
    }

    pub fn set_stage(&self, stage: Stage) {
        self.state.lock().stage = stage;
    }

    /// Clone this context's pipeline-identity fields into a fresh,
    /// unregistered sibling: fresh empty environment, no pending tasks.
    /// See the design note on this being the deliberately "safer default".
    pub fn clone_for_sub_pipeline(&self, new_id: PipelineId) -> PipelineContext {
        let src = self.state.lock();
        let mut state = ContextState::bare(src.protocol.clone(), src.tasks.clone(), src.repositories.clone());
        state.user = src.user.clone();
        state.channel = src.channel.clone();
        state.raw_message = src.raw_message.clone();
        state.format = src.format;
        state.message_text = src.message_text.clone();
        state.automatic_task = src.automatic_task;
        state.elevated = src.elevated;
        state.working_directory = src.working_directory.clone();
        state.pipe_name = src.pipe_name.clone();
        state.pipe_desc = src.pipe_desc.clone();
        PipelineContext::new(new_id, state)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
