// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task runner (C6): invokes one task with the context's bound
//! environment, captures output, and surfaces a return code. Does not
//! itself advance the pipeline — that's the executor's job.

use std::sync::Arc;

use async_trait::async_trait;
use murmur_core::{Clock, Environment, HistoryLevel, PipelineContext, ReturnCode, Stage, TaskSpec};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn task: {0}")]
    Spawn(#[from] std::io::Error),
}

/// What a handler returns: the task's outcome plus captured output.
pub struct TaskOutcome {
    pub return_code: ReturnCode,
    pub stdout: String,
    pub stderr: String,
}

/// The executable behind a task name. Either an in-process closure (for
/// built-ins and tests) or an external subprocess.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn invoke(&self, ctx: &Arc<PipelineContext>, args: &[String], env: &Environment, cwd: &str) -> Result<TaskOutcome, RunnerError>;
}

/// Runs a task in-process via `tokio::process::Command`, the default
/// external-task handler.
pub struct ExternalProcessHandler {
    pub program: String,
}

#[async_trait]
impl TaskHandler for ExternalProcessHandler {
    async fn invoke(&self, ctx: &Arc<PipelineContext>, args: &[String], env: &Environment, cwd: &str) -> Result<TaskOutcome, RunnerError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(args).current_dir(cwd).env_clear();
        for (k, v) in env.iter() {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn()?;
        if let Some(pid) = child.id() {
            ctx.with_state_mut(|s| s.os_process = Some(pid));
        }
        let output = child.wait_with_output().await?;
        ctx.with_state_mut(|s| s.os_process = None);

        let return_code = match output.status.code() {
            Some(0) => ReturnCode::Normal,
            Some(n @ 1..=7) => ReturnCode::from_wire(n as u8).unwrap_or(ReturnCode::Fail),
            _ => ReturnCode::Fail,
        };
        Ok(TaskOutcome {
            return_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// An in-process closure handler, used for built-in tasks and tests. Has no
/// subprocess pid to record, so the context is passed through unused.
pub struct ClosureHandler<F>(pub F);

#[async_trait]
impl<F, Fut> TaskHandler for ClosureHandler<F>
where
    F: Fn(Vec<String>, Environment, String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = TaskOutcome> + Send + 'static,
{
    async fn invoke(&self, _ctx: &Arc<PipelineContext>, args: &[String], env: &Environment, cwd: &str) -> Result<TaskOutcome, RunnerError> {
        Ok((self.0)(args.to_vec(), env.clone(), cwd.to_string()).await)
    }
}

pub struct TaskRunner;

impl TaskRunner {
    #[instrument(skip(ctx, handler, clock), fields(task = %spec.name, pipeline = %ctx.id))]
    pub async fn run(
        ctx: &Arc<PipelineContext>,
        spec: &TaskSpec,
        handler: &dyn TaskHandler,
        clock: &impl Clock,
    ) -> ReturnCode {
        ctx.with_state_mut(|s| {
            s.current_task = Some(spec.clone());
            s.task_name = Some(spec.name.clone());
        });

        let (base_env, stored_env, cwd, history_logger, time_zone) = ctx.with_state(|s| {
            (
                s.environment.clone(),
                s.stored_env.clone(),
                s.working_directory.clone(),
                s.history_logger.clone(),
                s.time_zone.clone(),
            )
        });
        let env = base_env.layered_with(&stored_env.task_environment(&spec.name));
        let started_ms = clock.now_ms();

        let outcome = handler.invoke(ctx, &spec.arguments, &env, &cwd).await;
        let (return_code, stdout, stderr) = match outcome {
            Ok(o) => (o.return_code, o.stdout, o.stderr),
            Err(e) => (ReturnCode::MechanismFail, String::new(), e.to_string()),
        };

        for line in stdout.trim_end().lines() {
            history_logger.log(&spec.name, HistoryLevel::Stdout, line, started_ms, &time_zone);
        }
        for line in stderr.trim_end().lines() {
            history_logger.log(&spec.name, HistoryLevel::Stderr, line, started_ms, &time_zone);
        }
        tracing::info!(task = %spec.name, return_code = %return_code, "task complete");

        ctx.with_state_mut(|s| {
            s.current_task = None;
            s.task_name = None;
            s.os_process = None;
            if s.stage == Stage::Primary && return_code.is_primary_failure() {
                s.failed_task_name = Some(spec.name.clone());
                s.failed_task_description = Some(spec.arguments.join(" "));
            }
        });

        return_code
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
