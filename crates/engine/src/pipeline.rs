// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline executor (C7): drives the primary/fail/final state machine
//! for one context from start to deregistration.

use std::sync::Arc;

use murmur_core::{Clock, PipelineContext, ReturnCode, Stage, TaskSpec};
use tracing::{info, instrument, warn};

use crate::exclusivity::{Claim, ExclusivityManager};
use crate::registry::ActiveRegistry;
use crate::runner::{TaskHandler, TaskRunner};
use crate::shutdown::ShutdownCoordinator;

/// Resolves a task name to its handler. The daemon wires this to the
/// configured task table; tests wire it to fixed closures.
pub trait HandlerResolver: Send + Sync {
    fn resolve(&self, task_name: &str) -> Option<Arc<dyn TaskHandler>>;
}

impl<F> HandlerResolver for F
where
    F: Fn(&str) -> Option<Arc<dyn TaskHandler>> + Send + Sync,
{
    fn resolve(&self, task_name: &str) -> Option<Arc<dyn TaskHandler>> {
        self(task_name)
    }
}

/// Record of one task having run, for tests and for the history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RanTask {
    pub stage: Stage,
    pub name: String,
    pub return_code: ReturnCode,
}

pub struct PipelineExecutor {
    registry: Arc<ActiveRegistry>,
    exclusivity: Arc<ExclusivityManager>,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<ActiveRegistry>, exclusivity: Arc<ExclusivityManager>) -> Self {
        Self { registry, exclusivity }
    }

    /// Run `ctx` to completion: claim exclusivity if requested, drain
    /// primary/fail/final task lists per the one-way phase rule, then
    /// deregister and release exclusivity on every exit path.
    #[instrument(skip_all, fields(pipeline = %ctx.id))]
    pub async fn run(
        &self,
        ctx: Arc<PipelineContext>,
        handlers: &dyn HandlerResolver,
        clock: &impl Clock,
        shutdown: &ShutdownCoordinator,
    ) -> Vec<RanTask> {
        let guard = match shutdown.begin_pipeline() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(pipeline = %ctx.id, "refused: shutdown in progress");
                self.registry.remove(ctx.id);
                return Vec::new();
            }
        };

        let tag = ctx.with_state(|s| s.exclusive_tag.clone());
        let queue_if_busy = ctx.with_state(|s| s.queue_task);

        if let Some(tag) = &tag {
            match self.exclusivity.claim(tag, ctx.id, queue_if_busy) {
                Claim::Acquired => ctx.with_state_mut(|s| s.exclusive = true),
                Claim::Queued(wait) => {
                    info!(pipeline = %ctx.id, tag, "queued on exclusivity tag");
                    wait.wait().await;
                    ctx.with_state_mut(|s| s.exclusive = true);
                }
                Claim::Refused => {
                    info!(pipeline = %ctx.id, tag, "refused: exclusivity tag held");
                    ctx.with_state_mut(|s| s.abort_pipeline = true);
                    self.registry.remove(ctx.id);
                    drop(guard);
                    return Vec::new();
                }
            }
        }

        let ran = self.drive(&ctx, handlers, clock).await;

        if let Some(tag) = &tag {
            self.exclusivity.release(tag, ctx.id);
        }
        self.registry.remove(ctx.id);
        drop(guard);
        ran
    }

    async fn drive(&self, ctx: &Arc<PipelineContext>, handlers: &dyn HandlerResolver, clock: &impl Clock) -> Vec<RanTask> {
        let mut ran = Vec::new();

        loop {
            if ctx.with_state(|s| s.abort_pipeline) {
                break;
            }
            let Some(spec) = self.pop_next(ctx, Stage::Primary) else {
                break;
            };
            let code = self.run_one(ctx, &spec, handlers, clock, &mut ran, Stage::Primary).await;
            if matches!(code, ReturnCode::PipelineAborted | ReturnCode::RobotStopping) {
                // Abort mid-primary: go straight to final, no fail phase —
                // no task produced a recoverable failure here.
                break;
            }
            if code.is_primary_failure() {
                ctx.set_stage(Stage::Fail);
                break;
            }
        }

        if ctx.stage() == Stage::Fail {
            while let Some(spec) = self.pop_next(ctx, Stage::Fail) {
                self.run_one(ctx, &spec, handlers, clock, &mut ran, Stage::Fail).await;
            }
        }

        ctx.set_stage(Stage::Final);
        while let Some(spec) = self.pop_next(ctx, Stage::Final) {
            self.run_one(ctx, &spec, handlers, clock, &mut ran, Stage::Final).await;
        }

        ran
    }

    fn pop_next(&self, ctx: &Arc<PipelineContext>, stage: Stage) -> Option<TaskSpec> {
        ctx.with_state_mut(|s| {
            let list = match stage {
                Stage::Primary => &mut s.next_tasks,
                Stage::Fail => &mut s.fail_tasks,
                Stage::Final => &mut s.final_tasks,
            };
            if list.is_empty() {
                None
            } else {
                Some(list.remove(0))
            }
        })
    }

    async fn run_one(
        &self,
        ctx: &Arc<PipelineContext>,
        spec: &TaskSpec,
        handlers: &dyn HandlerResolver,
        clock: &impl Clock,
        ran: &mut Vec<RanTask>,
        stage: Stage,
    ) -> ReturnCode {
        if spec.is_job {
            ctx.with_state_mut(|s| {
                if !s.job_initialized {
                    s.job_initialized = true;
                    s.job_name = Some(spec.name.clone());
                    s.job_channel = Some(s.channel.clone());
                    s.run_index += 1;
                }
            });
        }

        if stage == Stage::Primary {
            ctx.with_state_mut(|s| {
                if s.pipe_name.is_none() {
                    s.pipe_name = Some(spec.name.clone());
                    s.pipe_desc = Some(spec.arguments.join(" "));
                }
            });
        }

        let code = match handlers.resolve(&spec.name) {
            Some(handler) => TaskRunner::run(ctx, spec, handler.as_ref(), clock).await,
            None => {
                warn!(task = %spec.name, "unknown task, treating as configuration error");
                ReturnCode::ConfigurationError
            }
        };
        ran.push(RanTask {
            stage,
            name: spec.name.clone(),
            return_code: code,
        });
        code
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
