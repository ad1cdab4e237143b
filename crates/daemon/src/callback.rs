// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decodes and applies the directives task scripts send back over the
//! HTTP callback channel, keyed on `CALLER_ID` (resolved through C2).

use std::sync::Arc;

use async_trait::async_trait;
use murmur_core::{MessageFormat, SystemClock, Stage, TaskSpec};
use murmur_engine::{ActiveRegistry, Engine, HandlerResolver, PipelineExecutor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("unknown caller id: {0}")]
    UnknownCaller(String),
    #[error("malformed directive: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// What a task sends back to append to a task list or change pipeline state.
/// Mirrors the handler-contract methods in the callback HTTP body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "directive", rename_all = "snake_case")]
pub enum CallbackDirective {
    SendMessage { channel: Option<String>, text: String, format: MessageFormat },
    Reply { text: String, format: MessageFormat },
    Log { level: String, message: String },
    AppendTask { stage: DirectiveStage, name: String, arguments: Vec<String> },
    SpawnSubPipeline { exclusive_tag: Option<String> },
    RequestElevation,
    SetWorkingDirectory { path: String },
    SetExclusiveTag { tag: String, queue_if_busy: bool },
    FailPipeline { reason: String },
    /// Fetch a decrypted parameter by name, scoped to `task` (the current
    /// task if unset) or, failing that, `repository`.
    FetchParameter { task: Option<String>, repository: Option<String>, name: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveStage {
    Primary,
    Fail,
    Final,
}

impl From<DirectiveStage> for Stage {
    fn from(value: DirectiveStage) -> Self {
        match value {
            DirectiveStage::Primary => Stage::Primary,
            DirectiveStage::Fail => Stage::Fail,
            DirectiveStage::Final => Stage::Final,
        }
    }
}

/// How the dispatcher delivers an outbound chat message. The daemon wires
/// this to the connector hub; tests can wire it to a recording fake.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    async fn send(&self, protocol: &str, channel: &str, text: &str, format: MessageFormat) -> Result<(), String>;
}

pub struct CallbackDispatcher {
    engine: Arc<Engine>,
    executor: Arc<PipelineExecutor>,
    handlers: Arc<dyn HandlerResolver>,
    outbound: Arc<dyn OutboundSender>,
}

impl CallbackDispatcher {
    pub fn new(
        engine: Arc<Engine>,
        handlers: Arc<dyn HandlerResolver>,
        outbound: Arc<dyn OutboundSender>,
    ) -> Self {
        let executor = Arc::new(PipelineExecutor::new(engine.registry.clone(), engine.exclusivity.clone()));
        Self { engine, executor, handlers, outbound }
    }

    fn registry(&self) -> &ActiveRegistry {
        &self.engine.registry
    }

    pub async fn dispatch(&self, caller_id: &str, directive: CallbackDirective) -> Result<serde_json::Value, CallbackError> {
        let ctx = self
            .registry()
            .lookup_str(caller_id)
            .ok_or_else(|| CallbackError::UnknownCaller(caller_id.to_string()))?;

        match directive {
            CallbackDirective::SendMessage { channel, text, format } => {
                let (protocol, default_channel) = ctx.with_state(|s| (s.protocol.clone(), s.channel.clone()));
                let channel = channel.unwrap_or(default_channel);
                self.outbound.send(&protocol, &channel, &text, format).await.map_err(CallbackError::SendFailed)?;
                Ok(serde_json::json!({"ok": true}))
            }
            CallbackDirective::Reply { text, format } => {
                let (protocol, channel) = ctx.with_state(|s| (s.protocol.clone(), s.channel.clone()));
                self.outbound.send(&protocol, &channel, &text, format).await.map_err(CallbackError::SendFailed)?;
                Ok(serde_json::json!({"ok": true}))
            }
            CallbackDirective::Log { level, message } => {
                match level.as_str() {
                    "error" => tracing::error!(caller_id, "{message}"),
                    "warn" => warn!(caller_id, "{message}"),
                    "debug" => tracing::debug!(caller_id, "{message}"),
                    _ => info!(caller_id, "{message}"),
                }
                Ok(serde_json::json!({"ok": true}))
            }
            CallbackDirective::AppendTask { stage, name, arguments } => {
                let spec = TaskSpec::new(name, arguments);
                let accepted = ctx.with_state_mut(|s| s.append_task(stage.into(), spec));
                Ok(serde_json::json!({"ok": accepted}))
            }
            CallbackDirective::SpawnSubPipeline { exclusive_tag } => {
                let child = self.engine.context_factory.clone_and_register(&ctx);
                if let Some(tag) = exclusive_tag {
                    child.with_state_mut(|s| {
                        s.exclusive_tag = Some(tag);
                        s.queue_task = true;
                    });
                }
                ctx.with_state_mut(|s| s.child = Some(child.id));
                let child_id = child.id;
                let executor = self.executor.clone();
                let handlers = self.handlers.clone();
                let shutdown = self.engine.shutdown.clone();
                tokio::spawn(async move {
                    executor.run(child, handlers.as_ref(), &SystemClock, &shutdown).await;
                });
                Ok(serde_json::json!({"ok": true, "child_id": child_id.to_string()}))
            }
            CallbackDirective::RequestElevation => {
                ctx.with_state_mut(|s| s.elevated = true);
                Ok(serde_json::json!({"ok": true}))
            }
            CallbackDirective::SetWorkingDirectory { path } => {
                ctx.with_state_mut(|s| s.working_directory = path);
                Ok(serde_json::json!({"ok": true}))
            }
            CallbackDirective::SetExclusiveTag { tag, queue_if_busy } => {
                ctx.with_state_mut(|s| {
                    s.exclusive_tag = Some(tag);
                    s.queue_task = queue_if_busy;
                });
                Ok(serde_json::json!({"ok": true}))
            }
            CallbackDirective::FailPipeline { reason } => {
                ctx.with_state_mut(|s| {
                    s.abort_pipeline = true;
                    s.failed_task_name = s.task_name.clone();
                    s.failed_task_description = Some(reason);
                });
                Ok(serde_json::json!({"ok": true}))
            }
            CallbackDirective::FetchParameter { task, repository, name } => {
                let value = ctx.with_state(|s| {
                    let task_name = task.or_else(|| s.task_name.clone());
                    task_name
                        .and_then(|t| s.stored_env.task_param(&t, &name).map(str::to_string))
                        .or_else(|| repository.and_then(|r| s.stored_env.repository_param(&r, &name).map(str::to_string)))
                });
                Ok(serde_json::json!({"ok": value.is_some(), "value": value}))
            }
        }
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
