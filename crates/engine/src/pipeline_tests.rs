// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use murmur_core::{Environment, FakeClock, IdAllocator, PipelineContext};
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;

use crate::runner::{RunnerError, TaskOutcome};

struct FixedHandler(ReturnCode);

#[async_trait]
impl TaskHandler for FixedHandler {
    async fn invoke(&self, _ctx: &Arc<PipelineContext>, _args: &[String], _env: &Environment, _cwd: &str) -> Result<TaskOutcome, RunnerError> {
        Ok(TaskOutcome {
            return_code: self.0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn ctx_with_primary(specs: Vec<TaskSpec>) -> Arc<PipelineContext> {
    let id = IdAllocator::new().next();
    let ctx = PipelineContext::bare(id, "terminal", vec![], vec![]);
    ctx.with_state_mut(|s| s.next_tasks = specs);
    Arc::new(ctx)
}

fn executor() -> PipelineExecutor {
    PipelineExecutor::new(Arc::new(ActiveRegistry::new()), Arc::new(ExclusivityManager::new()))
}

fn resolver(map: HashMap<String, ReturnCode>) -> impl HandlerResolver {
    move |name: &str| -> Option<Arc<dyn TaskHandler>> {
        map.get(name).map(|code| Arc::new(FixedHandler(*code)) as Arc<dyn TaskHandler>)
    }
}

#[tokio::test]
async fn single_task_success_never_leaves_primary_and_runs_final_empty() {
    let exec = executor();
    let ctx = ctx_with_primary(vec![TaskSpec::new("echo", vec!["hi".into()])]);
    let mut codes = HashMap::new();
    codes.insert("echo".to_string(), ReturnCode::Normal);
    let handlers = resolver(codes);

    let ran = exec.run(ctx.clone(), &handlers, &FakeClock::new(0), &ShutdownCoordinator::new()).await;

    assert_eq!(ran.len(), 1);
    assert_eq!(ran[0].stage, Stage::Primary);
    assert_eq!(ran[0].return_code, ReturnCode::Normal);
}

#[tokio::test]
async fn failure_triggers_fail_then_final_and_skips_remaining_primary() {
    let exec = executor();
    let ctx = ctx_with_primary(vec![
        TaskSpec::new("a", vec![]),
        TaskSpec::new("b", vec![]),
        TaskSpec::new("c", vec![]),
    ]);
    ctx.with_state_mut(|s| {
        s.fail_tasks.push(TaskSpec::new("f", vec![]));
        s.final_tasks.push(TaskSpec::new("g", vec![]));
    });

    let mut codes = HashMap::new();
    codes.insert("a".to_string(), ReturnCode::Normal);
    codes.insert("b".to_string(), ReturnCode::Fail);
    codes.insert("c".to_string(), ReturnCode::Normal);
    codes.insert("f".to_string(), ReturnCode::Normal);
    codes.insert("g".to_string(), ReturnCode::Normal);
    let handlers = resolver(codes);

    let ran = exec.run(ctx.clone(), &handlers, &FakeClock::new(0), &ShutdownCoordinator::new()).await;

    let names: Vec<&str> = ran.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "f", "g"]);
    ctx.with_state(|s| assert_eq!(s.failed_task_name.as_deref(), Some("b")));
}

#[tokio::test]
async fn final_runs_even_when_abort_pipeline_is_set() {
    let exec = executor();
    let ctx = ctx_with_primary(vec![TaskSpec::new("a", vec![])]);
    ctx.with_state_mut(|s| {
        s.abort_pipeline = true;
        s.final_tasks.push(TaskSpec::new("g", vec![]));
    });
    let mut codes = HashMap::new();
    codes.insert("g".to_string(), ReturnCode::Normal);
    let handlers = resolver(codes);

    let ran = exec.run(ctx.clone(), &handlers, &FakeClock::new(0), &ShutdownCoordinator::new()).await;

    let names: Vec<&str> = ran.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["g"]);
}

#[tokio::test]
async fn final_runs_even_when_fail_tasks_also_fail() {
    let exec = executor();
    let ctx = ctx_with_primary(vec![TaskSpec::new("a", vec![])]);
    ctx.with_state_mut(|s| {
        s.fail_tasks.push(TaskSpec::new("f", vec![]));
        s.final_tasks.push(TaskSpec::new("g", vec![]));
    });
    let mut codes = HashMap::new();
    codes.insert("a".to_string(), ReturnCode::Fail);
    codes.insert("f".to_string(), ReturnCode::Fail);
    codes.insert("g".to_string(), ReturnCode::Normal);
    let handlers = resolver(codes);

    let ran = exec.run(ctx, &handlers, &FakeClock::new(0), &ShutdownCoordinator::new()).await;
    let names: Vec<&str> = ran.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "f", "g"]);
}

#[tokio::test]
async fn exclusivity_refusal_produces_empty_run_with_no_registration() {
    let registry = Arc::new(ActiveRegistry::new());
    let exclusivity = Arc::new(ExclusivityManager::new());
    let exec = PipelineExecutor::new(registry.clone(), exclusivity.clone());

    let holder_id = IdAllocator::new().next();
    assert!(matches!(exclusivity.claim("deploy", holder_id, true), Claim::Acquired));

    let ctx = ctx_with_primary(vec![TaskSpec::new("a", vec![])]);
    ctx.with_state_mut(|s| {
        s.exclusive_tag = Some("deploy".to_string());
        s.queue_task = false;
    });
    let handlers = resolver(HashMap::new());

    let ran = exec.run(ctx.clone(), &handlers, &FakeClock::new(0), &ShutdownCoordinator::new()).await;
    assert!(ran.is_empty());
    assert!(registry.lookup(ctx.id).is_none());
}

#[tokio::test]
async fn exclusivity_queueing_serializes_two_pipelines() {
    let registry = Arc::new(ActiveRegistry::new());
    let exclusivity = Arc::new(ExclusivityManager::new());
    let exec = Arc::new(PipelineExecutor::new(registry, exclusivity));

    let order = Arc::new(StdMutex::new(Vec::new()));

    let order1 = order.clone();
    let ctx1 = ctx_with_primary(vec![TaskSpec::new("work", vec![])]);
    ctx1.with_state_mut(|s| {
        s.exclusive_tag = Some("deploy".to_string());
        s.queue_task = true;
    });

    let order2 = order.clone();
    let ctx2 = ctx_with_primary(vec![TaskSpec::new("work", vec![])]);
    ctx2.with_state_mut(|s| {
        s.exclusive_tag = Some("deploy".to_string());
        s.queue_task = true;
    });

    struct RecordingHandler {
        label: &'static str,
        order: Arc<StdMutex<Vec<&'static str>>>,
    }
    #[async_trait]
    impl TaskHandler for RecordingHandler {
        async fn invoke(&self, _: &Arc<PipelineContext>, _: &[String], _: &Environment, _: &str) -> Result<TaskOutcome, RunnerError> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.order.lock().unwrap().push(self.label);
            Ok(TaskOutcome {
                return_code: ReturnCode::Normal,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    let h1: Arc<dyn TaskHandler> = Arc::new(RecordingHandler { label: "p1", order: order1 });
    let h2: Arc<dyn TaskHandler> = Arc::new(RecordingHandler { label: "p2", order: order2 });
    let handlers1 = move |_: &str| -> Option<Arc<dyn TaskHandler>> { Some(h1.clone()) };
    let handlers2 = move |_: &str| -> Option<Arc<dyn TaskHandler>> { Some(h2.clone()) };

    let e1 = exec.clone();
    let e2 = exec.clone();
    let t1 = tokio::spawn(async move {
        e1.run(ctx1, &handlers1, &FakeClock::new(0), &ShutdownCoordinator::new()).await;
    });
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let t2 = tokio::spawn(async move {
        e2.run(ctx2, &handlers2, &FakeClock::new(0), &ShutdownCoordinator::new()).await;
    });

    t1.await.unwrap();
    t2.await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn shutdown_in_progress_refuses_new_pipeline() {
    let exec = executor();
    let shutdown = ShutdownCoordinator::new();
    shutdown.begin_shutdown();
    let ctx = ctx_with_primary(vec![TaskSpec::new("a", vec![])]);
    let handlers = resolver(HashMap::new());

    let ran = exec.run(ctx, &handlers, &FakeClock::new(0), &shutdown).await;
    assert!(ran.is_empty());
}

#[tokio::test]
async fn unknown_task_aborts_as_configuration_error_but_final_still_runs() {
    let exec = executor();
    let ctx = ctx_with_primary(vec![TaskSpec::new("missing", vec![]), TaskSpec::new("never-runs", vec![])]);
    ctx.with_state_mut(|s| s.final_tasks.push(TaskSpec::new("g", vec![])));
    let mut codes = HashMap::new();
    codes.insert("g".to_string(), ReturnCode::Normal);
    let handlers = resolver(codes);

    let ran = exec.run(ctx, &handlers, &FakeClock::new(0), &ShutdownCoordinator::new()).await;
    assert_eq!(ran[0].return_code, ReturnCode::ConfigurationError);
    let names: Vec<&str> = ran.iter().map(|r| r.name.as_str()).collect();
    assert!(!names.contains(&"never-runs"));
    assert_eq!(ran.last().unwrap().name, "g");
}

#[tokio::test]
async fn first_primary_task_sets_pipe_name_and_desc() {
    let exec = executor();
    let ctx = ctx_with_primary(vec![TaskSpec::new("deploy", vec!["prod".into()])]);
    let mut codes = HashMap::new();
    codes.insert("deploy".to_string(), ReturnCode::Normal);
    let handlers = resolver(codes);

    exec.run(ctx.clone(), &handlers, &FakeClock::new(0), &ShutdownCoordinator::new()).await;
    ctx.with_state(|s| {
        assert_eq!(s.pipe_name.as_deref(), Some("deploy"));
        assert_eq!(s.pipe_desc.as_deref(), Some("prod"));
    });
}
