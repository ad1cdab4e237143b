// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! murmurd
//!
//! Background process that owns pipeline execution: it loads the task
//! table, opens the parameter store, registers the configured connectors,
//! and exposes the HTTP callback channel task scripts use to talk back to
//! the running pipeline that spawned them.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use async_trait::async_trait;
use murmur_connectors::{Connector, ConnectorHub, IncomingMessage, TerminalConnector};
use murmur_core::{MessageFormat, RepositoryConfig, SystemClock, TaskConfig, TaskSpec};
use murmur_daemon::callback::{CallbackDispatcher, OutboundSender};
use murmur_daemon::lifecycle::{self, Config, LifecycleError};
use murmur_daemon::listener::CallbackListener;
use murmur_engine::brain::FileBrain;
use murmur_engine::{ConfigSnapshot, Engine, ExternalProcessHandler, HandlerResolver, PipelineExecutor, TaskHandler};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("murmurd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("murmurd {}", env!("CARGO_PKG_VERSION"));
                println!("Background process that owns pipeline execution for a chat-driven automation engine");
                println!();
                println!("USAGE:");
                println!("    murmurd");
                println!();
                println!("murmurd is typically started once per user and left running. Task");
                println!("scripts talk back to it over the HTTP callback channel it exposes.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: murmurd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting murmurd");

    let _lock = match lifecycle::acquire_lock(&config) {
        Ok(lock) => lock,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default().trim().to_string();
            eprintln!("murmurd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start murmurd: {e}");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let brain = Arc::new(FileBrain::open(&config.brain_path)?);
    let snapshot = load_config_snapshot(&config);
    let handlers: Arc<dyn HandlerResolver> = Arc::new(InstalledTaskResolver::new(&snapshot));
    let engine = Arc::new(Engine::new(brain, snapshot));

    let hub = Arc::new(ConnectorHub::new());
    let terminal = Arc::new(TerminalConnector::new("local", "operator"));
    hub.register(terminal.clone());

    let outbound: Arc<dyn OutboundSender> = Arc::new(HubOutbound(hub.clone()));
    let dispatcher = Arc::new(CallbackDispatcher::new(engine.clone(), handlers.clone(), outbound));

    hub.set_dispatch(Arc::new(PipelineDispatch {
        engine: engine.clone(),
        handlers,
    }));

    let socket = TcpListener::bind(config.callback_addr.as_str()).await?;
    let local_addr = socket.local_addr()?;
    let listener = CallbackListener::new(socket, dispatcher);
    tokio::spawn(listener.run());

    // The sender is never used; holding it open keeps `stop_rx` pending for
    // the terminal connector's lifetime, since only shutdown (process exit)
    // should end its `run` loop.
    let (_stop_tx, stop_rx) = tokio::sync::mpsc::channel(1);
    let connector_handler: Arc<dyn murmur_connectors::Handler> = hub.clone();
    tokio::spawn(async move { terminal.run(connector_handler, stop_rx).await });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(addr = %local_addr, "callback listener bound");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    info!("shutting down, draining live pipelines");
    engine.shutdown.begin_shutdown();
    engine.shutdown.wait_for_drain().await;
    engine.fence_brain();

    lifecycle::release_lock(&config);
    info!("murmurd stopped");
    drop(log_guard);
    Ok(())
}

/// Wires a connector hub as the destination for [`OutboundSender`] sends.
struct HubOutbound(Arc<ConnectorHub>);

#[async_trait]
impl OutboundSender for HubOutbound {
    async fn send(&self, protocol: &str, channel: &str, text: &str, format: MessageFormat) -> Result<(), String> {
        self.0.send(protocol, channel, text, format).await.map_err(|e| e.to_string())
    }
}

/// Resolves a task name to an external subprocess at
/// `$INSTALLDIR/tasks/<name>`, the convention every context's environment
/// is seeded with (see `murmur_core::environment::INSTALLDIR`). Configured
/// task names gate resolution when the table is non-empty; an empty table
/// (the default — task table loading from a config file is out of scope)
/// resolves any name, leaving "no such executable" to surface as a
/// mechanism failure from the subprocess spawn itself.
struct InstalledTaskResolver {
    install_dir: String,
    known: std::collections::HashSet<String>,
}

impl InstalledTaskResolver {
    fn new(snapshot: &ConfigSnapshot) -> Self {
        Self {
            install_dir: snapshot.install_dir.clone(),
            known: snapshot.tasks.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

impl HandlerResolver for InstalledTaskResolver {
    fn resolve(&self, task_name: &str) -> Option<Arc<dyn TaskHandler>> {
        if !self.known.is_empty() && !self.known.contains(task_name) {
            return None;
        }
        Some(Arc::new(ExternalProcessHandler {
            program: format!("{}/tasks/{}", self.install_dir, task_name),
        }))
    }
}

/// Turns an inbound connector message into a new pipeline: the first
/// whitespace-separated word is taken as the command name, the rest as its
/// arguments, matched against the task table a context was created with.
struct PipelineDispatch {
    engine: Arc<Engine>,
    handlers: Arc<dyn HandlerResolver>,
}

impl murmur_connectors::InboundDispatch for PipelineDispatch {
    fn dispatch(&self, message: IncomingMessage) {
        let engine = self.engine.clone();
        let handlers = self.handlers.clone();
        tokio::spawn(async move {
            let ctx = match engine.create_context(None).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!("failed to create context for inbound message: {e}");
                    return;
                }
            };

            let mut words = message.text.split_whitespace();
            let Some(command) = words.next() else { return };
            let arguments: Vec<String> = words.map(str::to_string).collect();

            ctx.with_state_mut(|s| {
                s.user = message.user.clone();
                s.channel = message.channel.clone();
                s.protocol = message.protocol.clone();
                s.raw_message = message.raw.clone();
                s.message_text = message.text.clone();
                s.direct = message.direct;
                s.is_command = true;
                s.next_tasks.push(TaskSpec::new(command, arguments));
            });

            let executor = PipelineExecutor::new(engine.registry.clone(), engine.exclusivity.clone());
            executor.run(ctx, handlers.as_ref(), &SystemClock, &engine.shutdown).await;
        });
    }
}

fn load_config_snapshot(config: &Config) -> ConfigSnapshot {
    let install_dir = config.state_dir.to_string_lossy().into_owned();
    ConfigSnapshot {
        default_protocol: "terminal".to_string(),
        tasks: Vec::<TaskConfig>::new(),
        repositories: Vec::<RepositoryConfig>::new(),
        install_dir: install_dir.clone(),
        config_dir: install_dir.clone(),
        workspace_dir: install_dir,
        http_post_base_url: config.http_post_base_url(),
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` -> `daemon.log.1` -> `daemon.log.2` -> `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently ignored
/// so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to the log before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- murmurd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write a startup error synchronously so it is visible even if the
/// process exits before the non-blocking tracing writer flushes.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start murmurd: {error}");
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config.log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
