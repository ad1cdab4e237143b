// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connector contract (C8): chat-platform adapters plug in here.

use async_trait::async_trait;
use murmur_core::MessageFormat;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("send failed: {0}")]
    Failed(String),
}

/// An inbound message as delivered by a connector to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub protocol: String,
    pub user: String,
    pub channel: String,
    pub direct: bool,
    pub text: String,
    pub raw: String,
}

/// The handler facade a connector uses to log and deliver inbound
/// messages. The hub is the only production implementation; tests can
/// supply a channel-backed fake.
#[async_trait]
pub trait Handler: Send + Sync {
    fn log(&self, level: tracing::Level, message: &str);
    async fn incoming(&self, message: IncomingMessage);
}

/// A chat-platform adapter. Implementations run their own connection loop
/// in `run` until `stop` resolves, and accept outbound sends independently.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    fn protocol(&self) -> &str;

    /// Drive the connector's inbound loop until `stop` resolves.
    async fn run(&self, handler: std::sync::Arc<dyn Handler>, stop: mpsc::Receiver<()>);

    async fn send(&self, channel: &str, text: &str, format: MessageFormat) -> Result<(), SendError>;

    /// Most connectors have nothing to do here; the default is a no-op.
    async fn subscribe(&self, _channel: &str) -> Result<(), SendError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "connector_tests.rs"]
mod tests;
