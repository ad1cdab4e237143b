// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory connector double for exercising the hub and pipeline
//! dispatch without a real chat platform.

use std::sync::Arc;

use async_trait::async_trait;
use murmur_core::MessageFormat;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::connector::{Connector, Handler, SendError};

pub struct TestConnector {
    protocol: String,
    sent: Mutex<Vec<(String, String)>>,
    refuse_channel: Option<String>,
}

impl TestConnector {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            sent: Mutex::new(Vec::new()),
            refuse_channel: None,
        }
    }

    pub fn refusing(protocol: impl Into<String>, refuse_channel: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            sent: Mutex::new(Vec::new()),
            refuse_channel: Some(refuse_channel.into()),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Connector for TestConnector {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    async fn run(&self, _handler: Arc<dyn Handler>, mut stop: mpsc::Receiver<()>) {
        let _ = stop.recv().await;
    }

    async fn send(&self, channel: &str, text: &str, _format: MessageFormat) -> Result<(), SendError> {
        if self.refuse_channel.as_deref() == Some(channel) {
            return Err(SendError::ChannelNotFound(channel.to_string()));
        }
        self.sent.lock().push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "test_connector_tests.rs"]
mod tests;
