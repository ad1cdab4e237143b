// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connector hub: a process-wide named-connector registry that routes
//! outbound sends by protocol and fans inbound messages out to whatever
//! dispatch function the daemon installed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use murmur_core::MessageFormat;
use parking_lot::RwLock;
use tracing::Level;

use crate::connector::{Connector, Handler, IncomingMessage, SendError};

/// What the hub does with an inbound message once a connector delivers it.
/// The daemon installs this to kick off pipeline execution; tests can
/// install a closure that just records what arrived.
pub trait InboundDispatch: Send + Sync {
    fn dispatch(&self, message: IncomingMessage);
}

impl<F: Fn(IncomingMessage) + Send + Sync> InboundDispatch for F {
    fn dispatch(&self, message: IncomingMessage) {
        self(message)
    }
}

struct NoopDispatch;
impl InboundDispatch for NoopDispatch {
    fn dispatch(&self, _message: IncomingMessage) {}
}

pub struct ConnectorHub {
    connectors: RwLock<HashMap<String, Arc<dyn Connector>>>,
    dispatch: RwLock<Arc<dyn InboundDispatch>>,
}

impl Default for ConnectorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorHub {
    pub fn new() -> Self {
        Self {
            connectors: RwLock::new(HashMap::new()),
            dispatch: RwLock::new(Arc::new(NoopDispatch)),
        }
    }

    pub fn set_dispatch(&self, dispatch: Arc<dyn InboundDispatch>) {
        *self.dispatch.write() = dispatch;
    }

    pub fn register(&self, connector: Arc<dyn Connector>) {
        self.connectors.write().insert(connector.protocol().to_string(), connector);
    }

    pub fn protocols(&self) -> Vec<String> {
        self.connectors.read().keys().cloned().collect()
    }

    fn connector_for(&self, protocol: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.read().get(protocol).cloned()
    }

    /// Route an outbound send to the connector registered for `protocol`.
    pub async fn send(&self, protocol: &str, channel: &str, text: &str, format: MessageFormat) -> Result<(), SendError> {
        match self.connector_for(protocol) {
            Some(connector) => connector.send(channel, text, format).await,
            None => Err(SendError::ChannelNotFound(format!("no connector registered for protocol {protocol}"))),
        }
    }
}

#[async_trait]
impl Handler for ConnectorHub {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{message}"),
            Level::WARN => tracing::warn!("{message}"),
            Level::INFO => tracing::info!("{message}"),
            Level::DEBUG => tracing::debug!("{message}"),
            Level::TRACE => tracing::trace!("{message}"),
        }
    }

    async fn incoming(&self, message: IncomingMessage) {
        let dispatch = self.dispatch.read().clone();
        dispatch.dispatch(message);
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
