// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! murmur-connectors: the connector contract (C8) and a hub that routes
//! outbound sends by protocol and fans inbound messages out to whatever
//! dispatch the daemon installs. Ships a terminal connector for local use
//! and a test double behind `test-support`.

pub mod connector;
pub mod hub;
pub mod terminal;

#[cfg(any(test, feature = "test-support"))]
pub mod test_connector;

pub use connector::{Connector, Handler, IncomingMessage, SendError};
pub use hub::{ConnectorHub, InboundDispatch};
pub use terminal::TerminalConnector;

#[cfg(any(test, feature = "test-support"))]
pub use test_connector::TestConnector;
