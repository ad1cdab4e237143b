// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The environment variable map injected into every task.

use std::collections::BTreeMap;

/// `CALLER_ID` key every task environment carries so it can call back into
/// the daemon's HTTP listener.
pub const CALLER_ID: &str = "CALLER_ID";
pub const INSTALLDIR: &str = "INSTALLDIR";
pub const CONFIGDIR: &str = "CONFIGDIR";
pub const WORKSPACE: &str = "WORKSPACE";
pub const HTTP_POST: &str = "HTTP_POST";

/// Plain string-to-string environment map. A `BTreeMap` keeps iteration
/// order deterministic, which matters for history-log reproducibility in
/// tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` on top of `self`, `other` winning on key collisions.
    /// Used to layer task-scoped variables over the pipeline's base
    /// environment without mutating the base.
    pub fn layered_with(&self, other: &Environment) -> Environment {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.set(k, v);
        }
        merged
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
