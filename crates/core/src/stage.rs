// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline phases.

/// Which task list a pipeline is currently draining.
///
/// Transitions are one-way: `Primary -> Fail -> Final` or `Primary -> Final`.
/// Once in `Fail` a further task failure does not re-enter `Fail`; once in
/// `Final`, failures are only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Primary,
    Fail,
    Final,
}

impl Stage {
    /// Whether a task running in this stage is permitted to append to the
    /// given stage's task list.
    pub fn may_append_to(self, target: Stage) -> bool {
        match self {
            Stage::Primary => true,
            Stage::Fail => target == Stage::Final,
            Stage::Final => false,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Primary => "primary",
            Stage::Fail => "fail",
            Stage::Final => "final",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
