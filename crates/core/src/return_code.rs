// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task return codes. Values are wire-stable: they cross the process
//! boundary to external task handlers over the HTTP callback channel and
//! must never be renumbered.

/// Outcome of invoking a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ReturnCode {
    Normal = 0,
    Fail = 1,
    MechanismFail = 2,
    ConfigurationError = 3,
    PipelineAborted = 4,
    RobotStopping = 5,
    NotFound = 6,
    SuccessWithWarnings = 7,
}

impl ReturnCode {
    pub fn as_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Normal,
            1 => Self::Fail,
            2 => Self::MechanismFail,
            3 => Self::ConfigurationError,
            4 => Self::PipelineAborted,
            5 => Self::RobotStopping,
            6 => Self::NotFound,
            7 => Self::SuccessWithWarnings,
            _ => return None,
        })
    }

    /// A return code in `Primary` that should transition the pipeline to
    /// the `Fail` phase. `PipelineAborted` and `RobotStopping` skip straight
    /// to `Final` instead (see `Stage` transition rules), so they are not
    /// "failures" in this sense.
    pub fn is_primary_failure(self) -> bool {
        matches!(self, Self::Fail | Self::MechanismFail | Self::ConfigurationError)
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Fail => "fail",
            Self::MechanismFail => "mechanism-fail",
            Self::ConfigurationError => "configuration-error",
            Self::PipelineAborted => "pipeline-aborted",
            Self::RobotStopping => "robot-stopping",
            Self::NotFound => "not-found",
            Self::SuccessWithWarnings => "success-with-warnings",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "return_code_tests.rs"]
mod tests;
