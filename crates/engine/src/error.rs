// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine.

use thiserror::Error;

use crate::brain::BrainError;
use crate::params::ParamStoreError;

/// Errors surfaced by the engine's components.
///
/// Task failures themselves are never represented here — they are a
/// `ReturnCode`, handled entirely inside the pipeline state machine. This
/// enum is for the conditions the spec calls mechanism failures: something
/// the engine itself could not do.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("brain error: {0}")]
    Brain(#[from] BrainError),
    #[error("parameter store error: {0}")]
    ParamStore(#[from] ParamStoreError),
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("unknown exclusivity tag state for {0}")]
    ExclusivityInconsistent(String),
    #[error("registry inconsistency: context {0} missing after insert")]
    RegistryInconsistency(String),
}
