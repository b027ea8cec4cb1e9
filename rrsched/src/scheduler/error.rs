/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the round-robin simulator.
//!
//! Two error enums model the two failure layers:
//!
//! * [`AllocError`]: why a single worker could not admit a task (low-level,
//!   carries exact memory values).  Never escapes the scheduler: it drives the
//!   `WaitingNoMemory` transition instead.
//! * [`SimError`]: top-level failure returned from
//!   [`initialize()`](super::initialize) and
//!   [`SimulationState::step()`](super::SimulationState::step).

use thiserror::Error;

use crate::task::TaskId;

// ── Worker allocation ─────────────────────────────────────────────────────────

/// Reason a worker refused a memory allocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The task needs more memory than the worker currently has free.
    #[error("task requires {required}MB but worker only has {available}MB available")]
    InsufficientMemory { required: u64, available: u64 },
}

// ── Top-level simulation errors ───────────────────────────────────────────────

/// Top-level error type for the simulation API.
///
/// | Variant | Fatal? |
/// |---|---|
/// | `InvalidConfig` | yes, no state is created |
/// | `UnschedulableTask` | yes, the run could never finish |
/// | `AlreadyFinished` | no, state is returned unchanged |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A configuration bound was violated.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// A task needs more memory than any single worker owns, so it could never
    /// be admitted.
    #[error("{task} requires {required}MB but every worker has only {capacity}MB capacity")]
    UnschedulableTask {
        task: TaskId,
        required: u64,
        capacity: u64,
    },

    /// `step()` was called after the simulation reported finished.
    #[error("simulation already finished at tick {tick}")]
    AlreadyFinished { tick: u64 },
}

impl SimError {
    /// Shorthand for building an [`SimError::InvalidConfig`].
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors after which the state may still be used.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::AlreadyFinished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_error_message_carries_values() {
        let e = AllocError::InsufficientMemory {
            required: 60,
            available: 40,
        };
        assert_eq!(
            e.to_string(),
            "task requires 60MB but worker only has 40MB available"
        );
    }

    #[test]
    fn unschedulable_message_names_task() {
        let e = SimError::UnschedulableTask {
            task: TaskId(3),
            required: 120,
            capacity: 100,
        };
        assert!(e.to_string().starts_with("Task 3 requires 120MB"));
    }

    #[test]
    fn only_already_finished_is_recoverable() {
        assert!(SimError::AlreadyFinished { tick: 7 }.is_recoverable());
        assert!(!SimError::invalid("num_tasks", "must be at least 1").is_recoverable());
    }
}
