/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task data structures and the task registry.
//!
//! ```text
//! SimConfig ──(generate)──►  Vec<Task>  ──(initialize)──►  SimulationState
//!   TaskSpec ──(with_tasks)──┘
//! ```
//!
//! # Ownership model
//! Every `Task` lives in the `SimulationState::tasks` vector for the whole
//! run.  The ready queue and running map refer to tasks by [`TaskId`] only, so a
//! task can never be in two places at once: its location is whichever
//! structure currently holds its id.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::scheduler::SimError;
use crate::worker::WorkerId;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Smallest memory demand a generated task may have, in MB.
pub const TASK_MEMORY_MIN: u64 = 10;

/// Largest memory demand a generated task may have, in MB.
pub const TASK_MEMORY_MAX: u64 = 40;

// ── TaskId ────────────────────────────────────────────────────────────────────

/// Stable, 1-based task identifier.  Displays as `Task N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl TaskId {
    /// Position of this task in the registry vector.
    pub(crate) fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    /// # Errors
    /// [`SimError::InvalidConfig`] when `index + 1` does not fit a `u32`.
    pub(crate) fn from_index(index: usize) -> Result<Self, SimError> {
        u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .map(TaskId)
            .ok_or_else(|| {
                SimError::invalid(
                    "num_tasks",
                    format!("exceeds the limit of {} tasks", u32::MAX),
                )
            })
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task {}", self.0)
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// In the ready queue, waiting for a free worker.
    #[default]
    Pending,
    /// Currently holding a worker.
    Running,
    /// Last dispatch attempt failed admission control.
    WaitingNoMemory,
    /// Finished all of its CPU work.
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Running => "Running",
            TaskStatus::WaitingNoMemory => "Waiting (No Memory)",
            TaskStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// One unit of simulated work.
///
/// Timing fields are in ticks.  `arrival_time` is always `0`: the whole
/// population is known when the simulation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    // ── Demand ────────────────────────────────────────────────────────────────
    /// Total CPU ticks required.
    pub initial_time: u64,

    /// CPU ticks still owed.  Reaches exactly `0` on completion.
    pub remaining_time: u64,

    /// Memory reserved on a worker while the task runs or is preempted.
    pub memory_required: u64,

    // ── Timing (filled by the scheduler) ──────────────────────────────────────
    pub arrival_time: u64,

    /// Tick at which the task first executed.
    pub start_time: Option<u64>,

    /// Tick at which the task completed.
    pub finish_time: Option<u64>,

    /// Tick of the most recent dispatch.  Only meaningful while running.
    pub quantum_start_time: Option<u64>,

    // ── Placement ─────────────────────────────────────────────────────────────
    /// Worker currently running this task.
    pub assigned_worker: Option<WorkerId>,

    /// Worker holding this task's memory reservation.  Survives preemption so
    /// the task can resume on its retained working set.
    pub reserved_on: Option<WorkerId>,

    pub status: TaskStatus,
}

impl Task {
    /// Create a pending task that has not run yet.
    pub fn new(id: TaskId, initial_time: u64, memory_required: u64) -> Self {
        Self {
            id,
            initial_time,
            remaining_time: initial_time,
            memory_required,
            arrival_time: 0,
            start_time: None,
            finish_time: None,
            quantum_start_time: None,
            assigned_worker: None,
            reserved_on: None,
            status: TaskStatus::Pending,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// CPU ticks consumed so far.
    pub fn executed(&self) -> u64 {
        self.initial_time - self.remaining_time
    }

    /// `finish_time − arrival_time`, once completed.
    pub fn turnaround_time(&self) -> Option<u64> {
        self.finish_time
            .map(|finish| finish.saturating_sub(self.arrival_time))
    }

    /// `turnaround_time − initial_time`, once completed.
    pub fn waiting_time(&self) -> Option<u64> {
        self.turnaround_time()
            .map(|tat| tat.saturating_sub(self.initial_time))
    }
}

// ── TaskSpec ──────────────────────────────────────────────────────────────────

/// Hand-written task demand, used to build a state with an exact task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub initial_time: u64,
    pub memory_required: u64,
}

impl TaskSpec {
    pub fn new(initial_time: u64, memory_required: u64) -> Self {
        Self {
            initial_time,
            memory_required,
        }
    }
}

/// Turn explicit specs into pending tasks with sequential ids.
///
/// # Errors
/// [`SimError::InvalidConfig`] if the list is empty or any task has zero CPU
/// demand.
pub fn from_specs(specs: &[TaskSpec]) -> Result<Vec<Task>, SimError> {
    if specs.is_empty() {
        return Err(SimError::invalid("tasks", "must contain at least 1 task"));
    }
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let id = TaskId::from_index(i)?;
            if spec.initial_time < 1 {
                return Err(SimError::invalid(
                    "initial_time",
                    format!("of {id} must be at least 1"),
                ));
            }
            Ok(Task::new(id, spec.initial_time, spec.memory_required))
        })
        .collect()
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Generate the initial task population.
///
/// CPU demand is drawn uniformly from `[min_time, max_time]` and memory from
/// `[TASK_MEMORY_MIN, TASK_MEMORY_MAX]`.  Pass a seeded RNG for reproducible
/// task sets.
///
/// # Errors
/// [`SimError::InvalidConfig`] if `config` fails validation.
pub fn generate<R: Rng>(config: &SimConfig, rng: &mut R) -> Result<Vec<Task>, SimError> {
    config.validate()?;

    (0..config.num_tasks)
        .map(|i| {
            let initial_time = rng.gen_range(config.min_time..=config.max_time);
            let memory_required = rng.gen_range(TASK_MEMORY_MIN..=TASK_MEMORY_MAX);
            Ok(Task::new(TaskId::from_index(i)?, initial_time, memory_required))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(num_tasks: usize, min_time: u64, max_time: u64) -> SimConfig {
        SimConfig {
            num_tasks,
            min_time,
            max_time,
            ..Default::default()
        }
    }

    // ── generate ──────────────────────────────────────────────────────────────

    #[test]
    fn generate_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let tasks = generate(&config(50, 3, 10), &mut rng).unwrap();

        assert_eq!(tasks.len(), 50);
        for t in &tasks {
            assert!((3..=10).contains(&t.initial_time));
            assert!((TASK_MEMORY_MIN..=TASK_MEMORY_MAX).contains(&t.memory_required));
            assert_eq!(t.remaining_time, t.initial_time);
            assert_eq!(t.arrival_time, 0);
            assert_eq!(t.status, TaskStatus::Pending);
            assert!(t.start_time.is_none() && t.finish_time.is_none());
        }
    }

    #[test]
    fn generate_assigns_sequential_ids() {
        let mut rng = StdRng::seed_from_u64(2);
        let tasks = generate(&config(4, 1, 1), &mut rng).unwrap();
        let ids: Vec<u32> = tasks.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn generate_is_reproducible_for_a_seed() {
        let a = generate(&config(20, 1, 20), &mut StdRng::seed_from_u64(99)).unwrap();
        let b = generate(&config(20, 1, 20), &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn generate_with_equal_bounds_is_constant() {
        let mut rng = StdRng::seed_from_u64(3);
        let tasks = generate(&config(10, 4, 4), &mut rng).unwrap();
        assert!(tasks.iter().all(|t| t.initial_time == 4));
    }

    #[test]
    fn generate_rejects_invalid_config() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            generate(&config(0, 1, 5), &mut rng),
            Err(SimError::InvalidConfig { .. })
        ));
        assert!(matches!(
            generate(&config(5, 6, 5), &mut rng),
            Err(SimError::InvalidConfig { .. })
        ));
    }

    // ── from_specs ────────────────────────────────────────────────────────────

    #[test]
    fn from_specs_builds_pending_tasks() {
        let tasks = from_specs(&[TaskSpec::new(5, 20), TaskSpec::new(2, 60)]).unwrap();
        assert_eq!(tasks[1].id, TaskId(2));
        assert_eq!(tasks[1].memory_required, 60);
        assert_eq!(tasks[1].remaining_time, 2);
    }

    #[test]
    fn from_specs_rejects_empty_and_zero_time() {
        assert!(from_specs(&[]).is_err());
        assert!(from_specs(&[TaskSpec::new(0, 10)]).is_err());
    }

    // ── Task ──────────────────────────────────────────────────────────────────

    #[test]
    fn turnaround_and_waiting_require_completion() {
        let mut task = Task::new(TaskId(1), 4, 10);
        assert_eq!(task.turnaround_time(), None);
        assert_eq!(task.waiting_time(), None);

        task.finish_time = Some(9);
        assert_eq!(task.turnaround_time(), Some(9));
        assert_eq!(task.waiting_time(), Some(5));
    }

    #[test]
    fn task_id_displays_one_based() {
        assert_eq!(TaskId(7).to_string(), "Task 7");
        assert_eq!(TaskId::from_index(0).unwrap(), TaskId(1));
        assert_eq!(TaskId(3).index(), 2);
    }

    #[test]
    fn task_id_past_u32_range_is_rejected() {
        assert_eq!(
            TaskId::from_index(u32::MAX as usize - 1).unwrap(),
            TaskId(u32::MAX)
        );
        let err = TaskId::from_index(u32::MAX as usize).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConfig {
                field: "num_tasks",
                ..
            }
        ));
    }

    #[test]
    fn status_display_matches_log_text() {
        assert_eq!(TaskStatus::WaitingNoMemory.to_string(), "Waiting (No Memory)");
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }
}
