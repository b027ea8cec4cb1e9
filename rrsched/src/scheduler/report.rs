/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Post-run analysis: turnaround and waiting time.
//!
//! | Metric | Definition |
//! |---|---|
//! | turnaround | `finish_time − arrival_time` |
//! | waiting | `turnaround − initial_time` |
//! | progress | `(Σ initial − Σ remaining) / Σ initial` |
//!
//! Only completed tasks contribute to the per-task table and the averages.
//! With nothing completed both averages are `0.0`.

use serde::Serialize;

use crate::task::{Task, TaskId};

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    pub id: TaskId,
    pub initial_time: u64,
    pub memory_required: u64,
    pub start_time: u64,
    pub finish_time: u64,
    pub turnaround_time: u64,
    pub waiting_time: u64,
}

impl TaskResult {
    /// `None` unless `task` has completed.
    pub fn from_task(task: &Task) -> Option<Self> {
        if !task.is_completed() {
            return None;
        }
        Some(Self {
            id: task.id,
            initial_time: task.initial_time,
            memory_required: task.memory_required,
            start_time: task.start_time?,
            finish_time: task.finish_time?,
            turnaround_time: task.turnaround_time()?,
            waiting_time: task.waiting_time()?,
        })
    }
}

/// Results of a (possibly still running) simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub tasks: Vec<TaskResult>,
    pub average_turnaround_time: f64,
    pub average_waiting_time: f64,
}

impl SimulationReport {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let rows: Vec<TaskResult> = tasks.iter().filter_map(TaskResult::from_task).collect();
        let average_turnaround_time = mean(rows.iter().map(|r| r.turnaround_time));
        let average_waiting_time = mean(rows.iter().map(|r| r.waiting_time));
        Self {
            tasks: rows,
            average_turnaround_time,
            average_waiting_time,
        }
    }

    pub fn completed(&self) -> usize {
        self.tasks.len()
    }
}

/// Fraction of total CPU demand already served, in `[0.0, 1.0]`.
pub fn progress(tasks: &[Task]) -> f64 {
    let total: u64 = tasks.iter().map(|t| t.initial_time).sum();
    if total == 0 {
        return 0.0;
    }
    let done: u64 = tasks.iter().map(Task::executed).sum();
    done as f64 / total as f64
}

fn mean(values: impl Iterator<Item = u64>) -> f64 {
    let (sum, n) = values.fold((0u64, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum as f64 / n as f64
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    fn completed(id: u32, initial: u64, start: u64, finish: u64) -> Task {
        let mut t = Task::new(TaskId(id), initial, 10);
        t.remaining_time = 0;
        t.start_time = Some(start);
        t.finish_time = Some(finish);
        t.status = TaskStatus::Completed;
        t
    }

    #[test]
    fn averages_over_completed_tasks_only() {
        let mut running = Task::new(TaskId(3), 8, 10);
        running.remaining_time = 5;
        running.status = TaskStatus::Running;

        // TAT 5 / wait 0, TAT 9 / wait 6
        let tasks = vec![completed(1, 5, 0, 5), completed(2, 3, 4, 9), running];
        let report = SimulationReport::from_tasks(&tasks);

        assert_eq!(report.completed(), 2);
        assert!((report.average_turnaround_time - 7.0).abs() < 1e-9);
        assert!((report.average_waiting_time - 3.0).abs() < 1e-9);
        assert_eq!(report.tasks[1].waiting_time, 6);
    }

    #[test]
    fn empty_report_has_zero_averages() {
        let report = SimulationReport::from_tasks(&[Task::new(TaskId(1), 4, 10)]);
        assert!(report.tasks.is_empty());
        assert_eq!(report.average_turnaround_time, 0.0);
        assert_eq!(report.average_waiting_time, 0.0);
    }

    #[test]
    fn progress_counts_executed_ticks() {
        let mut half = Task::new(TaskId(1), 4, 10);
        half.remaining_time = 2;
        let untouched = Task::new(TaskId(2), 4, 10);
        assert!((progress(&[half, untouched]) - 0.25).abs() < 1e-9);
        assert_eq!(progress(&[]), 0.0);
    }
}
