/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Append-only event log.
//!
//! Every state change the scheduler makes is recorded here in tick order.
//! The log drives reporting only; the scheduler never reads it back.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::task::TaskId;

/// Worker label used for simulation-wide events.
pub const SYSTEM_WORKER: &str = "SYSTEM";

/// What happened.  Each variant carries the memory figure the log line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Task admitted to a worker.
    Dispatched { memory_mb: u64 },
    /// Task's quantum expired; it keeps its reservation.
    Preempted { memory_held_mb: u64 },
    /// Task finished; its memory was returned.
    Completed { memory_used_mb: u64 },
    /// Task popped but the worker lacked memory.
    Waiting { memory_needed_mb: u64 },
    /// Queue and workers drained.
    Finished,
}

/// One immutable log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub tick: u64,

    /// `None` for simulation-wide events.
    pub task: Option<TaskId>,

    pub worker: String,

    pub action: Action,

    /// Task's `remaining_time` at the moment of the event.
    pub remaining: u64,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = match self.task {
            Some(id) => id.to_string(),
            None => String::from("SIMULATION"),
        };
        write!(f, "[t={:>4}] {:<10} {:<10} ", self.tick, task, self.worker)?;
        match self.action {
            Action::Dispatched { memory_mb } => write!(f, "DISPATCHED ({memory_mb}MB allocated)"),
            Action::Preempted { memory_held_mb } => write!(
                f,
                "PREEMPTED (remaining {}, holding {memory_held_mb}MB)",
                self.remaining
            ),
            Action::Completed { memory_used_mb } => {
                write!(f, "COMPLETED (used {memory_used_mb}MB)")
            }
            Action::Waiting { memory_needed_mb } => {
                write!(f, "WAITING - memory full ({memory_needed_mb}MB needed)")
            }
            Action::Finished => f.write_str("FINISHED"),
        }
    }
}

/// Ordered, append-only history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, event: Event) {
        debug_assert!(
            self.events.last().map_or(true, |last| last.tick <= event.tick),
            "event log must stay in tick order"
        );
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Full history, oldest first.
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// The most recent `k` events, oldest first.
    pub fn tail(&self, k: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(k);
        &self.events[start..]
    }

    /// Events belonging to one task, oldest first.
    pub fn for_task(&self, id: TaskId) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.task == Some(id))
    }

    /// Write the full history to `path` as a YAML sequence.
    ///
    /// # Errors
    /// Returns an error if serialisation fails or the file cannot be written.
    pub fn export_yaml(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.events).context("Failed to serialise event log")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Cannot write event log: {}", path.display()))?;
        info!(
            events = self.events.len(),
            path = %path.display(),
            "event log exported"
        );
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn event(tick: u64, task: u32, action: Action, remaining: u64) -> Event {
        Event {
            tick,
            task: Some(TaskId(task)),
            worker: "Worker 1".into(),
            action,
            remaining,
        }
    }

    fn sample_log() -> EventLog {
        let mut log = EventLog::new();
        log.append(event(0, 1, Action::Dispatched { memory_mb: 20 }, 5));
        log.append(event(0, 2, Action::Waiting { memory_needed_mb: 90 }, 3));
        log.append(event(2, 1, Action::Preempted { memory_held_mb: 20 }, 3));
        log.append(event(5, 1, Action::Completed { memory_used_mb: 20 }, 0));
        log
    }

    #[test]
    fn append_preserves_order() {
        let log = sample_log();
        let ticks: Vec<u64> = log.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 0, 2, 5]);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn tail_returns_most_recent() {
        let log = sample_log();
        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].tick, 2);
        assert_eq!(tail[1].tick, 5);
        assert_eq!(log.tail(100).len(), 4);
        assert!(EventLog::new().tail(3).is_empty());
    }

    #[test]
    fn for_task_filters_by_id() {
        let log = sample_log();
        assert_eq!(log.for_task(TaskId(1)).count(), 3);
        assert_eq!(log.for_task(TaskId(2)).count(), 1);
    }

    #[test]
    fn display_matches_log_text() {
        let e = event(2, 1, Action::Preempted { memory_held_mb: 20 }, 3);
        assert!(e
            .to_string()
            .ends_with("PREEMPTED (remaining 3, holding 20MB)"));

        let fin = Event {
            tick: 9,
            task: None,
            worker: SYSTEM_WORKER.into(),
            action: Action::Finished,
            remaining: 0,
        };
        let line = fin.to_string();
        assert!(line.contains("SIMULATION"));
        assert!(line.contains("SYSTEM"));
        assert!(line.ends_with("FINISHED"));
    }

    #[test]
    fn export_yaml_writes_full_history() {
        let log = sample_log();
        let f = NamedTempFile::new().unwrap();
        log.export_yaml(f.path()).unwrap();

        let text = std::fs::read_to_string(f.path()).unwrap();
        let back: Vec<Event> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.as_slice(), log.as_slice());
    }
}
