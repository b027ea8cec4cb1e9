/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Worker pool: per-worker availability and memory accounting.
//!
//! The pool never decides *what* runs where; it only answers "is this worker
//! free?" and "can it hold this much memory?".  The scheduler owns the
//! worker→task mapping.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::scheduler::AllocError;

/// Position of a worker in the pool.  Pool order is also dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub usize);

/// A single simulated worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    /// `Worker N`, 1-based.
    pub name: String,

    /// Earliest tick at which the worker may accept a new task.
    pub free_at: u64,

    /// Memory not yet reserved by running or preempted tasks, in MB.
    pub memory_available: u64,

    /// Total memory, in MB.  Constant for the run.
    pub memory_capacity: u64,
}

impl Worker {
    fn new(name: String, memory_capacity: u64) -> Self {
        Self {
            name,
            free_at: 0,
            memory_available: memory_capacity,
            memory_capacity,
        }
    }

    /// Memory currently reserved, in MB.
    pub fn memory_used(&self) -> u64 {
        self.memory_capacity - self.memory_available
    }
}

/// Fixed-size set of identical workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Create `count` workers, each with `memory_capacity` MB.
    pub fn new(count: usize, memory_capacity: u64) -> Self {
        let workers = (1..=count)
            .map(|n| Worker::new(format!("Worker {n}"), memory_capacity))
            .collect();
        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn get(&self, id: WorkerId) -> &Worker {
        &self.workers[id.0]
    }

    /// Workers in pool order, paired with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (WorkerId, &Worker)> {
        self.workers
            .iter()
            .enumerate()
            .map(|(i, w)| (WorkerId(i), w))
    }

    /// Largest memory capacity of any worker.
    pub fn max_capacity(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.memory_capacity)
            .max()
            .unwrap_or(0)
    }

    // ── Availability ──────────────────────────────────────────────────────────

    /// `true` iff the worker may accept a task at `tick`.
    pub fn is_free(&self, id: WorkerId, tick: u64) -> bool {
        self.get(id).free_at <= tick
    }

    /// Ids of every worker free at `tick`, in pool order.
    pub fn free_workers(&self, tick: u64) -> Vec<WorkerId> {
        self.iter()
            .filter(|(_, w)| w.free_at <= tick)
            .map(|(id, _)| id)
            .collect()
    }

    /// The worker is occupied for the rest of `tick`.
    pub fn mark_busy_until_next_step(&mut self, id: WorkerId, tick: u64) {
        self.workers[id.0].free_at = tick + 1;
    }

    pub fn mark_free(&mut self, id: WorkerId, tick: u64) {
        self.workers[id.0].free_at = tick;
    }

    // ── Memory ────────────────────────────────────────────────────────────────

    /// Reserve `amount` MB on the worker.
    ///
    /// # Errors
    /// [`AllocError::InsufficientMemory`] if the worker has less than `amount`
    /// free; nothing is reserved in that case.
    pub fn allocate(&mut self, id: WorkerId, amount: u64) -> Result<(), AllocError> {
        let worker = &mut self.workers[id.0];
        if amount > worker.memory_available {
            return Err(AllocError::InsufficientMemory {
                required: amount,
                available: worker.memory_available,
            });
        }
        worker.memory_available -= amount;
        debug!(
            worker = %worker.name,
            amount,
            available = worker.memory_available,
            "memory allocated"
        );
        Ok(())
    }

    /// Return `amount` MB to the worker.  Clamped to capacity.
    pub fn release(&mut self, id: WorkerId, amount: u64) {
        let worker = &mut self.workers[id.0];
        let next = worker.memory_available.saturating_add(amount);
        if next > worker.memory_capacity {
            warn!(
                worker = %worker.name,
                amount,
                available = worker.memory_available,
                capacity = worker.memory_capacity,
                "release exceeds capacity, clamping"
            );
        }
        worker.memory_available = next.min(worker.memory_capacity);
        debug!(
            worker = %worker.name,
            amount,
            available = worker.memory_available,
            "memory released"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
