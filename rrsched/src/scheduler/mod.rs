//! Tick-stepping round-robin scheduler.
//!
//! [`SimulationState`] owns the whole simulation: tasks, worker pool, ready
//! queue, running map and event log.  [`initialize`] builds it from a
//! [`SimConfig`]; the driver then calls [`SimulationState::step`] until it
//! reports [`StepOutcome::Finished`].
//!
//! # One tick
//! ```text
//! t += 1
//! Phase 1  advance running tasks   → complete / preempt / continue
//! Phase 2  dispatch to free workers → admit (memory check) / wait
//! Phase 3  queue and workers empty? → finished
//! ```
//! Every effect of a phase is visible to the next one, so memory released by a
//! completion is reusable by a dispatch in the same tick.
//!
//! # Memory reservations
//! | Event | Reservation |
//! |---|---|
//! | dispatch (fresh task) | allocated on the worker |
//! | preemption | **kept** on the worker (`Task::reserved_on`) |
//! | re-dispatch, same worker | reused, no new allocation |
//! | re-dispatch, other worker | dropped on the old worker, then allocated on the new one |
//! | completion | released |
//!
//! Admission is checked once at `initialize` too: the queue is filled in task
//! order and dispatched at tick 0, so work starts in the first tick interval.
//!
//! # Fairness
//! A task that fails admission re-enters at the tail of the queue rather than
//! retrying the same worker.  Under memory pressure a large task can starve
//! behind many small ones; that is the implemented contract.
//!
//! # Termination
//! When no admission ever fails, a run ends within
//! `Σ initial_time + num_tasks × time_quantum` ticks.  Once retained
//! reservations start blocking admission, a free worker may spend whole ticks
//! on `WAITING` pops and only termination is guaranteed: a failed migration
//! drops a reservation, and a same-worker re-dispatch always succeeds.
//!
//! # Example
//! ```rust
//! use rrsched::config::SimConfig;
//! use rrsched::scheduler::{initialize, StepOutcome};
//!
//! let cfg = SimConfig { seed: Some(7), ..Default::default() };
//! let mut state = initialize(&cfg).unwrap();
//! while state.step().unwrap() == StepOutcome::Running {}
//! assert!(state.is_finished());
//! ```

pub mod error;
pub mod queue;
pub mod report;

pub use error::{AllocError, SimError};
pub use queue::ReadyQueue;
pub use report::{SimulationReport, TaskResult};

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::event::{Action, Event, EventLog, SYSTEM_WORKER};
use crate::task::{self, Task, TaskId, TaskSpec, TaskStatus};
use crate::worker::{WorkerId, WorkerPool};

// ── Public types ──────────────────────────────────────────────────────────────

/// Result of a successful [`SimulationState::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Work remains; call `step()` again.
    Running,
    /// The queue and every worker drained during this tick.
    Finished,
}

/// Read-only view of one worker for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub memory_used: u64,
    pub memory_capacity: u64,
    /// `None` when idle.
    pub running: Option<TaskId>,
}

/// Read-only view of the whole simulation for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub workers: Vec<WorkerSnapshot>,
    pub queue_length: usize,
    pub time_quantum: u64,
    pub progress: f64,
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Validate `config`, generate its task set and run the tick-0 admission pass.
///
/// The task set is drawn from `StdRng` seeded with `config.seed`, or with a
/// fresh random seed that is logged and kept in the state.
///
/// # Errors
/// * [`SimError::InvalidConfig`]: a bound is violated; nothing is built.
/// * [`SimError::UnschedulableTask`]: a generated task can never fit a worker.
pub fn initialize(config: &SimConfig) -> Result<SimulationState, SimError> {
    config.validate()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let tasks = task::generate(config, &mut rng)?;

    SimulationState::build(config.clone(), seed, tasks)
}

// ── SimulationState ───────────────────────────────────────────────────────────

/// Complete, serialisable simulation state.
///
/// Exclusively owns every mutable piece of the simulation.  `step()` takes
/// `&mut self`, so concurrent steps on one instance cannot compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    config: SimConfig,
    seed: u64,
    tick: u64,
    tasks: Vec<Task>,
    workers: WorkerPool,
    queue: ReadyQueue,
    /// worker → running task.  `BTreeMap` so Phase 1 walks workers in pool order.
    running: BTreeMap<WorkerId, TaskId>,
    history: EventLog,
    finished: bool,
}

impl SimulationState {
    /// Build a state from an explicit task set instead of random generation.
    ///
    /// `config.num_tasks` is replaced by `specs.len()` before validation;
    /// `min_time` and `max_time` are still checked but the task list comes
    /// from `specs`.
    ///
    /// # Errors
    /// Same as [`initialize`], plus [`SimError::InvalidConfig`] for an empty
    /// list or a zero-time task.
    pub fn with_tasks(config: &SimConfig, specs: &[TaskSpec]) -> Result<Self, SimError> {
        let tasks = task::from_specs(specs)?;

        let mut config = config.clone();
        config.num_tasks = tasks.len();
        config.validate()?;
        let seed = config.seed.unwrap_or(0);

        Self::build(config, seed, tasks)
    }

    fn build(config: SimConfig, seed: u64, tasks: Vec<Task>) -> Result<Self, SimError> {
        let workers = WorkerPool::new(config.num_workers, config.worker_memory_capacity);

        let capacity = workers.max_capacity();
        if let Some(t) = tasks.iter().find(|t| t.memory_required > capacity) {
            warn!(
                task = %t.id,
                required = t.memory_required,
                capacity,
                "task can never be admitted by any worker"
            );
            return Err(SimError::UnschedulableTask {
                task: t.id,
                required: t.memory_required,
                capacity,
            });
        }

        let queue = tasks.iter().map(|t| t.id).collect();

        let mut state = Self {
            config,
            seed,
            tick: 0,
            tasks,
            workers,
            queue,
            running: BTreeMap::new(),
            history: EventLog::new(),
            finished: false,
        };

        info!(
            seed,
            task_count = state.tasks.len(),
            worker_count = state.workers.len(),
            worker_memory = state.config.worker_memory_capacity,
            time_quantum = state.config.time_quantum,
            "=== simulation initialised ==="
        );

        state.dispatch_ready_tasks();
        Ok(state)
    }

    // ── Stepping ──────────────────────────────────────────────────────────────

    /// Advance the simulation by exactly one tick.
    ///
    /// # Errors
    /// [`SimError::AlreadyFinished`] once the run has finished; the state is
    /// left untouched.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        if self.finished {
            warn!(tick = self.tick, "step() called on a finished simulation");
            return Err(SimError::AlreadyFinished { tick: self.tick });
        }

        self.tick += 1;

        self.advance_running_tasks();
        self.dispatch_ready_tasks();

        if self.queue.is_empty() && self.running.is_empty() {
            self.finished = true;
            self.history.append(Event {
                tick: self.tick,
                task: None,
                worker: SYSTEM_WORKER.to_string(),
                action: Action::Finished,
                remaining: 0,
            });
            info!(tick = self.tick, "=== simulation finished ===");
            return Ok(StepOutcome::Finished);
        }

        debug!(
            tick = self.tick,
            running = self.running.len(),
            queued = self.queue.len(),
            "tick complete"
        );
        Ok(StepOutcome::Running)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phase 1: advance running tasks
    // ─────────────────────────────────────────────────────────────────────────

    fn advance_running_tasks(&mut self) {
        let t = self.tick;
        let quantum = self.config.time_quantum;
        let running: Vec<(WorkerId, TaskId)> =
            self.running.iter().map(|(&w, &id)| (w, id)).collect();

        for (worker, id) in running {
            let task = &mut self.tasks[id.index()];
            debug_assert!(task.remaining_time > 0, "{id} running with no work left");

            task.remaining_time = task.remaining_time.saturating_sub(1);
            if task.start_time.is_none() {
                task.start_time = Some(t - 1);
            }

            let quantum_expired = task
                .quantum_start_time
                .map_or(true, |started| t - started >= quantum);

            if task.remaining_time == 0 {
                // Completion
                task.status = TaskStatus::Completed;
                task.finish_time = Some(t);
                task.assigned_worker = None;
                task.quantum_start_time = None;
                task.reserved_on = None;
                let memory = task.memory_required;

                self.workers.release(worker, memory);
                self.workers.mark_free(worker, t);
                self.running.remove(&worker);

                debug!(tick = t, task = %id, worker = %self.workers.get(worker).name, "completed");
                self.history.append(Event {
                    tick: t,
                    task: Some(id),
                    worker: self.workers.get(worker).name.clone(),
                    action: Action::Completed {
                        memory_used_mb: memory,
                    },
                    remaining: 0,
                });
            } else if quantum_expired {
                // Preemption: the reservation stays on `worker`
                task.status = TaskStatus::Pending;
                task.assigned_worker = None;
                task.quantum_start_time = None;
                let remaining = task.remaining_time;
                let memory = task.memory_required;

                self.queue.push_back(id);
                self.workers.mark_free(worker, t);
                self.running.remove(&worker);

                debug!(
                    tick = t,
                    task = %id,
                    worker = %self.workers.get(worker).name,
                    remaining,
                    "preempted"
                );
                self.history.append(Event {
                    tick: t,
                    task: Some(id),
                    worker: self.workers.get(worker).name.clone(),
                    action: Action::Preempted {
                        memory_held_mb: memory,
                    },
                    remaining,
                });
            } else {
                self.workers.mark_busy_until_next_step(worker, t);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phase 2: dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Each free worker, in pool order, pops at most one task from the head
    /// of the queue.
    fn dispatch_ready_tasks(&mut self) {
        let t = self.tick;

        for worker in self.workers.free_workers(t) {
            let Some(id) = self.queue.pop_front() else {
                break;
            };
            debug_assert!(!self.running.contains_key(&worker));

            let name = self.workers.get(worker).name.clone();
            match self.admit(worker, id) {
                Ok(()) => {
                    let task = &mut self.tasks[id.index()];
                    task.assigned_worker = Some(worker);
                    task.quantum_start_time = Some(t);
                    task.status = TaskStatus::Running;

                    self.workers.mark_busy_until_next_step(worker, t);
                    self.running.insert(worker, id);

                    debug!(tick = t, task = %id, worker = %name, "dispatched");
                    self.history.append(Event {
                        tick: t,
                        task: Some(id),
                        worker: name,
                        action: Action::Dispatched {
                            memory_mb: task.memory_required,
                        },
                        remaining: task.remaining_time,
                    });
                }
                Err(AllocError::InsufficientMemory {
                    required,
                    available,
                }) => {
                    let task = &mut self.tasks[id.index()];
                    task.status = TaskStatus::WaitingNoMemory;
                    self.queue.push_back(id);

                    debug!(
                        tick = t,
                        task = %id,
                        worker = %name,
                        required,
                        available,
                        "waiting for memory"
                    );
                    self.history.append(Event {
                        tick: t,
                        task: Some(id),
                        worker: name,
                        action: Action::Waiting {
                            memory_needed_mb: required,
                        },
                        remaining: task.remaining_time,
                    });
                }
            }
        }
    }

    /// Admission control: secure `task`'s memory on `worker`.
    ///
    /// A reservation already held on `worker` is reused.  One held elsewhere
    /// is dropped before the new allocation is attempted.
    fn admit(&mut self, worker: WorkerId, id: TaskId) -> Result<(), AllocError> {
        let task = &mut self.tasks[id.index()];
        let memory = task.memory_required;

        match task.reserved_on {
            Some(held) if held == worker => {
                debug!(
                    task = %id,
                    worker = %self.workers.get(worker).name,
                    "resuming on retained reservation"
                );
            }
            Some(held) => {
                self.workers.release(held, memory);
                task.reserved_on = None;
                debug!(
                    task = %id,
                    from = %self.workers.get(held).name,
                    to = %self.workers.get(worker).name,
                    "reservation dropped for migration"
                );
                self.workers.allocate(worker, memory)?;
            }
            None => self.workers.allocate(worker, memory)?,
        }

        task.reserved_on = Some(worker);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current tick.  `0` right after initialisation.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Seed the task set was generated from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    pub fn queue(&self) -> &ReadyQueue {
        &self.queue
    }

    /// Task currently running on `worker`, if any.
    pub fn running_task(&self, worker: WorkerId) -> Option<TaskId> {
        self.running.get(&worker).copied()
    }

    /// Full event history.  Use [`EventLog::tail`] for the most recent events.
    pub fn history(&self) -> &EventLog {
        &self.history
    }

    /// Fraction of total CPU demand already served.
    pub fn progress(&self) -> f64 {
        report::progress(&self.tasks)
    }

    pub fn snapshot(&self) -> Snapshot {
        let workers = self
            .workers
            .iter()
            .map(|(id, w)| WorkerSnapshot {
                name: w.name.clone(),
                memory_used: w.memory_used(),
                memory_capacity: w.memory_capacity,
                running: self.running_task(id),
            })
            .collect();

        Snapshot {
            tick: self.tick,
            workers,
            queue_length: self.queue.len(),
            time_quantum: self.config.time_quantum,
            progress: self.progress(),
        }
    }

    /// Turnaround / waiting statistics over the tasks completed so far.
    pub fn results(&self) -> SimulationReport {
        SimulationReport::from_tasks(&self.tasks)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
