/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! rrsched – discrete-time round-robin scheduling simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/         – SimConfig + YAML loader
//! ├── task.rs         – Task model and task registry (seeded generation)
//! ├── worker.rs       – worker pool: availability + memory accounting
//! ├── event.rs        – append-only event log
//! └── scheduler/      – tick engine, ready queue, errors, results report
//! ```

pub mod config;
pub mod event;
pub mod scheduler;
pub mod task;
pub mod worker;
