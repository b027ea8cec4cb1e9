/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use rrsched::config::SimConfig;
use rrsched::scheduler::{initialize, SimulationState, StepOutcome};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Round-robin CPU scheduling simulator with memory-aware dispatch.
///
/// Example:
///   rrsched -t 10 --min-time 3 --max-time 10 -q 2 -w 4 -m 100 --seed 42
#[derive(Debug, Parser)]
#[command(
    name = "rrsched",
    about = "Round-robin scheduling simulator with per-worker memory limits",
    long_about = None,
)]
struct Cli {
    /// Path to a YAML simulation configuration file.  Flags below override it.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Number of tasks to generate.
    #[arg(short = 't', long = "tasks")]
    num_tasks: Option<usize>,

    /// Minimum CPU time per task, in ticks.
    #[arg(long = "min-time")]
    min_time: Option<u64>,

    /// Maximum CPU time per task, in ticks.
    #[arg(long = "max-time")]
    max_time: Option<u64>,

    /// Round-robin time quantum, in ticks.
    #[arg(short = 'q', long = "quantum")]
    time_quantum: Option<u64>,

    /// Number of workers in the pool.
    #[arg(short = 'w', long = "workers")]
    num_workers: Option<usize>,

    /// Memory capacity per worker, in MB.
    #[arg(short = 'm', long = "memory")]
    worker_memory: Option<u64>,

    /// RNG seed for task generation.
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Real-time delay between steps, in milliseconds (0 = as fast as possible).
    #[arg(short = 'd', long = "delay-ms", default_value_t = 0)]
    delay_ms: u64,

    /// Number of most recent events to print at the end (0 = full history).
    #[arg(long = "tail", default_value_t = 0)]
    tail: usize,

    /// Write the full event history to this YAML file.
    #[arg(long = "history-out")]
    history_out: Option<PathBuf>,
}

impl Cli {
    /// YAML file (if any) first, then individual flags on top.
    fn build_config(&self) -> Result<SimConfig> {
        let mut cfg = match &self.config {
            Some(path) => SimConfig::load_from_file(path)?,
            None => {
                warn!("No configuration file provided, using default simulation settings");
                SimConfig::default()
            }
        };

        if let Some(v) = self.num_tasks {
            cfg.num_tasks = v;
        }
        if let Some(v) = self.min_time {
            cfg.min_time = v;
        }
        if let Some(v) = self.max_time {
            cfg.max_time = v;
        }
        if let Some(v) = self.time_quantum {
            cfg.time_quantum = v;
        }
        if let Some(v) = self.num_workers {
            cfg.num_workers = v;
        }
        if let Some(v) = self.worker_memory {
            cfg.worker_memory_capacity = v;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }

        Ok(cfg)
    }
}

// ── Reporting ─────────────────────────────────────────────────────────────────

fn log_snapshot(state: &SimulationState) {
    let snap = state.snapshot();
    info!(
        tick = snap.tick,
        queue = snap.queue_length,
        progress_pct = %format!("{:.1}", snap.progress * 100.0),
        "── tick ──"
    );
    for w in &snap.workers {
        let running = w
            .running
            .map(|id| id.to_string())
            .unwrap_or_else(|| String::from("IDLE"));
        info!(
            "  [{name}]  {running:<8}  mem {used}/{cap}MB  quantum {q}",
            name = w.name,
            used = w.memory_used,
            cap = w.memory_capacity,
            q = snap.time_quantum,
        );
    }
}

fn log_report(state: &SimulationState, tail: usize) {
    let report = state.results();
    if report.tasks.is_empty() {
        info!("No tasks completed yet.");
        return;
    }

    info!("Task summary:");
    info!(
        "  {:<8} {:>7} {:>7} {:>6} {:>7} {:>5} {:>5}",
        "id", "cpu", "mem", "start", "finish", "tat", "wait"
    );
    for row in &report.tasks {
        info!(
            "  {:<8} {:>7} {:>7} {:>6} {:>7} {:>5} {:>5}",
            row.id.to_string(),
            row.initial_time,
            row.memory_required,
            row.start_time,
            row.finish_time,
            row.turnaround_time,
            row.waiting_time,
        );
    }
    info!(
        average_turnaround = %format!("{:.2}", report.average_turnaround_time),
        average_waiting = %format!("{:.2}", report.average_waiting_time),
        "Simulation complete"
    );

    let events = if tail == 0 {
        state.history().as_slice()
    } else {
        state.history().tail(tail)
    };
    info!("Simulation log ({} of {} events):", events.len(), state.history().len());
    for event in events {
        info!("  {event}");
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cfg = match cli.build_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load simulation configuration: {:#}", e);
            process::exit(1);
        }
    };

    info!(
        num_tasks = cfg.num_tasks,
        min_time = cfg.min_time,
        max_time = cfg.max_time,
        time_quantum = cfg.time_quantum,
        num_workers = cfg.num_workers,
        worker_memory = cfg.worker_memory_capacity,
        seed = ?cfg.seed,
        delay_ms = cli.delay_ms,
        "Configuration"
    );

    let mut state = match initialize(&cfg) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialise simulation: {}", e);
            process::exit(1);
        }
    };
    log_snapshot(&state);

    let delay = Duration::from_millis(cli.delay_ms);
    loop {
        match state.step() {
            Ok(outcome) => {
                log_snapshot(&state);
                if outcome == StepOutcome::Finished {
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!("{}", e);
                break;
            }
            Err(e) => {
                error!("Simulation aborted: {}", e);
                process::exit(1);
            }
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    log_report(&state, cli.tail);

    if let Some(path) = &cli.history_out {
        if let Err(e) = state.history().export_yaml(path) {
            error!("Failed to export event history: {:#}", e);
            process::exit(1);
        }
    }
}
