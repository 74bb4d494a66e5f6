/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use countwake::clock::{BootClock, Clock};
use countwake::config::ConfigManager;
use countwake::deadline::TimerId;
use countwake::engine::{handle, Collaborators, Command, EngineTask, ReconciliationEngine};
use countwake::host::{HostControl, HostError, Notification, Notifier, TimerDisplay, TokioWakeHost};
use countwake::store::FileDeadlineStore;

// ── CLI argument definition ───────────────────────────────────────────────────

/// countwake demo host.
///
/// Restores the timers saved by a previous run, arms the ones given on the
/// command line, logs every countdown render and expiry alert, and exits once
/// no timer is pending (or on Ctrl-C).
///
/// Example:
///   countwake --arm 1:90:Tea --arm 2:5 --fast
#[derive(Debug, Parser)]
#[command(
    name = "countwake",
    about = "Countdown alarm engine – demo host",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML engine configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Where the pending deadlines are persisted (overrides the config file).
    #[arg(short = 's', long = "state-file")]
    state_file: Option<PathBuf>,

    /// Timer to arm, as ID:SECS[:LABEL].  May be repeated.
    #[arg(short = 'a', long = "arm", value_parser = parse_arm)]
    arm: Vec<ArmSpec>,

    /// Arm the timers given with --arm without sound.
    #[arg(long = "silent", default_value_t = false)]
    silent: bool,

    /// Refresh the countdown every 200 ms.
    #[arg(long = "fast", default_value_t = false)]
    fast: bool,
}

#[derive(Debug, Clone)]
struct ArmSpec {
    id: u32,
    secs: u64,
    label: Option<String>,
}

fn parse_arm(raw: &str) -> Result<ArmSpec, String> {
    let mut parts = raw.splitn(3, ':');
    let id = parts
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| format!("invalid timer id in '{raw}'"))?;
    let secs = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| format!("invalid duration in '{raw}', expected ID:SECS[:LABEL]"))?;
    let label = parts.next().map(str::to_string);
    Ok(ArmSpec { id, secs, label })
}

// ── Log-backed host collaborators ─────────────────────────────────────────────

struct LogDisplay;

impl TimerDisplay for LogDisplay {
    fn render_time(&self, timer_id: TimerId, text: &str) {
        info!(timer_id = %timer_id, "[{text}]");
    }

    fn render_uninitialized(&self, timer_id: TimerId) {
        info!(timer_id = %timer_id, "[--:--:--]");
    }
}

struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: &Notification) -> Result<(), HostError> {
        warn!(
            timer_id = %n.timer_id,
            sound = ?n.sound,
            vibrate = n.vibration.is_some(),
            insistent = n.insistent,
            "ALERT: {}",
            n.title
        );
        Ok(())
    }
}

/// Wakes `main` once the engine reports that nothing is pending.
struct IdleSignal(Arc<Notify>);

impl HostControl for IdleSignal {
    fn background_idle(&self) {
        self.0.notify_one();
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

    info!("countwake starting up...");

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    let cli = Cli::parse();

    info!(
        config     = ?cli.config,
        state_file = ?cli.state_file,
        arms       = cli.arm.len(),
        silent     = cli.silent,
        fast       = cli.fast,
        "Configuration"
    );

    // ── Load engine configuration ─────────────────────────────────────────────
    let mut config_manager = ConfigManager::new();

    match &cli.config {
        Some(path) => {
            if let Err(e) = config_manager.load_from_file(path) {
                error!("Failed to load engine configuration: {:#}", e);
                process::exit(1);
            }
        }
        None => {
            info!("No configuration file provided, using default settings");
        }
    }

    if let Some(path) = &cli.state_file {
        config_manager.config_mut().state_file = path.clone();
    }
    if cli.fast {
        config_manager.config_mut().fast_refresh = true;
    }
    let config = config_manager.config().clone();

    // ── Wire the engine ───────────────────────────────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(BootClock);
    let idle = Arc::new(Notify::new());
    let (engine_handle, rx) = handle::channel();

    let engine = ReconciliationEngine::new(
        Collaborators {
            store: Arc::new(FileDeadlineStore::new(&config.state_file)),
            wake: Arc::new(TokioWakeHost::new(clock.clone(), engine_handle.sender())),
            notifier: Arc::new(LogNotifier),
            settings: Arc::new(config.clone()),
            display: Arc::new(LogDisplay),
            host: Arc::new(IdleSignal(idle.clone())),
            clock,
        },
        config.tick_rate(),
    );
    let task = EngineTask::spawn(engine, rx);

    let mut commands = vec![Command::RestoreAll];
    for spec in &cli.arm {
        match Command::arm(spec.id, spec.secs, cli.silent, spec.label.clone()) {
            Ok(cmd) => commands.push(cmd),
            Err(e) => error!(timer_id = spec.id, "Skipping --arm: {}", e),
        }
    }
    for cmd in commands {
        if let Err(e) = engine_handle.send(cmd) {
            error!("Engine stopped early: {}", e);
            process::exit(1);
        }
    }

    // ── Run until idle ────────────────────────────────────────────────────────
    tokio::select! {
        _ = idle.notified() => info!("No pending timers, shutting down"),
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => info!("Interrupted, pending timers stay saved"),
            Err(e) => error!("Cannot listen for Ctrl-C: {}", e),
        },
    }

    match task.shutdown().await {
        Some(engine) => info!(
            pending = engine.deadlines().len(),
            state_file = %config.state_file.display(),
            "countwake stopped"
        ),
        None => {
            error!("Engine task did not stop cleanly");
            process::exit(1);
        }
    }
}
