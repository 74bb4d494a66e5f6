/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runs a [`ReconciliationEngine`] inside one tokio task.
//!
//! Producers (wake deliveries from [`TokioWakeHost`](crate::host::TokioWakeHost),
//! CLI requests, display visibility changes) hold a cloneable
//! [`EngineHandle`] and push [`Command`]s; the task applies them strictly one
//! at a time.
//!
//! ```rust,ignore
//! let (handle, rx) = engine::handle::channel();
//! let wake = TokioWakeHost::new(clock.clone(), handle.sender());
//! let task = EngineTask::spawn(ReconciliationEngine::new(collab, rate), rx);
//! handle.send(Command::RestoreAll)?;
//! // ...
//! let engine = task.shutdown().await;
//! ```

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{Command, EngineError, ReconciliationEngine};

/// Creates the command channel; the receiver goes to [`EngineTask::spawn`].
pub fn channel() -> (EngineHandle, mpsc::UnboundedReceiver<Command>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineHandle { tx }, rx)
}

// ── EngineHandle ──────────────────────────────────────────────────────────────

/// Cloneable sender side of the engine task.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    /// Queues `command`.  Validation errors surface in the engine task's log,
    /// not here.
    ///
    /// # Errors
    /// [`EngineError::Stopped`] once the task has exited.
    pub fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx.send(command).map_err(|_| EngineError::Stopped)
    }

    /// Raw sender, for collaborators that deliver commands themselves.
    pub fn sender(&self) -> mpsc::UnboundedSender<Command> {
        self.tx.clone()
    }
}

// ── EngineTask ────────────────────────────────────────────────────────────────

/// The running engine.  Dropping it without [`shutdown`](Self::shutdown)
/// aborts the task.
pub struct EngineTask {
    task: Option<JoinHandle<ReconciliationEngine>>,
    stop: Option<oneshot::Sender<()>>,
}

impl EngineTask {
    pub fn spawn(
        mut engine: ReconciliationEngine,
        mut rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!("engine task started");
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        debug!("engine task stop requested");
                        break;
                    }
                    cmd = rx.recv() => match cmd {
                        Some(cmd) => {
                            let name = cmd.name();
                            if let Err(e) = engine.handle(cmd) {
                                warn!(command = name, error = %e, "command rejected");
                            }
                        }
                        None => {
                            debug!("all engine handles dropped");
                            break;
                        }
                    },
                }
            }
            info!(pending = engine.deadlines().len(), "engine task stopped");
            engine
        });

        Self {
            task: Some(task),
            stop: Some(stop_tx),
        }
    }

    /// Stops the task after the command in progress and returns the engine.
    ///
    /// Commands still queued are discarded; the persisted set already
    /// reflects everything that was applied.
    pub async fn shutdown(mut self) -> Option<ReconciliationEngine> {
        if let Some(stop) = self.stop.take() {
            // The task may already be gone; the join below reports that.
            let _ = stop.send(());
        }
        let task = self.task.take()?;
        match task.await {
            Ok(engine) => Some(engine),
            Err(e) => {
                error!(error = %e, "engine task failed");
                None
            }
        }
    }
}

impl Drop for EngineTask {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
