/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-process wake primitive built on tokio timers.
//!
//! Each [`WakePurpose`] owns one slot holding the task that will deliver its
//! token.  Arranging a purpose aborts the previous task first, so a slot can
//! never hold two pending deliveries.  Delivered tokens are converted into
//! engine [`Command`]s and pushed into the engine channel.
//!
//! Unlike a platform alarm service this does not survive the process; it is
//! what the demo binary and the integration tests run against.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::{HostError, WakeHost, WakePurpose, WakeToken};
use crate::clock::Clock;
use crate::engine::Command;

pub struct TokioWakeHost {
    clock: Arc<dyn Clock>,
    tx: UnboundedSender<Command>,
    slots: Mutex<HashMap<WakePurpose, JoinHandle<()>>>,
}

impl TokioWakeHost {
    /// Deliveries are sent on `tx`; `clock` translates monotonic deadlines
    /// into tokio delays.
    pub fn new(clock: Arc<dyn Clock>, tx: UnboundedSender<Command>) -> Self {
        Self {
            clock,
            tx,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Number of purposes with a task that has not finished yet.
    pub fn pending(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| slots.values().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    fn install(&self, purpose: WakePurpose, task: JoinHandle<()>) -> Result<(), HostError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| HostError::Wake("slot table poisoned".into()))?;
        if let Some(old) = slots.insert(purpose, task) {
            old.abort();
        }
        Ok(())
    }

    /// Runtime to spawn delivery tasks on; fails once the engine side of the
    /// channel is gone, since nothing could receive the token.
    fn runtime(&self) -> Result<tokio::runtime::Handle, HostError> {
        if self.tx.is_closed() {
            return Err(HostError::ChannelClosed);
        }
        tokio::runtime::Handle::try_current()
            .map_err(|e| HostError::Wake(format!("no tokio runtime: {e}")))
    }
}

impl WakeHost for TokioWakeHost {
    fn arrange(&self, at_ms: i64, token: WakeToken) -> Result<(), HostError> {
        let rt = self.runtime()?;
        let purpose = token.purpose();
        let delay_ms = at_ms.saturating_sub(self.clock.now_ms()).max(0);
        let delay = Duration::from_millis(delay_ms as u64);
        let tx = self.tx.clone();

        debug!(?purpose, at_ms, delay_ms, "arranging wake-up");

        // Abort the old task before spawning so it cannot deliver in between.
        self.cancel(purpose)?;
        let task = rt.spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(?purpose, "delivering wake-up");
            if tx.send(Command::from(token)).is_err() {
                warn!(?purpose, error = %HostError::ChannelClosed, "wake-up dropped");
            }
        });
        self.install(purpose, task)
    }

    fn arrange_repeating(&self, period: Duration, token: WakeToken) -> Result<(), HostError> {
        let rt = self.runtime()?;
        let purpose = token.purpose();
        let tx = self.tx.clone();

        debug!(?purpose, period_ms = period.as_millis() as u64, "arranging recurring wake-up");

        self.cancel(purpose)?;
        let task = rt.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Command::from(token.clone())).is_err() {
                    break;
                }
            }
        });
        self.install(purpose, task)
    }

    fn cancel(&self, purpose: WakePurpose) -> Result<(), HostError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| HostError::Wake("slot table poisoned".into()))?;
        if let Some(old) = slots.remove(&purpose) {
            old.abort();
            debug!(?purpose, "wake-up cancelled");
        }
        Ok(())
    }
}

impl Drop for TokioWakeHost {
    fn drop(&mut self) {
        if let Ok(slots) = self.slots.get_mut() {
            for (_, task) in slots.drain() {
                task.abort();
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
