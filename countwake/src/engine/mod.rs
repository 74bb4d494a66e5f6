/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Reconciliation engine: the single owner of the deadline set.
//!
//! Every external event becomes a [`Command`] and goes through
//! [`ReconciliationEngine::handle`].  Each mutating command follows the same
//! order:
//!
//! ```text
//! mutate DeadlineSet ─► DeadlineStore::save ─► stale sweep ─► WakeScheduler::reconcile
//!                                                          └► start / stop tickers
//! ```
//!
//! Saving happens before the wake-up is touched.  A crash in between leaves
//! "wake-up pending, entry gone" (the late wake-up finds nothing and is a
//! no-op) rather than "entry saved, nothing armed" (a timer that never rings).
//!
//! # Ownership model
//! The engine holds the set and the ticker map by value and is driven through
//! `&mut self`, so mutations are serialized by construction.  Concurrent
//! producers (wake deliveries, user requests) go through
//! [`EngineHandle`], which owns the engine inside one tokio task.
//!
//! # Time
//! Deadlines are absolute monotonic milliseconds.  `Arm` is the only place a
//! duration is converted, and it adds [`ARM_COMPENSATION_MS`] once.

pub mod command;
pub mod error;
pub mod handle;

pub use command::Command;
pub use error::EngineError;
pub use handle::{EngineHandle, EngineTask};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::deadline::{Deadline, DeadlineSet, TimerId};
use crate::host::{
    AlertSettings, HostControl, Notification, Notifier, TimerDisplay, WakeHost,
};
use crate::scheduler::{due_within_grace, sweep_stale, WakeScheduler, STALE_GRACE_MS};
use crate::store::DeadlineStore;
use crate::ticker::{CountdownTicker, TickRate, TickerState};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Added to every armed deadline to absorb wake-up dispatch latency, so a
/// slightly late wake-up never leaves a false residual second on display.
///
/// Added at arm time only; wake delivery never subtracts it.
pub const ARM_COMPENSATION_MS: i64 = 500;

/// Vibration pattern of the expiry alert: off/on durations in milliseconds.
pub const VIBRATION_PATTERN: &[u64] = &[0, 500, 200, 500, 200, 750];

/// Notification title suffix.
const EXPIRED_TITLE: &str = "Timer expired";

// ── Collaborators ─────────────────────────────────────────────────────────────

/// Everything the engine consumes from outside.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn DeadlineStore>,
    pub wake: Arc<dyn WakeHost>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<dyn AlertSettings>,
    pub display: Arc<dyn TimerDisplay>,
    pub host: Arc<dyn HostControl>,
    pub clock: Arc<dyn Clock>,
}

// ── ReconciliationEngine ──────────────────────────────────────────────────────

pub struct ReconciliationEngine {
    store: Arc<dyn DeadlineStore>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn AlertSettings>,
    display: Arc<dyn TimerDisplay>,
    host: Arc<dyn HostControl>,
    clock: Arc<dyn Clock>,
    scheduler: WakeScheduler,

    /// Source of truth, mirrored to `store` after every change.
    deadlines: DeadlineSet,
    /// Derived cache; may lag behind `deadlines` until `RestoreAll`.
    tickers: BTreeMap<TimerId, CountdownTicker>,

    rate: TickRate,
    suspended: bool,
    restored: bool,
}

impl ReconciliationEngine {
    pub fn new(collaborators: Collaborators, rate: TickRate) -> Self {
        let Collaborators {
            store,
            wake,
            notifier,
            settings,
            display,
            host,
            clock,
        } = collaborators;
        Self {
            store,
            notifier,
            settings,
            display,
            host,
            clock,
            scheduler: WakeScheduler::new(wake),
            deadlines: DeadlineSet::new(),
            tickers: BTreeMap::new(),
            rate,
            suspended: false,
            restored: false,
        }
    }

    // ── Public entry point ────────────────────────────────────────────────────

    /// Applies one command.
    ///
    /// Any command other than `RestoreAll` / `InvalidateRestore` restores the
    /// persisted set first if that has not happened yet, so nothing written by
    /// an earlier process is overwritten by a partial in-memory set.
    ///
    /// # Errors
    /// Only for invalid input; see [`EngineError`].
    pub fn handle(&mut self, command: Command) -> Result<(), EngineError> {
        debug!(command = command.name(), "handling command");

        match command {
            Command::RestoreAll => {
                self.restore_all();
                return Ok(());
            }
            Command::InvalidateRestore => {
                self.invalidate_restore();
                return Ok(());
            }
            _ => self.restore_all(),
        }

        match command {
            Command::Arm {
                timer_id,
                duration_secs,
                silent,
                label,
            } => self.arm(timer_id, duration_secs, silent, label)?,
            Command::Cancel { timer_id } => self.cancel(timer_id),
            Command::Fire {
                timer_id,
                silent,
                label,
            } => self.fire(timer_id, silent, label),
            Command::Suspend => self.suspend(),
            Command::Resume => self.resume(),
            Command::KeepAlive => self.keep_alive(),
            Command::Remove { timer_id } => self.remove(timer_id),
            Command::ResetAll => self.reset_all(),
            Command::Dismiss { timer_id } => self.dismiss(timer_id),
            Command::SetRefresh(rate) => self.set_refresh(rate),
            Command::RestoreAll | Command::InvalidateRestore => {}
        }
        Ok(())
    }

    // ── Operations ────────────────────────────────────────────────────────────

    /// Arms `timer_id` to expire `duration_secs` from now.
    ///
    /// # Errors
    /// [`EngineError::InvalidDuration`] for a zero or overflowing duration;
    /// nothing is changed in that case.
    pub fn arm(
        &mut self,
        timer_id: TimerId,
        duration_secs: u64,
        silent: bool,
        label: Option<String>,
    ) -> Result<(), EngineError> {
        let now = self.clock.now_ms();
        let at_ms = Self::deadline_after(now, duration_secs).ok_or_else(|| {
            warn!(timer_id = %timer_id, duration_secs, "rejecting arm request: invalid duration");
            EngineError::InvalidDuration {
                timer_id,
                secs: duration_secs,
            }
        })?;
        let label = label.filter(|l| !l.trim().is_empty());

        if let Some(mut old) = self.tickers.remove(&timer_id) {
            debug!(timer_id = %timer_id, "stopping previous countdown");
            old.stop();
        }

        let deadline = Deadline::new(at_ms, silent, label);
        info!(
            timer_id = %timer_id,
            duration_secs,
            at_ms,
            silent,
            label = ?deadline.label,
            "timer armed"
        );
        self.deadlines.insert(timer_id, deadline.clone());
        self.persist();
        self.reconcile();

        // The sweep cannot have removed a deadline that lies in the future.
        if self.deadlines.contains_key(&timer_id) {
            self.spawn_ticker(timer_id, deadline);
        }
        Ok(())
    }

    /// Cancels the countdown of `timer_id`; unknown ids only reset the display.
    pub fn cancel(&mut self, timer_id: TimerId) {
        match self.tickers.remove(&timer_id) {
            Some(mut ticker) => ticker.reset(),
            None => self.display.render_uninitialized(timer_id),
        }

        if self.deadlines.remove(&timer_id).is_none() {
            debug!(timer_id = %timer_id, "cancel: no pending deadline");
            return;
        }
        info!(timer_id = %timer_id, "timer cancelled");
        self.persist();
        self.reconcile();
    }

    /// Handles delivery of the deadline wake-up for `timer_id`.
    ///
    /// `silent` and `label` come from the wake token; the stored deadline is
    /// authoritative when the two differ.  Every other deadline already due
    /// within the grace window fires in the same pass.
    ///
    /// A wake-up for a deadline that is not due yet (the timer was re-armed
    /// after the token was queued) is treated like one without a deadline.
    pub fn fire(&mut self, timer_id: TimerId, silent: bool, label: Option<String>) {
        let now = self.clock.now_ms();
        match self.deadlines.get(&timer_id) {
            None => {
                info!(
                    timer_id = %timer_id,
                    silent,
                    label = ?label,
                    "wake-up without pending deadline, re-reconciling"
                );
                self.reconcile();
                return;
            }
            Some(deadline) if !deadline.is_due(now) => {
                info!(
                    timer_id = %timer_id,
                    early_ms = deadline.remaining_ms(now),
                    "wake-up before deadline, re-reconciling"
                );
                // The delivery used up whatever the host had armed.
                self.scheduler.invalidate();
                self.reconcile();
                return;
            }
            Some(_) => {}
        }

        let mut batch = vec![timer_id];
        batch.extend(
            due_within_grace(&self.deadlines, now, STALE_GRACE_MS)
                .into_iter()
                .filter(|id| *id != timer_id),
        );

        for id in batch {
            let Some(deadline) = self.deadlines.remove(&id) else {
                continue;
            };
            info!(timer_id = %id, late_ms = now - deadline.at_ms, "timer expired");
            self.post_alert(id, &deadline);

            if let Some(mut ticker) = self.tickers.remove(&id) {
                ticker.refresh();
                ticker.stop();
            }
        }

        self.persist();
        self.reconcile();

        if self.deadlines.is_empty() {
            info!("no deadlines left, background activity may stop");
            self.host.background_idle();
        }
    }

    /// Loads the persisted set and rebuilds the tickers.
    ///
    /// Runs once per process unless [`invalidate_restore`](Self::invalidate_restore)
    /// is called.  In-memory entries win over persisted ones; the set is not
    /// re-saved unless the stale sweep prunes something.
    pub fn restore_all(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;

        let loaded = self.store.load();
        let count = loaded.len();
        for (id, deadline) in loaded {
            self.deadlines.entry(id).or_insert(deadline);
        }
        self.reconcile();

        let missing: Vec<(TimerId, Deadline)> = self
            .deadlines
            .iter()
            .filter(|(id, _)| !self.tickers.contains_key(*id))
            .map(|(id, d)| (*id, d.clone()))
            .collect();
        for (id, deadline) in missing {
            self.spawn_ticker(id, deadline);
        }

        info!(
            loaded = count,
            pending = self.deadlines.len(),
            "deadlines restored"
        );
    }

    /// Allows the next [`restore_all`](Self::restore_all) to run again.
    pub fn invalidate_restore(&mut self) {
        self.restored = false;
    }

    /// Stops every ticker; the set and the wake-ups are left alone.
    pub fn suspend(&mut self) {
        self.suspended = true;
        for ticker in self.tickers.values_mut() {
            ticker.stop();
        }
        debug!(tickers = self.tickers.len(), "display suspended");
    }

    /// Restarts every ticker.
    pub fn resume(&mut self) {
        self.suspended = false;
        let rate = self.rate;
        for ticker in self.tickers.values_mut() {
            ticker.start(rate);
        }
        debug!(tickers = self.tickers.len(), "display resumed");
    }

    // ── Supplementary operations ──────────────────────────────────────────────

    /// Keep-alive delivery: assume the host lost our wake-ups and re-arm.
    pub fn keep_alive(&mut self) {
        debug!("keep-alive wake-up");
        self.scheduler.invalidate();
        self.reconcile();
    }

    /// The widget was deleted: like cancel, but nothing is rendered.
    pub fn remove(&mut self, timer_id: TimerId) {
        if let Some(mut ticker) = self.tickers.remove(&timer_id) {
            ticker.stop();
        }
        if self.deadlines.remove(&timer_id).is_some() {
            info!(timer_id = %timer_id, "widget removed, deadline dropped");
            self.persist();
            self.reconcile();
        }
    }

    /// Drops every deadline and countdown.
    pub fn reset_all(&mut self) {
        for (_, mut ticker) in std::mem::take(&mut self.tickers) {
            ticker.reset();
        }
        self.deadlines.clear();
        if let Err(e) = self.store.clear() {
            error!(error = %e, "cannot clear saved deadlines");
        }
        self.reconcile();
        info!("all deadlines reset");
        self.host.background_idle();
    }

    /// The expiry notification went away: show the idle widget, unless the
    /// timer was re-armed in the meantime.
    pub fn dismiss(&mut self, timer_id: TimerId) {
        if self.deadlines.contains_key(&timer_id) {
            debug!(timer_id = %timer_id, "dismiss ignored, timer re-armed");
            return;
        }
        self.display.render_uninitialized(timer_id);
    }

    /// Applies a new refresh rate to every running ticker.
    pub fn set_refresh(&mut self, rate: TickRate) {
        if rate == self.rate {
            return;
        }
        info!(?rate, "refresh rate changed");
        self.rate = rate;
        if self.suspended {
            return;
        }
        for ticker in self.tickers.values_mut() {
            if ticker.state() == TickerState::Running {
                ticker.start(rate);
            }
        }
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn deadlines(&self) -> &DeadlineSet {
        &self.deadlines
    }

    /// `None` when no ticker exists for `timer_id`.
    pub fn ticker_state(&self, timer_id: TimerId) -> Option<TickerState> {
        self.tickers.get(&timer_id).map(CountdownTicker::state)
    }

    pub fn tick_rate(&self) -> TickRate {
        self.rate
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// `now + secs·1000 + compensation`, `None` for zero or on overflow.
    fn deadline_after(now_ms: i64, duration_secs: u64) -> Option<i64> {
        if duration_secs == 0 {
            return None;
        }
        i64::try_from(duration_secs)
            .ok()?
            .checked_mul(1_000)?
            .checked_add(ARM_COMPENSATION_MS)?
            .checked_add(now_ms)
    }

    /// Stale sweep followed by the wake-up arrangement.
    fn reconcile(&mut self) {
        let now = self.clock.now_ms();
        let stale = sweep_stale(&mut self.deadlines, now, STALE_GRACE_MS);
        if !stale.is_empty() {
            for id in &stale {
                warn!(timer_id = %id, "dropping stale deadline");
                if let Some(mut ticker) = self.tickers.remove(id) {
                    ticker.reset();
                }
            }
            self.persist();
        }
        self.scheduler.reconcile(&self.deadlines);
    }

    /// Best-effort save: a failure is logged and the in-memory set stays
    /// authoritative.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.deadlines) {
            error!(error = %e, pending = self.deadlines.len(), "cannot save deadlines");
        }
    }

    fn spawn_ticker(&mut self, timer_id: TimerId, deadline: Deadline) {
        let mut ticker = CountdownTicker::new(
            timer_id,
            deadline,
            Arc::clone(&self.display),
            Arc::clone(&self.clock),
        );
        if !self.suspended {
            ticker.start(self.rate);
        }
        if let Some(mut old) = self.tickers.insert(timer_id, ticker) {
            old.stop();
        }
    }

    fn post_alert(&self, timer_id: TimerId, deadline: &Deadline) {
        let title = match &deadline.label {
            Some(label) => format!("{}: {}", label, EXPIRED_TITLE),
            None => EXPIRED_TITLE.to_string(),
        };
        let notification = Notification {
            timer_id,
            title,
            sound: self.settings.sound(deadline.silent),
            vibration: self.settings.vibrate().then_some(VIBRATION_PATTERN),
            insistent: self.settings.insistent(),
            auto_cancel: true,
            dismiss_action: Command::Dismiss { timer_id },
        };
        if let Err(e) = self.notifier.notify(&notification) {
            error!(timer_id = %timer_id, error = %e, "cannot post expiry notification");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
