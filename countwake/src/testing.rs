/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Recording implementations of the host traits.
//!
//! Used by the unit tests, the integration tests under `tests/`, and by hosts
//! that want to observe the engine without a real platform behind it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::deadline::TimerId;
use crate::host::{
    AlertSettings, HostControl, HostError, Notification, Notifier, Sound, TimerDisplay, WakeHost,
    WakePurpose, WakeToken,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ── Wake host ─────────────────────────────────────────────────────────────────

/// One call made against [`RecordingWakeHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeCall {
    Arrange { at_ms: i64, token: WakeToken },
    ArrangeRepeating { period: Duration, token: WakeToken },
    Cancel(WakePurpose),
}

/// What is currently armed for one purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Armed {
    At { at_ms: i64, token: WakeToken },
    Every { period: Duration, token: WakeToken },
}

#[derive(Debug, Default)]
struct WakeState {
    calls: Vec<WakeCall>,
    armed: HashMap<WakePurpose, Armed>,
    fail: bool,
}

/// Wake host that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingWakeHost {
    state: Mutex<WakeState>,
}

impl RecordingWakeHost {
    pub fn calls(&self) -> Vec<WakeCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    pub fn armed(&self, purpose: WakePurpose) -> Option<Armed> {
        lock(&self.state).armed.get(&purpose).cloned()
    }

    /// The outstanding deadline wake-up as `(at_ms, token)`.
    pub fn deadline_wake(&self) -> Option<(i64, WakeToken)> {
        match self.armed(WakePurpose::Deadline) {
            Some(Armed::At { at_ms, token }) => Some((at_ms, token)),
            _ => None,
        }
    }

    pub fn keepalive_armed(&self) -> bool {
        self.armed(WakePurpose::KeepAlive).is_some()
    }

    /// Makes every following call fail.
    pub fn set_failing(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    fn record(&self, call: WakeCall) -> Result<(), HostError> {
        let mut state = lock(&self.state);
        state.calls.push(call.clone());
        if state.fail {
            return Err(HostError::Wake("injected failure".into()));
        }
        match call {
            WakeCall::Arrange { at_ms, token } => {
                state.armed.insert(token.purpose(), Armed::At { at_ms, token });
            }
            WakeCall::ArrangeRepeating { period, token } => {
                state
                    .armed
                    .insert(token.purpose(), Armed::Every { period, token });
            }
            WakeCall::Cancel(purpose) => {
                state.armed.remove(&purpose);
            }
        }
        Ok(())
    }
}

impl WakeHost for RecordingWakeHost {
    fn arrange(&self, at_ms: i64, token: WakeToken) -> Result<(), HostError> {
        self.record(WakeCall::Arrange { at_ms, token })
    }

    fn arrange_repeating(&self, period: Duration, token: WakeToken) -> Result<(), HostError> {
        self.record(WakeCall::ArrangeRepeating { period, token })
    }

    fn cancel(&self, purpose: WakePurpose) -> Result<(), HostError> {
        self.record(WakeCall::Cancel(purpose))
    }
}

// ── Notifier ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Notification>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn posted(&self) -> Vec<Notification> {
        lock(&self.posted).clone()
    }

    pub fn count_for(&self, timer_id: TimerId) -> usize {
        lock(&self.posted)
            .iter()
            .filter(|n| n.timer_id == timer_id)
            .count()
    }

    pub fn set_failing(&self, fail: bool) {
        *lock(&self.fail) = fail;
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), HostError> {
        lock(&self.posted).push(notification.clone());
        if *lock(&self.fail) {
            return Err(HostError::Notify("injected failure".into()));
        }
        Ok(())
    }
}

// ── Display ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Time(TimerId, String),
    Uninitialized(TimerId),
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingDisplay {
    pub fn events(&self) -> Vec<DisplayEvent> {
        lock(&self.events).clone()
    }

    /// Rendered `HH:MM:SS` values for one timer, in order.
    pub fn times_for(&self, timer_id: TimerId) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Time(id, text) if *id == timer_id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_for(&self, timer_id: TimerId) -> Option<DisplayEvent> {
        lock(&self.events)
            .iter()
            .rev()
            .find(|e| match e {
                DisplayEvent::Time(id, _) | DisplayEvent::Uninitialized(id) => *id == timer_id,
            })
            .cloned()
    }
}

impl TimerDisplay for RecordingDisplay {
    fn render_time(&self, timer_id: TimerId, text: &str) {
        lock(&self.events).push(DisplayEvent::Time(timer_id, text.to_string()));
    }

    fn render_uninitialized(&self, timer_id: TimerId) {
        lock(&self.events).push(DisplayEvent::Uninitialized(timer_id));
    }
}

// ── Host control & settings ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingHostControl {
    idle_signals: AtomicUsize,
}

impl RecordingHostControl {
    pub fn idle_signals(&self) -> usize {
        self.idle_signals.load(Ordering::SeqCst)
    }
}

impl HostControl for RecordingHostControl {
    fn background_idle(&self) {
        self.idle_signals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Alert preferences fixed at construction.
#[derive(Debug, Clone)]
pub struct FixedSettings {
    pub vibrate: bool,
    pub insistent: bool,
    pub ringtone: String,
}

impl Default for FixedSettings {
    fn default() -> Self {
        Self {
            vibrate: true,
            insistent: false,
            ringtone: "default".to_string(),
        }
    }
}

impl AlertSettings for FixedSettings {
    fn vibrate(&self) -> bool {
        self.vibrate
    }

    fn insistent(&self) -> bool {
        self.insistent
    }

    fn sound(&self, silent: bool) -> Sound {
        if silent {
            Sound::Silent
        } else {
            Sound::Ringtone(self.ringtone.clone())
        }
    }
}
