/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Interfaces to the host platform.
//!
//! The engine never talks to the platform directly.  Everything it consumes
//! (wake-ups, notifications, alert preferences, the display surface, the
//! background-activity switch) is a trait defined here, so the same engine
//! runs against the in-process [`TokioWakeHost`] or a recording fake in tests.
//!
//! ```text
//!                 ┌────────────── ReconciliationEngine ──────────────┐
//!  WakeHost ◄─────┤ arrange / arrange_repeating / cancel              │
//!  Notifier ◄─────┤ notify(Notification)                              │
//!  AlertSettings ─► vibrate / insistent / sound(silent)               │
//!  TimerDisplay ◄─┤ render_time / render_uninitialized (from tickers) │
//!  HostControl ◄──┤ background_idle                                   │
//!                 └───────────────────────────────────────────────────┘
//! ```

pub mod tokio_wake;

pub use tokio_wake::TokioWakeHost;

use std::time::Duration;

use thiserror::Error;

use crate::deadline::TimerId;
use crate::engine::Command;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure reported by a host collaborator.
///
/// The engine logs these at the call site and carries on; they never abort a
/// reconciliation pass.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("wake primitive failed: {0}")]
    Wake(String),

    #[error("notification primitive failed: {0}")]
    Notify(String),

    /// The receiving side of the engine command channel is gone.
    #[error("engine channel closed")]
    ChannelClosed,
}

// ── Wake primitive ────────────────────────────────────────────────────────────

/// Why a wake-up was arranged.  Each purpose owns one independent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakePurpose {
    /// The single wake-up for the earliest pending deadline.
    Deadline,
    /// The recurring safety wake-up that re-runs reconciliation.
    KeepAlive,
}

/// Opaque payload handed back by the host when a wake-up is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeToken {
    Deadline {
        timer_id: TimerId,
        silent: bool,
        label: Option<String>,
    },
    KeepAlive,
}

impl WakeToken {
    pub fn purpose(&self) -> WakePurpose {
        match self {
            WakeToken::Deadline { .. } => WakePurpose::Deadline,
            WakeToken::KeepAlive => WakePurpose::KeepAlive,
        }
    }
}

/// Platform facility that delivers a token at-or-after a requested instant.
///
/// Arranging a token replaces whatever was arranged for the same
/// [`WakePurpose`]; hosts must never deliver before `at_ms`.
pub trait WakeHost: Send + Sync {
    /// One-shot wake-up at `at_ms` (monotonic domain).
    fn arrange(&self, at_ms: i64, token: WakeToken) -> Result<(), HostError>;

    /// Recurring wake-up every `period`, first delivery one period from now.
    fn arrange_repeating(&self, period: Duration, token: WakeToken) -> Result<(), HostError>;

    /// Drop the wake-up arranged for `purpose`, if any.
    fn cancel(&self, purpose: WakePurpose) -> Result<(), HostError>;
}

// ── Notification primitive ────────────────────────────────────────────────────

/// Audible part of an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sound {
    /// Ringtone reference understood by the host (URI, file name, ...).
    Ringtone(String),
    /// Explicit "no sound" marker.
    Silent,
}

/// Everything the host needs to post the "timer expired" alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub timer_id: TimerId,
    pub title: String,
    pub sound: Sound,
    /// On/off durations in milliseconds, `None` when vibration is disabled.
    pub vibration: Option<&'static [u64]>,
    /// Repeat the sound until the user reacts.
    pub insistent: bool,
    /// Remove the notification once the user opens it.
    pub auto_cancel: bool,
    /// Command to send back when the notification is dismissed or clicked.
    pub dismiss_action: Command,
}

pub trait Notifier: Send + Sync {
    /// Post `notification`, replacing any earlier one for the same timer.
    fn notify(&self, notification: &Notification) -> Result<(), HostError>;
}

// ── Settings, display, host control ───────────────────────────────────────────

/// Read-only alert preferences.
pub trait AlertSettings: Send + Sync {
    fn vibrate(&self) -> bool;
    fn insistent(&self) -> bool;
    /// Ringtone for an audible timer, [`Sound::Silent`] for a silent one.
    fn sound(&self, silent: bool) -> Sound;
}

/// The widget surface.  Called from ticker tasks, hence `Send + Sync`.
pub trait TimerDisplay: Send + Sync {
    /// Show `text` (`HH:MM:SS`) on the widget for `timer_id`.
    fn render_time(&self, timer_id: TimerId, text: &str);

    /// Show the "no timer armed" state.
    fn render_uninitialized(&self, timer_id: TimerId);
}

pub trait HostControl: Send + Sync {
    /// No deadline is pending any more; background activity may stop.
    fn background_idle(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_purpose_matches_variant() {
        let id = TimerId::new(3).unwrap();
        let token = WakeToken::Deadline {
            timer_id: id,
            silent: false,
            label: None,
        };
        assert_eq!(token.purpose(), WakePurpose::Deadline);
        assert_eq!(WakeToken::KeepAlive.purpose(), WakePurpose::KeepAlive);
    }

    #[test]
    fn host_error_messages() {
        assert_eq!(
            HostError::Wake("gone".into()).to_string(),
            "wake primitive failed: gone"
        );
        assert_eq!(HostError::ChannelClosed.to_string(), "engine channel closed");
    }
}
