/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The closed set of requests the engine understands.

use tracing::warn;

use super::EngineError;
use crate::deadline::TimerId;
use crate::host::WakeToken;
use crate::ticker::TickRate;

/// One request for [`ReconciliationEngine::handle`](super::ReconciliationEngine::handle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start (or restart) the countdown for a widget.
    Arm {
        timer_id: TimerId,
        duration_secs: u64,
        silent: bool,
        label: Option<String>,
    },
    /// The user cancelled the countdown.
    Cancel { timer_id: TimerId },
    /// The deadline wake-up was delivered.
    Fire {
        timer_id: TimerId,
        silent: bool,
        label: Option<String>,
    },
    /// Rebuild in-memory state from the persisted set (process start).
    RestoreAll,
    /// The display surface became invisible.
    Suspend,
    /// The display surface became visible again.
    Resume,
    /// The keep-alive wake-up was delivered.
    KeepAlive,
    /// The widget itself was deleted.
    Remove { timer_id: TimerId },
    /// Forget every deadline (first install).
    ResetAll,
    /// The "timer expired" notification was dismissed or opened.
    Dismiss { timer_id: TimerId },
    /// The refresh preference changed.
    SetRefresh(TickRate),
    /// Let the next `RestoreAll` run again.
    InvalidateRestore,
}

impl Command {
    /// Builds an `Arm` from a raw widget id as hosts deliver it.
    ///
    /// # Errors
    /// [`EngineError::InvalidTimerId`] for id `0`.
    pub fn arm(
        raw_id: u32,
        duration_secs: u64,
        silent: bool,
        label: Option<String>,
    ) -> Result<Self, EngineError> {
        let Some(timer_id) = TimerId::new(raw_id) else {
            warn!(raw_id, "rejecting arm request: invalid timer id");
            return Err(EngineError::InvalidTimerId(raw_id));
        };
        Ok(Command::Arm {
            timer_id,
            duration_secs,
            silent,
            label,
        })
    }

    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Arm { .. } => "arm",
            Command::Cancel { .. } => "cancel",
            Command::Fire { .. } => "fire",
            Command::RestoreAll => "restore_all",
            Command::Suspend => "suspend",
            Command::Resume => "resume",
            Command::KeepAlive => "keep_alive",
            Command::Remove { .. } => "remove",
            Command::ResetAll => "reset_all",
            Command::Dismiss { .. } => "dismiss",
            Command::SetRefresh(_) => "set_refresh",
            Command::InvalidateRestore => "invalidate_restore",
        }
    }
}

impl From<WakeToken> for Command {
    fn from(token: WakeToken) -> Self {
        match token {
            WakeToken::Deadline {
                timer_id,
                silent,
                label,
            } => Command::Fire {
                timer_id,
                silent,
                label,
            },
            WakeToken::KeepAlive => Command::KeepAlive,
        }
    }
}
