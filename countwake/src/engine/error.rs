/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for the reconciliation engine.
//!
//! Only invalid input is an error.  Everything else the engine can run into
//! (unknown timer ids, wake-ups without a matching deadline, persistence or
//! host failures) is logged and absorbed, because the deadline set must keep
//! converging no matter which collaborator misbehaves.
//!
//! | Variant | Raised by |
//! |---|---|
//! | `InvalidTimerId` | [`Command::arm`](super::Command::arm) |
//! | `InvalidDuration` | `Arm` with a zero or overflowing duration |
//! | `Stopped` | [`EngineHandle::send`](super::EngineHandle::send) after shutdown |

use thiserror::Error;

use crate::deadline::TimerId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Timer ids start at 1.
    #[error("invalid timer id {0}: timer ids start at 1")]
    InvalidTimerId(u32),

    /// The duration is zero or does not fit the monotonic clock domain.
    #[error("invalid duration for timer {timer_id}: {secs}s")]
    InvalidDuration { timer_id: TimerId, secs: u64 },

    /// The engine task has shut down; the command was not delivered.
    #[error("engine is not running")]
    Stopped,
}
