/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data structures: timer identity, deadlines and the deadline set.
//!
//! ```text
//! Arm(id, secs)  ──►  Deadline { at_ms }  ──►  DeadlineSet  ──►  WakeScheduler
//!                      ↑ absolute, monotonic      ↑ single source of truth
//! ```
//!
//! # Time representation
//! A deadline is always an **absolute** instant in the monotonic clock domain
//! (milliseconds, see [`Clock`](crate::clock::Clock)).  Durations in seconds
//! only exist at the `Arm` boundary, where they are converted exactly once.
//! Wall-clock time is never stored.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;

// ── TimerId ───────────────────────────────────────────────────────────────────

/// Identifier of one widget instance.
///
/// Always non-zero: `0` was used as the "no widget" sentinel by hosts, so the
/// type makes it unrepresentable instead of checking for it everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(NonZeroU32);

impl TimerId {
    /// Returns `None` for `0`.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(TimerId)
    }

    /// The raw integer value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Deadline ──────────────────────────────────────────────────────────────────

/// One pending expiry: an absolute monotonic instant plus alert metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline {
    /// Expiry instant in monotonic milliseconds.
    pub at_ms: i64,

    /// Suppress the ringtone when this deadline fires.
    pub silent: bool,

    /// User-supplied description, shown in the notification title.
    pub label: Option<String>,
}

impl Deadline {
    pub fn new(at_ms: i64, silent: bool, label: Option<String>) -> Self {
        Self {
            at_ms,
            silent,
            label,
        }
    }

    /// Milliseconds left until expiry, clamped at zero.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.at_ms.saturating_sub(now_ms).max(0)
    }

    /// `true` once `now_ms` has reached the expiry instant.
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.at_ms <= now_ms
    }
}

// ── DeadlineSet ───────────────────────────────────────────────────────────────

/// All pending deadlines keyed by timer.
///
/// `BTreeMap` (not `HashMap`) so iteration is ordered by `TimerId`, which keeps
/// the earliest-deadline tie-break and the persisted file deterministic.
pub type DeadlineSet = BTreeMap<TimerId, Deadline>;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_id_rejects_zero() {
        assert!(TimerId::new(0).is_none());
        assert_eq!(TimerId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn timer_id_orders_numerically() {
        let a = TimerId::new(2).unwrap();
        let b = TimerId::new(10).unwrap();
        assert!(a < b);
        assert_eq!(b.to_string(), "10");
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let d = Deadline::new(5_000, false, None);
        assert_eq!(d.remaining_ms(1_000), 4_000);
        assert_eq!(d.remaining_ms(5_000), 0);
        assert_eq!(d.remaining_ms(9_000), 0);
    }

    #[test]
    fn due_at_and_after_expiry() {
        let d = Deadline::new(5_000, true, Some("tea".into()));
        assert!(!d.is_due(4_999));
        assert!(d.is_due(5_000));
        assert!(d.is_due(5_001));
    }
}
