/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Monotonic time source for deadlines.
//!
//! Deadlines are persisted as absolute milliseconds, so the clock must be
//! stable across process restarts and must keep counting while the device is
//! suspended.  [`BootClock`] reads `CLOCK_BOOTTIME` on Linux (falls back to
//! `CLOCK_MONOTONIC` on other unix targets, which stops during suspend).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::error;

/// Source of "now" in the monotonic deadline domain.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary, boot-stable epoch.
    fn now_ms(&self) -> i64;
}

// ── BootClock ─────────────────────────────────────────────────────────────────

/// Milliseconds since boot, including time spent suspended.
#[derive(Debug, Default, Clone, Copy)]
pub struct BootClock;

#[cfg(target_os = "linux")]
const CLOCK_ID: libc::clockid_t = libc::CLOCK_BOOTTIME;

#[cfg(not(target_os = "linux"))]
const CLOCK_ID: libc::clockid_t = libc::CLOCK_MONOTONIC;

impl Clock for BootClock {
    fn now_ms(&self) -> i64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec and CLOCK_ID is a clock
        // supported on this target.
        let rc = unsafe { libc::clock_gettime(CLOCK_ID, &mut ts) };
        let result = if rc == 0 {
            Ok(ts)
        } else {
            Err(std::io::Error::last_os_error())
        };
        timespec_to_ms(result)
    }
}

/// Converts a `clock_gettime` result to milliseconds.  A failed read is
/// logged and yields 0, which makes every pending deadline look overdue.
fn timespec_to_ms(result: std::io::Result<libc::timespec>) -> i64 {
    match result {
        Ok(ts) => (ts.tv_sec as i64)
            .saturating_mul(1_000)
            .saturating_add(ts.tv_nsec as i64 / 1_000_000),
        Err(e) => {
            error!(error = %e, "clock_gettime failed, pending deadlines will look overdue");
            0
        }
    }
}

// ── ManualClock ───────────────────────────────────────────────────────────────

/// Clock advanced by hand.  Clones share the same instant.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ── TokioClock ────────────────────────────────────────────────────────────────

/// Milliseconds elapsed on the tokio clock since construction, offset by
/// `base_ms`.
///
/// Follows `tokio::time::pause()` / `advance()`, which makes it the clock of
/// choice for paused-time tests of the ticker and wake host.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
    base_ms: i64,
}

impl TokioClock {
    pub fn new(base_ms: i64) -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            base_ms,
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        let elapsed = self.origin.elapsed().as_millis();
        self.base_ms
            .saturating_add(i64::try_from(elapsed).unwrap_or(i64::MAX))
    }
}
