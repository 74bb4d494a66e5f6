/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure countdown arithmetic: remaining whole seconds and `HH:MM:SS` text.
//!
//! Free functions so the debounce logic in [`Countdown`](super::Countdown)
//! and the tests can use them without a running ticker.

/// Whole seconds left until `at_ms`, truncated, never negative.
pub fn remaining_secs(at_ms: i64, now_ms: i64) -> i64 {
    at_ms.saturating_sub(now_ms).max(0) / 1_000
}

/// `HH:MM:SS` for a second count.  Hours are not wrapped, so 100 h renders
/// as `100:00:00`.
pub fn format_hms(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3_600;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_truncates_partial_seconds() {
        assert_eq!(remaining_secs(5_000, 0), 5);
        assert_eq!(remaining_secs(5_000, 1), 4);
        assert_eq!(remaining_secs(5_000, 4_001), 0);
    }

    #[test]
    fn remaining_never_negative() {
        assert_eq!(remaining_secs(1_000, 9_000), 0);
        assert_eq!(remaining_secs(i64::MIN, i64::MAX), 0);
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(61), "00:01:01");
        assert_eq!(format_hms(3_600 + 23 * 60 + 7), "01:23:07");
    }

    #[test]
    fn hours_are_not_wrapped() {
        assert_eq!(format_hms(100 * 3_600), "100:00:00");
    }
}
