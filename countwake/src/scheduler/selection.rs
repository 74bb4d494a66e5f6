/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure queries over a [`DeadlineSet`]: the next deadline, stale entries and
//! entries that are due right now.
//!
//! The set holds tens of entries at most, so every query is a linear scan; no
//! priority queue is kept alongside the map.

use crate::deadline::{Deadline, DeadlineSet, TimerId};

/// Entry with the smallest `at_ms`; ties go to the smallest [`TimerId`].
pub fn earliest(set: &DeadlineSet) -> Option<(TimerId, &Deadline)> {
    // BTreeMap iterates in id order and `min_by_key` keeps the first of equal
    // keys, so the id tie-break falls out of the iteration order.
    set.iter()
        .min_by_key(|(_, d)| d.at_ms)
        .map(|(id, d)| (*id, d))
}

/// Removes every entry whose deadline lies more than `grace_ms` before
/// `now_ms`.  Returns the removed ids in ascending order.
pub fn sweep_stale(set: &mut DeadlineSet, now_ms: i64, grace_ms: i64) -> Vec<TimerId> {
    let cutoff = now_ms.saturating_sub(grace_ms);
    let stale: Vec<TimerId> = set
        .iter()
        .filter(|(_, d)| d.at_ms < cutoff)
        .map(|(id, _)| *id)
        .collect();
    for id in &stale {
        set.remove(id);
    }
    stale
}

/// Ids of entries that are due but still inside the grace window:
/// `now_ms - grace_ms <= at_ms <= now_ms`.
pub fn due_within_grace(set: &DeadlineSet, now_ms: i64, grace_ms: i64) -> Vec<TimerId> {
    let cutoff = now_ms.saturating_sub(grace_ms);
    set.iter()
        .filter(|(_, d)| d.at_ms >= cutoff && d.is_due(now_ms))
        .map(|(id, _)| *id)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
