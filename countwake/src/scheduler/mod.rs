/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Single-wake-up scheduling for the deadline set.
//!
//! [`WakeScheduler`] coalesces any number of pending deadlines onto **one**
//! external wake-up, always aimed at the earliest deadline, plus a recurring
//! keep-alive wake-up while anything is pending.
//!
//! # Invariants
//!
//! | Set | Deadline wake | Keep-alive wake |
//! |---|---|---|
//! | empty | none | none |
//! | non-empty | exactly one, at `min(at_ms)` | one, every [`KEEPALIVE_INTERVAL`] |
//!
//! Re-arming is always cancel-then-set.  The scheduler remembers what it last
//! arranged, so reconciling an unchanged set makes no host calls at all.
//!
//! # Keep-alive
//! The host may silently drop an arranged wake-up (process killed, alarm
//! cleared by the OS).  Each keep-alive delivery calls
//! [`invalidate`](WakeScheduler::invalidate) before reconciling, so the
//! deadline wake is re-arranged from scratch even if the scheduler believes
//! it is still in place.
//!
//! # Example
//! ```rust,ignore
//! let mut scheduler = WakeScheduler::new(Arc::new(host));
//! let target = scheduler.reconcile(&set);
//! ```

pub mod selection;

pub use selection::{due_within_grace, earliest, sweep_stale};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::deadline::{DeadlineSet, TimerId};
use crate::host::{WakeHost, WakePurpose, WakeToken};

// ── Constants ─────────────────────────────────────────────────────────────────

/// How far in the past a deadline may lie before a reconcile pass drops it
/// instead of firing it.  Applies uniformly to every pass.
pub const STALE_GRACE_MS: i64 = 2_000;

/// Period of the safety wake-up that re-runs reconciliation.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

// ── WakeScheduler ─────────────────────────────────────────────────────────────

/// Deadline wake-up currently believed to be armed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArmedWake {
    at_ms: i64,
    token: WakeToken,
}

/// Keeps the host's wake-up arrangement in line with a [`DeadlineSet`].
pub struct WakeScheduler {
    host: Arc<dyn WakeHost>,
    deadline: Option<ArmedWake>,
    keepalive: bool,
    /// `false` until the first successful pass and after `invalidate()`:
    /// the host's state is unknown, so everything is re-sent.
    synced: bool,
}

impl WakeScheduler {
    pub fn new(host: Arc<dyn WakeHost>) -> Self {
        Self {
            host,
            deadline: None,
            keepalive: false,
            synced: false,
        }
    }

    /// Makes `set` the source of the external arrangement.
    ///
    /// Returns the timer the deadline wake-up now targets, `None` when the set
    /// is empty.  Host failures are logged; the next pass retries them.
    pub fn reconcile(&mut self, set: &DeadlineSet) -> Option<(TimerId, i64)> {
        let target = earliest(set).map(|(timer_id, d)| ArmedWake {
            at_ms: d.at_ms,
            token: WakeToken::Deadline {
                timer_id,
                silent: d.silent,
                label: d.label.clone(),
            },
        });
        let result = target.as_ref().and_then(Self::target_of);

        let want_keepalive = target.is_some();
        if self.synced && self.deadline == target && self.keepalive == want_keepalive {
            debug!(target = ?result, "wake-up arrangement unchanged");
            return result;
        }

        let mut ok = true;
        match target {
            None => {
                ok &= self.cancel(WakePurpose::Deadline);
                ok &= self.cancel(WakePurpose::KeepAlive);
                self.deadline = None;
                self.keepalive = false;
                info!("no pending deadlines, wake-ups cancelled");
            }
            Some(wake) => {
                if !self.synced || self.deadline.as_ref() != Some(&wake) {
                    ok &= self.cancel(WakePurpose::Deadline);
                    match self.host.arrange(wake.at_ms, wake.token.clone()) {
                        Ok(()) => {
                            info!(target = ?result, "deadline wake-up arranged");
                            self.deadline = Some(wake);
                        }
                        Err(e) => {
                            warn!(error = %e, "cannot arrange deadline wake-up");
                            self.deadline = None;
                            ok = false;
                        }
                    }
                }
                if !self.synced || !self.keepalive {
                    match self
                        .host
                        .arrange_repeating(KEEPALIVE_INTERVAL, WakeToken::KeepAlive)
                    {
                        Ok(()) => self.keepalive = true,
                        Err(e) => {
                            warn!(error = %e, "cannot arrange keep-alive wake-up");
                            self.keepalive = false;
                            ok = false;
                        }
                    }
                }
            }
        }

        self.synced = ok;
        result
    }

    /// Forget what was arranged; the next [`reconcile`](Self::reconcile)
    /// re-sends everything.
    pub fn invalidate(&mut self) {
        self.synced = false;
    }

    /// Target of the deadline wake-up as last arranged.
    pub fn armed_target(&self) -> Option<(TimerId, i64)> {
        self.deadline.as_ref().and_then(Self::target_of)
    }

    fn target_of(wake: &ArmedWake) -> Option<(TimerId, i64)> {
        match &wake.token {
            WakeToken::Deadline { timer_id, .. } => Some((*timer_id, wake.at_ms)),
            WakeToken::KeepAlive => None,
        }
    }

    fn cancel(&self, purpose: WakePurpose) -> bool {
        match self.host.cancel(purpose) {
            Ok(()) => true,
            Err(e) => {
                warn!(?purpose, error = %e, "cannot cancel wake-up");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Deadline;
    use crate::testing::{Armed, RecordingWakeHost, WakeCall};

    fn id(raw: u32) -> TimerId {
        TimerId::new(raw).unwrap()
    }

    fn scheduler() -> (WakeScheduler, Arc<RecordingWakeHost>) {
        let host = Arc::new(RecordingWakeHost::default());
        (WakeScheduler::new(host.clone()), host)
    }

    fn set_of(entries: &[(u32, i64)]) -> DeadlineSet {
        entries
            .iter()
            .map(|&(raw, at)| (id(raw), Deadline::new(at, false, None)))
            .collect()
    }

    #[test]
    fn arms_earliest_deadline_with_payload() {
        let (mut sched, host) = scheduler();
        let mut set = set_of(&[(1, 9_000), (2, 3_000)]);
        set.insert(id(5), Deadline::new(2_000, true, Some("Eggs".into())));

        assert_eq!(sched.reconcile(&set), Some((id(5), 2_000)));
        assert_eq!(
            host.deadline_wake(),
            Some((
                2_000,
                WakeToken::Deadline {
                    timer_id: id(5),
                    silent: true,
                    label: Some("Eggs".into()),
                }
            ))
        );
        assert_eq!(
            host.armed(WakePurpose::KeepAlive),
            Some(Armed::Every {
                period: KEEPALIVE_INTERVAL,
                token: WakeToken::KeepAlive,
            })
        );
    }

    #[test]
    fn rearm_is_cancel_then_set() {
        let (mut sched, host) = scheduler();
        sched.reconcile(&set_of(&[(1, 9_000)]));
        host.clear_calls();

        sched.reconcile(&set_of(&[(1, 9_000), (2, 4_000)]));
        let calls = host.calls();
        assert_eq!(calls.len(), 2, "keep-alive is left alone: {calls:?}");
        assert_eq!(calls[0], WakeCall::Cancel(WakePurpose::Deadline));
        assert!(matches!(calls[1], WakeCall::Arrange { at_ms: 4_000, .. }));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let (mut sched, host) = scheduler();
        let set = set_of(&[(3, 7_000), (4, 8_000)]);

        let first = sched.reconcile(&set);
        let armed_after_first = host.deadline_wake();
        let calls_after_first = host.calls().len();

        let second = sched.reconcile(&set);
        assert_eq!(first, second);
        assert_eq!(host.deadline_wake(), armed_after_first);
        assert_eq!(host.calls().len(), calls_after_first, "no duplicate registrations");
    }

    #[test]
    fn empty_set_cancels_everything() {
        let (mut sched, host) = scheduler();
        sched.reconcile(&set_of(&[(1, 1_000)]));
        assert_eq!(sched.reconcile(&DeadlineSet::new()), None);
        assert!(host.deadline_wake().is_none());
        assert!(!host.keepalive_armed());
        assert_eq!(sched.armed_target(), None);
    }

    #[test]
    fn first_pass_on_empty_set_clears_leftovers() {
        // A wake-up left behind by a previous process must not survive.
        let (mut sched, host) = scheduler();
        sched.reconcile(&DeadlineSet::new());
        assert_eq!(
            host.calls(),
            vec![
                WakeCall::Cancel(WakePurpose::Deadline),
                WakeCall::Cancel(WakePurpose::KeepAlive),
            ]
        );
    }

    #[test]
    fn invalidate_forces_full_rearm() {
        let (mut sched, host) = scheduler();
        let set = set_of(&[(1, 5_000)]);
        sched.reconcile(&set);
        host.clear_calls();

        sched.invalidate();
        sched.reconcile(&set);
        let calls = host.calls();
        assert!(calls.contains(&WakeCall::Cancel(WakePurpose::Deadline)));
        assert!(calls
            .iter()
            .any(|c| matches!(c, WakeCall::Arrange { at_ms: 5_000, .. })));
        assert!(calls
            .iter()
            .any(|c| matches!(c, WakeCall::ArrangeRepeating { .. })));
    }

    #[test]
    fn host_failure_is_retried_on_next_pass() {
        let (mut sched, host) = scheduler();
        let set = set_of(&[(1, 5_000)]);

        host.set_failing(true);
        sched.reconcile(&set);
        assert!(host.deadline_wake().is_none());

        host.set_failing(false);
        sched.reconcile(&set);
        assert_eq!(host.deadline_wake().map(|(at, _)| at), Some(5_000));
    }

    #[test]
    fn single_wake_invariant_over_arm_cancel_sequence() {
        let (mut sched, host) = scheduler();
        let mut set = DeadlineSet::new();
        let ops: &[(bool, u32, i64)] = &[
            (true, 1, 50_000),
            (true, 2, 20_000),
            (true, 3, 20_000),
            (false, 2, 0),
            (true, 4, 10_000),
            (false, 4, 0),
            (false, 1, 0),
            (false, 3, 0),
        ];

        for &(arm, raw, at) in ops {
            if arm {
                set.insert(id(raw), Deadline::new(at, false, None));
            } else {
                set.remove(&id(raw));
            }
            sched.reconcile(&set);

            let expected = earliest(&set).map(|(i, d)| (i, d.at_ms));
            let actual = host.deadline_wake().and_then(|(at, token)| match token {
                WakeToken::Deadline { timer_id, .. } => Some((timer_id, at)),
                WakeToken::KeepAlive => None,
            });
            assert_eq!(actual, expected);
            assert_eq!(host.keepalive_armed(), !set.is_empty());
        }
    }
}
