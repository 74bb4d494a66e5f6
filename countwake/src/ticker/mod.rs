/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-timer display refresh.
//!
//! A [`CountdownTicker`] owns one tokio task that wakes at a fixed rate,
//! recomputes the remaining time of its deadline and pushes `HH:MM:SS` to the
//! [`TimerDisplay`] only when the text changed.
//!
//! ```text
//!            start()                 remaining == 0
//!  Stopped ───────────► Running ───────────────────────► Stopped
//!     ▲                   │  stop()  (display untouched)
//!     └───────────────────┤
//!     └───────────────────┘  reset() (renders "uninitialized")
//! ```
//!
//! Ticks are anchored to the instant `start()` ran (`interval_at` with
//! `MissedTickBehavior::Skip`), so a slow tick never shifts later ones.  The
//! remaining time is always derived from the absolute deadline, never from a
//! decremented counter.
//!
//! Every tick and every transition runs under the ticker's own mutex, which
//! is what makes `stop()`/`reset()` atomic with respect to an in-flight tick.

pub mod format;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, trace};

use crate::clock::Clock;
use crate::deadline::{Deadline, TimerId};
use crate::host::TimerDisplay;

use format::{format_hms, remaining_secs};

// ── Tick rate ─────────────────────────────────────────────────────────────────

/// Period of the fast refresh mode.
pub const FAST_TICK: Duration = Duration::from_millis(200);

/// Default refresh period.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// How often a running ticker re-evaluates its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickRate {
    /// 200 ms: the displayed second flips within 200 ms of the true boundary.
    Fast,
    /// A fixed period.
    Every(Duration),
}

impl TickRate {
    pub fn period(self) -> Duration {
        match self {
            TickRate::Fast => FAST_TICK,
            TickRate::Every(d) if d.is_zero() => DEFAULT_TICK,
            TickRate::Every(d) => d,
        }
    }

    /// Builds the rate from the configuration pair.
    ///
    /// `interval_secs == 0` is treated as the default one second.
    pub fn from_settings(interval_secs: u32, fast: bool) -> Self {
        if fast {
            TickRate::Fast
        } else if interval_secs == 0 {
            TickRate::Every(DEFAULT_TICK)
        } else {
            TickRate::Every(Duration::from_secs(u64::from(interval_secs)))
        }
    }
}

impl Default for TickRate {
    fn default() -> Self {
        TickRate::Every(DEFAULT_TICK)
    }
}

// ── Countdown (pure tick logic) ───────────────────────────────────────────────

/// Result of evaluating one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Text to render, `None` when the visible value did not change.
    pub render: Option<String>,
    /// The deadline has been reached; the ticker must stop.
    pub finished: bool,
}

/// Debounced countdown state, free of any timer or display.
#[derive(Debug, Clone)]
pub struct Countdown {
    at_ms: i64,
    last_emitted: Option<i64>,
}

impl Countdown {
    pub fn new(at_ms: i64) -> Self {
        Self {
            at_ms,
            last_emitted: None,
        }
    }

    /// Evaluates the countdown at `now_ms`.
    pub fn tick(&mut self, now_ms: i64) -> TickOutcome {
        let secs = remaining_secs(self.at_ms, now_ms);
        let finished = secs == 0;
        let render = if self.last_emitted == Some(secs) {
            None
        } else {
            self.last_emitted = Some(secs);
            Some(format_hms(secs))
        };
        TickOutcome { render, finished }
    }

    /// Forget the last emitted value so the next tick renders unconditionally.
    pub fn invalidate(&mut self) {
        self.last_emitted = None;
    }
}

// ── CountdownTicker ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    Stopped,
    Running,
}

/// State shared between the ticker handle and its tick task.
#[derive(Debug)]
struct Slot {
    countdown: Countdown,
    running: bool,
    /// Bumped on every start/stop so a stale task recognises it was replaced.
    generation: u64,
}

/// Display refresh driver for one timer.
pub struct CountdownTicker {
    timer_id: TimerId,
    deadline: Deadline,
    display: Arc<dyn TimerDisplay>,
    clock: Arc<dyn Clock>,
    slot: Arc<Mutex<Slot>>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTicker {
    pub fn new(
        timer_id: TimerId,
        deadline: Deadline,
        display: Arc<dyn TimerDisplay>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let slot = Slot {
            countdown: Countdown::new(deadline.at_ms),
            running: false,
            generation: 0,
        };
        Self {
            timer_id,
            deadline,
            display,
            clock,
            slot: Arc::new(Mutex::new(slot)),
            task: None,
        }
    }

    pub fn state(&self) -> TickerState {
        if self.lock().running {
            TickerState::Running
        } else {
            TickerState::Stopped
        }
    }

    /// Starts ticking at `rate`.  A running instance is stopped first.
    ///
    /// The first tick happens immediately and always renders, so a display
    /// that went stale while stopped is refreshed right away.
    pub fn start(&mut self, rate: TickRate) {
        self.halt();

        let rt = match tokio::runtime::Handle::try_current() {
            Ok(rt) => rt,
            Err(e) => {
                error!(timer_id = %self.timer_id, error = %e, "cannot start ticker outside a tokio runtime");
                return;
            }
        };

        let generation = {
            let mut slot = self.lock();
            slot.running = true;
            slot.generation += 1;
            slot.countdown.invalidate();
            slot.generation
        };

        let period = rate.period();
        let timer_id = self.timer_id;
        let slot = Arc::clone(&self.slot);
        let display = Arc::clone(&self.display);
        let clock = Arc::clone(&self.clock);

        debug!(
            timer_id = %timer_id,
            at_ms = self.deadline.at_ms,
            period_ms = period.as_millis() as u64,
            "ticker started"
        );

        self.task = Some(rt.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now(), period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut guard = match slot.lock() {
                    Ok(g) => g,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if !guard.running || guard.generation != generation {
                    break;
                }
                if Self::tick_locked(&mut guard, timer_id, clock.as_ref(), display.as_ref()) {
                    break;
                }
            }
        }));
    }

    /// Stops ticking, leaving the display as it is.
    pub fn stop(&mut self) {
        if self.halt() {
            debug!(timer_id = %self.timer_id, "ticker stopped");
        }
    }

    /// Stops ticking and shows the "uninitialized" state.
    pub fn reset(&mut self) {
        self.halt();
        let mut slot = self.lock();
        slot.countdown.invalidate();
        self.display.render_uninitialized(self.timer_id);
        debug!(timer_id = %self.timer_id, "ticker reset");
    }

    /// Evaluates one tick right now, outside the periodic schedule.
    ///
    /// Renders only if the visible value changed; stops the ticker if the
    /// deadline has been reached.
    pub fn refresh(&mut self) {
        let finished = {
            let mut slot = self.lock();
            Self::tick_locked(
                &mut slot,
                self.timer_id,
                self.clock.as_ref(),
                self.display.as_ref(),
            )
        };
        if finished {
            self.halt();
        }
    }

    /// Runs the countdown once; returns `true` when the deadline was reached
    /// (and marks the slot stopped).
    fn tick_locked(
        slot: &mut Slot,
        timer_id: TimerId,
        clock: &dyn Clock,
        display: &dyn TimerDisplay,
    ) -> bool {
        let outcome = slot.countdown.tick(clock.now_ms());
        match &outcome.render {
            Some(text) => display.render_time(timer_id, text),
            None => trace!(timer_id = %timer_id, "no visible change"),
        }
        if outcome.finished {
            slot.running = false;
            debug!(timer_id = %timer_id, "countdown reached zero");
        }
        outcome.finished
    }

    /// Marks the slot stopped and aborts the task.  Returns whether it was
    /// running.
    fn halt(&mut self) -> bool {
        let was_running = {
            let mut slot = self.lock();
            let was = slot.running;
            slot.running = false;
            slot.generation += 1;
            was
        };
        if let Some(task) = self.task.take() {
            task.abort();
        }
        was_running
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, TokioClock};
    use crate::testing::{DisplayEvent, RecordingDisplay};

    fn id(raw: u32) -> TimerId {
        TimerId::new(raw).unwrap()
    }

    // ── Countdown ─────────────────────────────────────────────────────────────

    #[test]
    fn debounce_emits_one_render_per_visible_second() {
        let mut countdown = Countdown::new(5_000);
        let mut renders = Vec::new();
        let mut now = 0;
        loop {
            let outcome = countdown.tick(now);
            if let Some(text) = outcome.render {
                renders.push(text);
            }
            if outcome.finished {
                break;
            }
            now += 200;
        }
        assert_eq!(
            renders,
            vec!["00:00:05", "00:00:04", "00:00:03", "00:00:02", "00:00:01", "00:00:00"]
        );
    }

    #[test]
    fn invalidate_forces_next_render() {
        let mut countdown = Countdown::new(10_000);
        assert!(countdown.tick(0).render.is_some());
        assert!(countdown.tick(100).render.is_none());
        countdown.invalidate();
        assert_eq!(countdown.tick(200).render.as_deref(), Some("00:00:09"));
    }

    #[test]
    fn past_deadline_finishes_on_first_tick() {
        let mut countdown = Countdown::new(1_000);
        let outcome = countdown.tick(50_000);
        assert!(outcome.finished);
        assert_eq!(outcome.render.as_deref(), Some("00:00:00"));
    }

    #[test]
    fn tick_rate_from_settings() {
        assert_eq!(TickRate::from_settings(1, true), TickRate::Fast);
        assert_eq!(TickRate::from_settings(0, false).period(), DEFAULT_TICK);
        assert_eq!(
            TickRate::from_settings(5, false).period(),
            Duration::from_secs(5)
        );
        assert_eq!(TickRate::Fast.period(), FAST_TICK);
    }

    // ── CountdownTicker ───────────────────────────────────────────────────────

    fn ticker_with(
        at_ms: i64,
        clock: Arc<dyn Clock>,
    ) -> (CountdownTicker, Arc<RecordingDisplay>) {
        let display = Arc::new(RecordingDisplay::default());
        let ticker = CountdownTicker::new(
            id(1),
            Deadline::new(at_ms, false, None),
            display.clone(),
            clock,
        );
        (ticker, display)
    }

    #[tokio::test(start_paused = true)]
    async fn fast_ticker_renders_six_values_then_stops() {
        let (mut ticker, display) = ticker_with(5_000, Arc::new(TokioClock::new(0)));
        ticker.start(TickRate::Fast);
        assert_eq!(ticker.state(), TickerState::Running);

        tokio::time::sleep(Duration::from_secs(8)).await;

        assert_eq!(
            display.times_for(id(1)),
            vec!["00:00:05", "00:00:04", "00:00:03", "00:00:02", "00:00:01", "00:00:00"]
        );
        assert_eq!(ticker.state(), TickerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_stay_anchored_to_start() {
        // 1 s ticks against a deadline 3.5 s out: each second renders exactly
        // once, with no drift pushing a value into the next period.
        let (mut ticker, display) = ticker_with(3_500, Arc::new(TokioClock::new(0)));
        ticker.start(TickRate::Every(Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(
            display.times_for(id(1)),
            vec!["00:00:03", "00:00:02", "00:00:01", "00:00:00"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_leaves_display_untouched() {
        let (mut ticker, display) = ticker_with(60_000, Arc::new(TokioClock::new(0)));
        ticker.start(TickRate::Fast);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        ticker.stop();
        let before = display.events().len();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(display.events().len(), before);
        assert_eq!(ticker.state(), TickerState::Stopped);
        assert!(!display
            .events()
            .iter()
            .any(|e| matches!(e, DisplayEvent::Uninitialized(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_renders_uninitialized_and_stops() {
        let (mut ticker, display) = ticker_with(60_000, Arc::new(TokioClock::new(0)));
        ticker.start(TickRate::Fast);
        tokio::time::sleep(Duration::from_millis(500)).await;
        ticker.reset();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            display.events().last(),
            Some(&DisplayEvent::Uninitialized(id(1)))
        );
        assert_eq!(ticker.state(), TickerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_running_instance() {
        let (mut ticker, display) = ticker_with(10_000, Arc::new(TokioClock::new(0)));
        ticker.start(TickRate::Fast);
        ticker.start(TickRate::Fast);

        tokio::time::sleep(Duration::from_millis(100)).await;
        // Two starts, but only one live task: the restart re-renders once.
        assert_eq!(display.times_for(id(1)), vec!["00:00:10"]);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(display.times_for(id(1)), vec!["00:00:10", "00:00:09"]);
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_stop_re_renders_current_value() {
        let (mut ticker, display) = ticker_with(30_000, Arc::new(TokioClock::new(0)));
        ticker.start(TickRate::Fast);
        tokio::time::sleep(Duration::from_millis(50)).await;
        ticker.stop();
        ticker.start(TickRate::Fast);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(display.times_for(id(1)), vec!["00:00:30", "00:00:29"]);
    }

    #[test]
    fn refresh_at_deadline_renders_zero_and_stops() {
        let clock = ManualClock::new(0);
        let (mut ticker, display) = ticker_with(2_000, Arc::new(clock.clone()));
        clock.set(2_500);
        ticker.refresh();
        assert_eq!(display.times_for(id(1)), vec!["00:00:00"]);
        assert_eq!(ticker.state(), TickerState::Stopped);

        ticker.refresh();
        assert_eq!(display.times_for(id(1)).len(), 1, "zero is not repeated");
    }

    #[test]
    fn start_without_runtime_stays_stopped() {
        let (mut ticker, display) = ticker_with(2_000, Arc::new(ManualClock::new(0)));
        ticker.start(TickRate::Fast);
        assert_eq!(ticker.state(), TickerState::Stopped);
        assert!(display.events().is_empty());
    }
}
