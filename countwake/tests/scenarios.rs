/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end scenarios: engine task + tokio wake host + recording display,
//! notifier and host control, on paused tokio time.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use countwake::clock::{Clock, TokioClock};
use countwake::deadline::{Deadline, DeadlineSet, TimerId};
use countwake::engine::{handle, Collaborators, Command, EngineHandle, EngineTask, ReconciliationEngine};
use countwake::host::TokioWakeHost;
use countwake::store::{DeadlineStore, FileDeadlineStore, MemoryDeadlineStore};
use countwake::testing::{
    DisplayEvent, FixedSettings, RecordingDisplay, RecordingHostControl, RecordingNotifier,
};
use countwake::ticker::TickRate;

// ── Harness ───────────────────────────────────────────────────────────────────

struct Running {
    handle: EngineHandle,
    task: EngineTask,
    clock: Arc<TokioClock>,
    notifier: Arc<RecordingNotifier>,
    display: Arc<RecordingDisplay>,
    host: Arc<RecordingHostControl>,
}

fn boot(store: Arc<dyn DeadlineStore>, base_ms: i64, rate: TickRate) -> Running {
    let clock = Arc::new(TokioClock::new(base_ms));
    let (handle, rx) = handle::channel();
    let notifier = Arc::new(RecordingNotifier::default());
    let display = Arc::new(RecordingDisplay::default());
    let host = Arc::new(RecordingHostControl::default());

    let engine = ReconciliationEngine::new(
        Collaborators {
            store,
            wake: Arc::new(TokioWakeHost::new(clock.clone(), handle.sender())),
            notifier: notifier.clone(),
            settings: Arc::new(FixedSettings::default()),
            display: display.clone(),
            host: host.clone(),
            clock: clock.clone(),
        },
        rate,
    );
    Running {
        task: EngineTask::spawn(engine, rx),
        handle,
        clock,
        notifier,
        display,
        host,
    }
}

/// Lets the engine task drain its queue.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn id(raw: u32) -> TimerId {
    TimerId::new(raw).unwrap()
}

fn file_store(path: &Path) -> Arc<dyn DeadlineStore> {
    Arc::new(FileDeadlineStore::new(path))
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn arm_and_fire() {
    let rt = boot(Arc::new(MemoryDeadlineStore::new()), 0, TickRate::Fast);
    rt.handle.send(Command::RestoreAll).unwrap();
    rt.handle.send(Command::arm(7, 2, false, None).unwrap()).unwrap();

    tokio::time::sleep(Duration::from_millis(2_400)).await;
    assert_eq!(rt.notifier.count_for(id(7)), 0, "wake-up delivered early");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(rt.notifier.count_for(id(7)), 1);
    assert_eq!(rt.notifier.posted()[0].title, "Timer expired");
    assert_eq!(rt.host.idle_signals(), 1);
    assert_eq!(
        rt.display.times_for(id(7)),
        vec!["00:00:02", "00:00:01", "00:00:00"]
    );

    // Nothing else is delivered afterwards.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(rt.notifier.posted().len(), 1);

    let engine = rt.task.shutdown().await.unwrap();
    assert!(engine.deadlines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_before_fire() {
    let rt = boot(Arc::new(MemoryDeadlineStore::new()), 0, TickRate::default());
    rt.handle.send(Command::arm(3, 60, false, None).unwrap()).unwrap();
    rt.handle.send(Command::arm(4, 120, false, None).unwrap()).unwrap();
    settle().await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    rt.handle.send(Command::Cancel { timer_id: id(3) }).unwrap();
    settle().await;
    assert_eq!(
        rt.display.last_for(id(3)),
        Some(DisplayEvent::Uninitialized(id(3)))
    );

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(rt.notifier.count_for(id(3)), 0);
    assert_eq!(rt.host.idle_signals(), 0, "timer 4 is still pending");

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(rt.notifier.count_for(id(4)), 1);
    assert_eq!(rt.host.idle_signals(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_recovery() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deadlines.yaml");

    // First process arms a timer and goes away.
    let first = boot(file_store(&path), 0, TickRate::Fast);
    first.handle.send(Command::RestoreAll).unwrap();
    first
        .handle
        .send(Command::arm(5, 10, false, Some("Oven".into())).unwrap())
        .unwrap();
    settle().await;
    let now = first.clock.now_ms();
    drop(first.task.shutdown().await);

    let saved = std::fs::read_to_string(&path).unwrap();

    // Second process restores it from disk.
    let second = boot(file_store(&path), now, TickRate::Fast);
    second.handle.send(Command::RestoreAll).unwrap();
    settle().await;

    assert_eq!(
        second.display.times_for(id(5)).first().map(String::as_str),
        Some("00:00:10")
    );
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        saved,
        "restore must not rewrite the state file"
    );

    tokio::time::sleep(Duration::from_millis(10_600)).await;
    assert_eq!(second.notifier.count_for(id(5)), 1);
    assert_eq!(second.notifier.posted()[0].title, "Oven: Timer expired");
    assert_eq!(second.host.idle_signals(), 1);
    assert!(FileDeadlineStore::new(&path).load().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_entry_from_previous_run_never_fires() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deadlines.yaml");

    let mut set = DeadlineSet::new();
    set.insert(id(8), Deadline::new(95_000, false, None));
    set.insert(id(9), Deadline::new(130_000, true, None));
    FileDeadlineStore::new(&path).save(&set).unwrap();

    let rt = boot(file_store(&path), 100_000, TickRate::default());
    rt.handle.send(Command::RestoreAll).unwrap();
    settle().await;

    let on_disk = FileDeadlineStore::new(&path).load();
    assert!(!on_disk.contains_key(&id(8)), "stale entry pruned and saved");
    assert!(on_disk.contains_key(&id(9)));

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(rt.notifier.count_for(id(8)), 0);
    assert_eq!(rt.notifier.count_for(id(9)), 1);
}

#[tokio::test(start_paused = true)]
async fn suspend_freezes_display_and_resume_catches_up() {
    let rt = boot(Arc::new(MemoryDeadlineStore::new()), 0, TickRate::default());
    rt.handle.send(Command::arm(1, 60, false, None).unwrap()).unwrap();
    settle().await;
    rt.handle.send(Command::Suspend).unwrap();
    settle().await;
    assert_eq!(rt.display.times_for(id(1)), vec!["00:01:00"]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rt.display.times_for(id(1)).len(), 1, "no renders while suspended");

    rt.handle.send(Command::Resume).unwrap();
    settle().await;
    assert_eq!(rt.display.times_for(id(1)), vec!["00:01:00", "00:00:55"]);
}

#[tokio::test(start_paused = true)]
async fn coalesced_timers_fire_together() {
    let rt = boot(Arc::new(MemoryDeadlineStore::new()), 0, TickRate::default());
    rt.handle.send(Command::arm(1, 5, false, None).unwrap()).unwrap();
    rt.handle.send(Command::arm(2, 5, true, Some("Eggs".into())).unwrap()).unwrap();
    settle().await;

    tokio::time::sleep(Duration::from_millis(5_600)).await;
    assert_eq!(rt.notifier.count_for(id(1)), 1);
    assert_eq!(rt.notifier.count_for(id(2)), 1);
    assert_eq!(rt.host.idle_signals(), 1);
}
