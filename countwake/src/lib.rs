/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! countwake – alarm scheduling and countdown refresh engine
//!
//! Keeps a persisted set of absolute deadlines, coalesces them onto a single
//! external wake-up aimed at the earliest one, and drives one display
//! countdown per timer.
//!
//! ```text
//! lib.rs
//! ├── deadline.rs     – TimerId, Deadline, DeadlineSet
//! ├── clock.rs        – monotonic (boot-time) clock + test clocks
//! ├── store/          – DeadlineStore: YAML file + in-memory stores
//! ├── scheduler/      – WakeScheduler: one wake-up for the earliest deadline
//! ├── ticker/         – CountdownTicker: debounced HH:MM:SS refresh
//! ├── engine/         – ReconciliationEngine, Command, EngineHandle actor
//! ├── host/           – host traits + tokio-backed WakeHost
//! ├── config/         – YAML engine configuration
//! └── testing.rs      – recording fakes of every host trait
//! ```

pub mod clock;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod host;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod ticker;
