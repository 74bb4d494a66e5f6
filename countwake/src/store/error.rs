/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Errors raised while writing the persisted deadline set.
//!
//! Reading never fails (see [`DeadlineStore::load`](super::DeadlineStore::load)),
//! so only the write path has an error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The state directory or file could not be written.
    #[error("cannot write deadline state to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The set could not be encoded.
    #[error("cannot encode deadline state: {0}")]
    Encode(#[from] serde_yaml::Error),

    /// Injected by in-memory stores to simulate a failing disk.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
