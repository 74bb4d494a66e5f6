/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Engine configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! state_file: /var/lib/countwake/deadlines.yaml
//! refresh:
//!   interval_secs: 1
//!   fast: false
//! alerts:
//!   vibrate: true
//!   insistent: false
//!   ringtone: "default"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above
//! (`state_file` defaults to `countwake-deadlines.yaml` in the working
//! directory).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::host::{AlertSettings, Sound};
use crate::ticker::TickRate;

/// Used when neither the file nor the command line names a state file.
pub const DEFAULT_STATE_FILE: &str = "countwake-deadlines.yaml";

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// Kept private; callers work with [`EngineConfig`] / [`ConfigManager`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    state_file: Option<PathBuf>,
    refresh: RefreshSection,
    alerts: AlertsSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RefreshSection {
    interval_secs: u32,
    fast: bool,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            fast: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AlertsSection {
    vibrate: bool,
    insistent: bool,
    ringtone: String,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            vibrate: true,
            insistent: false,
            ringtone: String::from("default"),
        }
    }
}

// ── Public data structures ────────────────────────────────────────────────────

/// Resolved engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub state_file: PathBuf,
    /// Seconds between display refreshes; `0` means one second.
    pub refresh_interval_secs: u32,
    /// 200 ms refresh, overrides `refresh_interval_secs`.
    pub fast_refresh: bool,
    pub vibrate: bool,
    pub insistent: bool,
    pub ringtone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl EngineConfig {
    fn from_file(file: ConfigFile) -> Self {
        Self {
            state_file: file
                .state_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            refresh_interval_secs: file.refresh.interval_secs,
            fast_refresh: file.refresh.fast,
            vibrate: file.alerts.vibrate,
            insistent: file.alerts.insistent,
            ringtone: file.alerts.ringtone,
        }
    }

    pub fn tick_rate(&self) -> TickRate {
        TickRate::from_settings(self.refresh_interval_secs, self.fast_refresh)
    }
}

impl AlertSettings for EngineConfig {
    fn vibrate(&self) -> bool {
        self.vibrate
    }

    fn insistent(&self) -> bool {
        self.insistent
    }

    fn sound(&self, silent: bool) -> Sound {
        if silent {
            Sound::Silent
        } else {
            Sound::Ringtone(self.ringtone.clone())
        }
    }
}

// ── ConfigManager ─────────────────────────────────────────────────────────────

/// Loads the engine configuration from a YAML file.
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: EngineConfig,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl ConfigManager {
    /// Creates a manager holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces the current configuration.
    ///
    /// An empty file yields the defaults.  On error the previous
    /// configuration is reset to the defaults and `is_loaded()` is `false`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or if the YAML is
    /// structurally invalid.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading engine configuration from: {}", path.display());

        self.config = EngineConfig::default();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };
        debug!(?file, "parsed configuration file");

        self.config = EngineConfig::from_file(file);
        self.loaded = true;

        info!(
            state_file = %self.config.state_file.display(),
            rate = ?self.config.tick_rate(),
            vibrate = self.config.vibrate,
            insistent = self.config.insistent,
            "configuration loaded"
        );
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable access for command-line overrides.
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Returns `true` after a successful call to [`load_from_file`](Self::load_from_file).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
