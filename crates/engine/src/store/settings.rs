// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user settings persistence (`user_settings/<id>.json`).

use crate::config::ParserDefaults;
use crate::settings::UserSettings;
use crate::store::backup::BackupManager;
use crate::store::{atomic_write, DataLayout};

pub struct SettingsStore {
    layout: DataLayout,
    defaults: ParserDefaults,
    backup: BackupManager,
}

impl SettingsStore {
    pub fn new(layout: DataLayout, defaults: ParserDefaults, backup: BackupManager) -> Self {
        Self { layout, defaults, backup }
    }

    /// Load a user's settings, clamped into range. Missing or corrupt files
    /// yield the configured parser defaults.
    pub fn load(&self, user_id: u64) -> UserSettings {
        let path = self.layout.user_settings_file(user_id);
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<UserSettings>(&contents) {
                Ok(settings) => settings.clamped(),
                Err(e) => {
                    tracing::warn!(user_id, err = %e, "corrupt settings file, using defaults");
                    UserSettings::from(&self.defaults)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                UserSettings::from(&self.defaults)
            }
            Err(e) => {
                tracing::warn!(user_id, err = %e, "unreadable settings file, using defaults");
                UserSettings::from(&self.defaults)
            }
        }
    }

    /// Persist a user's settings (clamped), durable before return.
    pub fn save(&self, user_id: u64, settings: &UserSettings) -> anyhow::Result<()> {
        let clamped = settings.clone().clamped();
        let path = self.layout.user_settings_file(user_id);
        let json = serde_json::to_string_pretty(&clamped)?;
        atomic_write(&path, json.as_bytes())?;
        self.backup.backup_file(&path);
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_store_tests.rs"]
mod tests;
