use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::chart::Difficulty;
use crate::engine::versus::VersusOptions;

/// User settings persisted as JSON in the platform config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    /// Master playback volume, 0.0 to 1.0
    pub volume: f32,
    /// Default chart difficulty
    pub difficulty: Difficulty,
    /// Base URL of the lobby service
    pub lobby_url: String,
    /// Reconciliation pull/push cadence
    pub poll_interval_ms: u64,
    /// Score at which chase progress reaches 100
    pub score_ceiling: u32,
    /// Delay before a versus rematch starts
    pub restart_delay_ms: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            difficulty: Difficulty::Expert,
            lobby_url: "http://localhost:3000".to_string(),
            poll_interval_ms: 100,
            score_ceiling: 10_000,
            restart_delay_ms: 1_000,
        }
    }
}

impl GameSettings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from_file().unwrap_or_default()
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::settings_path()?;
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn versus_options(&self) -> VersusOptions {
        VersusOptions {
            poll_interval_ms: self.poll_interval_ms,
            score_ceiling: self.score_ceiling,
            restart_delay_ms: self.restart_delay_ms,
        }
    }

    fn settings_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "chasebeat", "chasebeat") {
            Ok(proj_dirs.config_dir().join("settings.json"))
        } else {
            Ok(PathBuf::from(".chasebeat-settings.json"))
        }
    }
}
