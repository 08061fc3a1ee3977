// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Application configuration.
//!
//! This module manages the application configuration file.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

const CONFIG_NAME: &str = "playdeck";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub media_dirs: Vec<String>,
    pub database_file: String,
    pub audio_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub include_hidden: bool,
    /// Directory names, or full paths, the scanner never descends into.
    pub excluded_dirs: Vec<String>,
    /// "Previous" restarts the current item when playback is further in than
    /// this.
    pub previous_restart_threshold_ms: u64,
    pub position_save_interval_secs: u64,
    pub restore_queue: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            media_dirs: vec![],
            database_file: "playdeck.db".to_string(),
            audio_extensions: ["mp3", "flac", "ogg", "opus", "m4a", "aac", "wav"]
                .map(String::from)
                .to_vec(),
            video_extensions: ["mp4", "mkv", "webm", "mov", "avi", "m4v"]
                .map(String::from)
                .to_vec(),
            include_hidden: false,
            excluded_dirs: vec![],
            previous_restart_threshold_ms: 3000,
            position_save_interval_secs: 5,
            restore_queue: true,
        }
    }
}

impl AppConfig {
    pub fn previous_restart_threshold(&self) -> Duration {
        Duration::from_millis(self.previous_restart_threshold_ms)
    }

    pub fn position_save_interval(&self) -> Duration {
        Duration::from_secs(self.position_save_interval_secs.max(1))
    }
}

pub fn load_config() -> AppConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_else(|e| {
        warn!("Using default configuration: {}", e);
        AppConfig::default()
    })
}

pub fn save_config(cfg: &AppConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}
