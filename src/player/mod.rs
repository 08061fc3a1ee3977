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

//! Media playback control and state management.
//!
//! This module provides the high-level [`MediaPlayer`] interface used by the
//! application to control playback. It manages a background worker thread
//! that interfaces with the playback engine, ensuring that slow media
//! operations do not block the main application thread.
//!
//! Two engines are available:
//!
//! * With the `mpv` feature, audio and video are decoded and rendered by
//!   `libmpv`.
//! * Otherwise a headless engine keeps a simulated playback clock from the
//!   item durations, which is enough to drive the queue end to end.
//!
//! Both report back through the same [`AppEvent`]s.

#[cfg(feature = "mpv")]
mod commands;
#[cfg(not(feature = "mpv"))]
mod headless;

use std::{sync::mpsc, time::Duration};

use anyhow::Result;

use crate::{events::AppEvent, model::MediaItem};

/// Represents the current playback status of the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PlayerState {
    Playing,
    Paused,
    Stopped,
}

impl PlayerState {
    // Maps engine flags to a simplified [`PlayerState`].
    fn from_flags(is_paused: bool, is_idle: bool) -> Self {
        if is_idle {
            PlayerState::Stopped
        } else if is_paused {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        }
    }
}

#[derive(Debug)]
pub(crate) enum PlayerCommand {
    /// Load a file, replacing whatever is loaded, and play from `start`.
    PlayFile {
        filename: String,
        title: String,
        duration: Duration,
        start: Duration,
    },
    Restart,
    TogglePause,
    Seek(i32),
    Stop,
    AdjustVolume(i32),
    ToggleMute,
}

/// A handle to the playback engine.
///
/// This struct acts as a command proxy; it does not perform media processing
/// itself but instead sends instructions to a background worker thread.
pub(crate) struct MediaPlayer {
    /// Channel for sending commands to the background worker thread.
    command_tx: mpsc::Sender<PlayerCommand>,
}

impl MediaPlayer {
    /// Spawns the player worker thread and returns a new player handle.
    ///
    /// # Arguments
    ///
    /// * `event_tx` - A channel to send application-level events (like progress
    ///   updates or errors) back to the main event loop.
    pub(crate) fn new(event_tx: mpsc::Sender<AppEvent>) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<PlayerCommand>();

        #[cfg(feature = "mpv")]
        commands::spawn_player_worker(command_rx, event_tx);
        #[cfg(not(feature = "mpv"))]
        headless::spawn_player_worker(command_rx, event_tx);

        Ok(Self { command_tx })
    }

    /// Instructs the worker to load and play a media item.
    ///
    /// # Arguments
    ///
    /// * `item` - The item to play, its filename is the source locator.
    /// * `start` - Where to start, used to resume a partially watched item.
    pub(crate) fn play_item(&self, item: &MediaItem, start: Duration) -> Result<()> {
        self.command_tx.send(PlayerCommand::PlayFile {
            filename: item.filename.clone(),
            title: item.display_title(),
            duration: Duration::from_millis(item.duration.max(0) as u64),
            start,
        })?;
        Ok(())
    }

    /// Plays the loaded item again from the beginning.
    pub(crate) fn restart(&self) -> Result<()> {
        self.command_tx.send(PlayerCommand::Restart)?;
        Ok(())
    }

    /// Toggles the playback state between paused and playing.
    pub(crate) fn toggle_pause(&self) -> Result<()> {
        self.command_tx.send(PlayerCommand::TogglePause)?;
        Ok(())
    }

    /// Stop playback.
    pub(crate) fn stop(&self) -> Result<()> {
        self.command_tx.send(PlayerCommand::Stop)?;
        Ok(())
    }

    /// Adjusts the playback volume relative to the current level.
    pub(crate) fn adjust_volume(&self, delta: i32) -> Result<()> {
        self.command_tx.send(PlayerCommand::AdjustVolume(delta))?;
        Ok(())
    }

    /// Toggles the output between muted and unmuted.
    pub(crate) fn toggle_mute(&self) -> Result<()> {
        self.command_tx.send(PlayerCommand::ToggleMute)?;
        Ok(())
    }

    /// Adjusts the playback position forward or backwards relative to the
    /// current position.
    ///
    /// # Arguments
    ///
    /// * `delta` - The number of seconds to seek (positive or negative).
    pub(crate) fn seek(&self, delta: i32) -> Result<()> {
        self.command_tx.send(PlayerCommand::Seek(delta))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_from_engine_flags() {
        assert_eq!(PlayerState::from_flags(false, true), PlayerState::Stopped);
        assert_eq!(PlayerState::from_flags(true, true), PlayerState::Stopped);
        assert_eq!(PlayerState::from_flags(true, false), PlayerState::Paused);
        assert_eq!(PlayerState::from_flags(false, false), PlayerState::Playing);
    }
}
