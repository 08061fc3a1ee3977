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

//! Domain models and core data structures.
//!
//! This module defines the central entities of the application, such as media
//! items, playlists and play history, representing the underlying data schema
//! used for metadata management and playback.

pub(crate) mod catalog;
pub(crate) mod queue;

use std::fmt;

/// The two families of media the library holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "audio" | "a" => Some(MediaKind::Audio),
            "video" | "v" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A playable media file.
///
/// `id` is the durable identifier of the file, derived from its path, so it
/// stays the same across library rescans. It is also the identity the queue
/// uses when it has to look an item up.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MediaItem {
    pub id: i64,
    pub kind: MediaKind,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Duration in milliseconds, zero when unknown.
    pub duration: i64,
    pub filename: String,
    pub artwork: Option<String>,
}

impl MediaItem {
    /// A title suitable for "now playing" displays.
    pub(crate) fn display_title(&self) -> String {
        match &self.artist {
            Some(artist) if !artist.is_empty() => format!("{} - {}", artist, self.title),
            _ => self.title.clone(),
        }
    }
}

/// Play statistics for a media item, keyed by its durable id.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MediaStats {
    pub play_count: i64,
    pub last_played: Option<i64>,
    /// Saved watch/listen position in milliseconds.
    pub position: i64,
    pub favourite: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Playlist {
    pub id: i64,
    pub name: String,
    pub item_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HistoryEntry {
    pub item: MediaItem,
    /// Seconds since the Unix epoch.
    pub played_at: i64,
}

/// How the queue behaves at its boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum LoopMode {
    /// Stop at either end of the queue.
    #[default]
    None,
    /// Wrap around from the last item to the first and vice versa.
    All,
    /// Repeat the current item indefinitely.
    One,
}

impl LoopMode {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            LoopMode::None => "none",
            LoopMode::All => "all",
            LoopMode::One => "one",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" | "off" => Some(LoopMode::None),
            "all" => Some(LoopMode::All),
            "one" => Some(LoopMode::One),
            _ => None,
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Queue contents as persisted between sessions.
///
/// Items are held in their unshuffled order; `current` indexes into that
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SavedQueue {
    pub items: Vec<MediaItem>,
    pub current: Option<usize>,
    pub loop_mode: LoopMode,
    pub shuffled: bool,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{MediaItem, MediaKind};

    pub(crate) fn item(id: i64, title: &str) -> MediaItem {
        MediaItem {
            id,
            kind: MediaKind::Audio,
            title: title.to_string(),
            artist: Some("Test Artist".to_string()),
            album: Some("Test Album".to_string()),
            duration: 180_000,
            filename: format!("/music/{}.mp3", title),
            artwork: None,
        }
    }

    pub(crate) fn items(titles: &[&str]) -> Vec<MediaItem> {
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| item(i as i64 + 1, title))
            .collect()
    }
}
