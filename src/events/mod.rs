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

//! Application logic, event handling, and command dispatching.
//!
//! This module acts as the central hub for the "Controller" logic of the
//! application. Console input, queue notifications, task results and player
//! reports all arrive as [`AppEvent`]s on one channel and are applied to the
//! application state, in order, on the event loop thread.
//!
//! The playback queue lives on that thread too. It reports changes of the
//! current item through the event channel itself (see the [`QueueDelegate`]
//! implementation below), so loading the next item is just another event.

mod handlers;
use handlers::*;

use std::{sync::mpsc::Sender, time::Duration};

use anyhow::{Result, bail};

use crate::{
    App,
    db::scan::{ScanProgress, ScanSummary},
    model::{HistoryEntry, MediaItem, Playlist, SavedQueue, queue::QueueDelegate},
    player::PlayerState,
};

#[derive(Debug)]
pub(crate) enum AppEvent {
    /// A line typed at the console.
    Input(String),

    CurrentItemChanged(Option<MediaItem>),
    RestartCurrent(MediaItem),
    /// An item ready to play, only honoured if `generation` is still current.
    LoadItem {
        item: MediaItem,
        start: Duration,
        generation: u64,
    },

    SetQueue(Vec<MediaItem>, usize),
    AppendToQueue(Vec<MediaItem>),
    QueueRestored(SavedQueue),

    Catalog(ScanProgress),
    ScanFinished(ScanSummary),

    MediaListed(Vec<MediaItem>),
    FavouritesReady(Vec<MediaItem>),
    HistoryReady(Vec<HistoryEntry>),
    PlaylistsReady(Vec<Playlist>),
    PlaylistItemsReady(String, Vec<MediaItem>),
    FavouriteToggled(i64, bool),
    Message(String),

    PlayerStateChanged(PlayerState),
    TitleChanged(String),
    DurationChanged(u64),
    TimeChanged(f64),
    VolumeChanged(u32),
    TrackFinished,

    Tick,

    ExitApplication,

    Error(String),
    FatalError(String),
}

impl QueueDelegate for Sender<AppEvent> {
    fn on_current_item_changed(&self, item: Option<&MediaItem>) {
        let _ = self.send(AppEvent::CurrentItemChanged(item.cloned()));
    }

    fn on_restart_current(&self, item: &MediaItem) {
        let _ = self.send(AppEvent::RestartCurrent(item.clone()));
    }
}

/// Runs the main application loop.
///
/// This function loops until an exit event is received or the event channel
/// is closed. A fatal error ends the loop with that error.
pub(crate) fn process_events(app: &mut App) -> Result<()> {
    while let Ok(event) = app.event_rx.recv() {
        match event {
            AppEvent::ExitApplication => break,
            AppEvent::FatalError(message) => bail!(message),

            AppEvent::Input(line) => handle_input(app, &line)?,

            AppEvent::CurrentItemChanged(item) => handle_current_item_changed(app, item)?,
            AppEvent::RestartCurrent(item) => handle_restart_current(app, item)?,
            AppEvent::LoadItem {
                item,
                start,
                generation,
            } => handle_load_item(app, item, start, generation)?,

            AppEvent::SetQueue(items, start) => handle_set_queue(app, items, start),
            AppEvent::AppendToQueue(items) => handle_append_to_queue(app, items),
            AppEvent::QueueRestored(saved) => handle_queue_restored(app, saved),

            AppEvent::Catalog(progress) => handle_catalog_event(app, progress),
            AppEvent::ScanFinished(summary) => handle_scan_finished(summary),

            AppEvent::MediaListed(items) => handle_media_listed(items),
            AppEvent::FavouritesReady(items) => handle_favourites_ready(items),
            AppEvent::HistoryReady(entries) => handle_history_ready(entries),
            AppEvent::PlaylistsReady(playlists) => handle_playlists_ready(playlists),
            AppEvent::PlaylistItemsReady(name, items) => handle_playlist_items_ready(name, items),
            AppEvent::FavouriteToggled(id, favourite) => handle_favourite_toggled(id, favourite),
            AppEvent::Message(message) => println!("{}", message),

            AppEvent::PlayerStateChanged(state) => handle_player_state_changed(app, state),
            AppEvent::TitleChanged(title) => handle_title_changed(app, title),
            AppEvent::DurationChanged(duration) => handle_duration_changed(app, duration),
            AppEvent::TimeChanged(secs) => handle_time_changed(app, secs),
            AppEvent::VolumeChanged(volume) => handle_volume_changed(app, volume),
            AppEvent::TrackFinished => handle_track_finished(app)?,

            AppEvent::Tick => handle_tick(app)?,

            AppEvent::Error(message) => handle_error(message),
        }
    }

    Ok(())
}

/// Queues a final save of the playback position before exit.
pub(crate) fn save_position_on_exit(app: &mut App) -> Result<()> {
    save_current_position(app)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::model::{fixtures::items, queue::Queue};

    #[test]
    fn queue_notifications_arrive_as_events() {
        let (event_tx, event_rx) = mpsc::channel();
        let mut queue = Queue::new(event_tx);

        queue.set_queue(items(&["a", "b"]), 0);
        queue.next();
        queue.restart_current();
        queue.clear();

        let events: Vec<AppEvent> = event_rx.try_iter().collect();

        assert!(matches!(&events[0], AppEvent::CurrentItemChanged(Some(i)) if i.title == "a"));
        assert!(matches!(&events[1], AppEvent::CurrentItemChanged(Some(i)) if i.title == "b"));
        assert!(matches!(&events[2], AppEvent::RestartCurrent(i) if i.title == "b"));
        assert!(matches!(&events[3], AppEvent::CurrentItemChanged(None)));
        assert_eq!(events.len(), 4);
    }
}
