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

use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use crate::{
    db::{
        self,
        scan::{self, ScanOptions},
    },
    events::AppEvent,
    model::{MediaItem, MediaKind, MediaStats, SavedQueue},
    tasks::TaskContext,
};

/// How many of the most recent plays `history` shows.
const HISTORY_LIMIT: usize = 50;

/// A saved position this close to the end counts as watched to completion.
const RESUME_END_MARGIN_MS: i64 = 5_000;

pub(super) fn scan_library(
    ctx: &mut TaskContext,
    roots: Vec<String>,
    options: ScanOptions,
) -> Result<()> {
    let event_tx = ctx.event_tx;

    let summary = scan::process_media_library(ctx.conn, &roots, &options, |progress| {
        let _ = event_tx.send(AppEvent::Catalog(progress));
    });

    match summary {
        Ok(summary) => {
            info!("Scan finished: {:?}", summary);
            ctx.event_tx.send(AppEvent::ScanFinished(summary))?;
        }
        Err(e) => {
            warn!("Failure processing media library: {:#}", e);
            ctx.event_tx
                .send(AppEvent::Error(format!("Scan failed: {:#}", e)))?;
        }
    }

    Ok(())
}

pub(super) fn list_media(ctx: &mut TaskContext, kind: Option<MediaKind>) -> Result<()> {
    let items = db::fetch_media(ctx.conn, kind)?;
    ctx.event_tx.send(AppEvent::MediaListed(items))?;

    Ok(())
}

pub(super) fn queue_media(ctx: &mut TaskContext, ids: Vec<i64>, append: bool) -> Result<()> {
    let items = db::fetch_media_by_ids(ctx.conn, &ids)?;

    let missing = ids.len() - items.len();
    if missing > 0 {
        ctx.event_tx.send(AppEvent::Message(format!(
            "{} of {} ids are not in the library",
            missing,
            ids.len()
        )))?;
    }

    if items.is_empty() {
        return Ok(());
    }

    let event = if append {
        AppEvent::AppendToQueue(items)
    } else {
        AppEvent::SetQueue(items, 0)
    };
    ctx.event_tx.send(event)?;

    Ok(())
}

pub(super) fn play_all(ctx: &mut TaskContext, kind: Option<MediaKind>, start: usize) -> Result<()> {
    let items = db::fetch_media(ctx.conn, kind)?;

    if items.is_empty() {
        ctx.event_tx
            .send(AppEvent::Message("The library is empty, try 'scan'".to_string()))?;
    } else {
        ctx.event_tx.send(AppEvent::SetQueue(items, start))?;
    }

    Ok(())
}

pub(super) fn prepare_item(ctx: &mut TaskContext, item: MediaItem, generation: u64) -> Result<()> {
    // A failed statistics write must not stop the item from playing.
    if let Err(e) = db::record_play(ctx.conn, item.id) {
        warn!("Failed to record play of {}: {:#}", item.id, e);
    }

    let start = match db::fetch_stats(ctx.conn, item.id) {
        Ok(stats) => resume_position(&item, &stats),
        Err(e) => {
            warn!("Failed to fetch stats of {}: {:#}", item.id, e);
            Duration::ZERO
        }
    };

    ctx.event_tx.send(AppEvent::LoadItem {
        item,
        start,
        generation,
    })?;

    Ok(())
}

/// Where playback of an item should start.
///
/// Videos resume from their saved position unless it is at the very start or
/// the very end. Audio always starts from the beginning.
pub(super) fn resume_position(item: &MediaItem, stats: &MediaStats) -> Duration {
    let resumable = item.kind == MediaKind::Video
        && stats.position > 0
        && (item.duration <= 0 || stats.position < item.duration - RESUME_END_MARGIN_MS);

    if resumable {
        Duration::from_millis(stats.position as u64)
    } else {
        Duration::ZERO
    }
}

pub(super) fn save_position(ctx: &mut TaskContext, id: i64, position: i64) -> Result<()> {
    db::save_position(ctx.conn, id, position)?;

    Ok(())
}

pub(super) fn toggle_favourite(ctx: &mut TaskContext, id: i64) -> Result<()> {
    if db::fetch_media_by_ids(ctx.conn, &[id])?.is_empty() {
        ctx.event_tx
            .send(AppEvent::Message(format!("No media with id {}", id)))?;
        return Ok(());
    }

    let favourite = db::toggle_favourite(ctx.conn, id)?;
    ctx.event_tx.send(AppEvent::FavouriteToggled(id, favourite))?;

    Ok(())
}

pub(super) fn list_favourites(ctx: &mut TaskContext) -> Result<()> {
    let items = db::fetch_favourites(ctx.conn)?;
    ctx.event_tx.send(AppEvent::FavouritesReady(items))?;

    Ok(())
}

pub(super) fn list_history(ctx: &mut TaskContext) -> Result<()> {
    let entries = db::fetch_history(ctx.conn, HISTORY_LIMIT)?;
    ctx.event_tx.send(AppEvent::HistoryReady(entries))?;

    Ok(())
}

pub(super) fn create_playlist(ctx: &mut TaskContext, name: String) -> Result<()> {
    db::create_playlist(ctx.conn, &name)?;
    ctx.event_tx
        .send(AppEvent::Message(format!("Created playlist {}", name)))?;

    Ok(())
}

pub(super) fn add_to_playlist(ctx: &mut TaskContext, name: String, ids: Vec<i64>) -> Result<()> {
    let added = db::add_to_playlist(ctx.conn, &name, &ids)?;
    ctx.event_tx.send(AppEvent::Message(format!(
        "Added {} items to {}",
        added, name
    )))?;

    Ok(())
}

pub(super) fn play_playlist(ctx: &mut TaskContext, name: String) -> Result<()> {
    let items = db::fetch_playlist_items(ctx.conn, &name)?;

    if items.is_empty() {
        ctx.event_tx
            .send(AppEvent::Message(format!("Playlist {} is empty", name)))?;
    } else {
        ctx.event_tx.send(AppEvent::SetQueue(items, 0))?;
    }

    Ok(())
}

pub(super) fn delete_playlist(ctx: &mut TaskContext, name: String) -> Result<()> {
    let message = if db::delete_playlist(ctx.conn, &name)? {
        format!("Deleted playlist {}", name)
    } else {
        format!("No playlist named {}", name)
    };
    ctx.event_tx.send(AppEvent::Message(message))?;

    Ok(())
}

pub(super) fn list_playlists(ctx: &mut TaskContext) -> Result<()> {
    let playlists = db::fetch_playlists(ctx.conn)?;
    ctx.event_tx.send(AppEvent::PlaylistsReady(playlists))?;

    Ok(())
}

pub(super) fn list_playlist_items(ctx: &mut TaskContext, name: String) -> Result<()> {
    let items = db::fetch_playlist_items(ctx.conn, &name)?;
    ctx.event_tx.send(AppEvent::PlaylistItemsReady(name, items))?;

    Ok(())
}

pub(super) fn save_queue(ctx: &mut TaskContext, saved: SavedQueue) -> Result<()> {
    db::save_queue(ctx.conn, &saved)?;
    info!("Saved queue of {} items", saved.items.len());

    Ok(())
}

pub(super) fn restore_queue(ctx: &mut TaskContext) -> Result<()> {
    let saved = db::load_queue(ctx.conn)?;

    if !saved.items.is_empty() {
        ctx.event_tx.send(AppEvent::QueueRestored(saved))?;
    }

    Ok(())
}
