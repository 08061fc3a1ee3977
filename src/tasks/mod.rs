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

//! Asynchronous application task processing.
//!
//! This module implements the command pattern used to offload tasks such as
//! potentially blocking database queries and library scans from the event
//! loop. It provides a dedicated worker loop that translates [`AppTask`]
//! requests into database operations and broadcasts the results back to the
//! application via [`AppEvent`]s.
//!
//! The worker owns the only database connection. Tasks run strictly in the
//! order they were sent, so a [`AppTask::SaveQueue`] followed by
//! [`AppTask::Shutdown`] is guaranteed to be written before the worker exits.
//!
//! Only actions that may block, or may take more than a trivial amount of time
//! to process, should be implemented as tasks. Other actions are likely more
//! suited to events.

mod handlers;
use handlers::*;

use anyhow::Result;
use log::{error, info};
use rusqlite::Connection;
use std::{
    sync::mpsc::{Receiver, Sender},
    thread::{self, JoinHandle},
};

use crate::{
    config::AppConfig,
    db::{self, scan::ScanOptions},
    events::AppEvent,
    model::{MediaItem, MediaKind, SavedQueue},
};

#[derive(Debug)]
pub(crate) enum AppTask {
    ScanLibrary(Vec<String>, ScanOptions),

    ListMedia(Option<MediaKind>),

    /// Looks up media by id, then replaces or extends the queue.
    QueueMedia { ids: Vec<i64>, append: bool },
    PlayAll(Option<MediaKind>, usize),

    /// Records the play and works out where to start, then asks for the
    /// load tagged with `generation`.
    PrepareItem { item: MediaItem, generation: u64 },
    SavePosition(i64, i64),

    ToggleFavourite(i64),
    ListFavourites,
    ListHistory,

    CreatePlaylist(String),
    AddToPlaylist(String, Vec<i64>),
    PlayPlaylist(String),
    DeletePlaylist(String),
    ListPlaylists,
    ListPlaylistItems(String),

    SaveQueue(SavedQueue),
    RestoreQueue,

    Shutdown,
}

/// Spawns a background thread to process application tasks.
///
/// This worker thread initializes its own database connection and enters
/// a blocking loop, listening for incoming [`AppTask`]s until it receives
/// [`AppTask::Shutdown`] or the channel closes.
///
/// # Arguments
///
/// * `config` - The application configuration.
/// * `task_rx` - The receiving end of the task channel.
/// * `event_tx` - The sending end of the channel for broadcasting results.
pub(crate) fn spawn_task_worker(
    config: &AppConfig,
    task_rx: Receiver<AppTask>,
    event_tx: Sender<AppEvent>,
) -> JoinHandle<()> {
    let database_file = config.database_file.clone();

    thread::spawn(move || {
        let mut conn = match db::init_db(&database_file) {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to initialise database {}: {:#}", database_file, e);
                let _ = event_tx.send(AppEvent::FatalError(format!(
                    "Failed to initialise database: {:#}",
                    e
                )));
                return;
            }
        };

        while let Ok(task) = task_rx.recv() {
            if matches!(task, AppTask::Shutdown) {
                break;
            }

            let mut ctx = TaskContext {
                event_tx: &event_tx,
                conn: &mut conn,
            };

            if let Err(e) = handle_task(task, &mut ctx) {
                error!("Task failed: {:#}", e);
                let _ = event_tx.send(AppEvent::Error(format!("{:#}", e)));
            }
        }

        info!("Task worker stopped");
    })
}

/// Bundles shared resources required by task handlers to simplify resource
/// passing when invoking those handler functions.
struct TaskContext<'a> {
    event_tx: &'a Sender<AppEvent>,
    conn: &'a mut Connection,
}

/// Orchestrates the execution of a single task.
fn handle_task(task: AppTask, ctx: &mut TaskContext) -> Result<()> {
    match task {
        AppTask::ScanLibrary(roots, options) => scan_library(ctx, roots, options),

        AppTask::ListMedia(kind) => list_media(ctx, kind),

        AppTask::QueueMedia { ids, append } => queue_media(ctx, ids, append),
        AppTask::PlayAll(kind, start) => play_all(ctx, kind, start),

        AppTask::PrepareItem { item, generation } => prepare_item(ctx, item, generation),
        AppTask::SavePosition(id, position) => save_position(ctx, id, position),

        AppTask::ToggleFavourite(id) => toggle_favourite(ctx, id),
        AppTask::ListFavourites => list_favourites(ctx),
        AppTask::ListHistory => list_history(ctx),

        AppTask::CreatePlaylist(name) => create_playlist(ctx, name),
        AppTask::AddToPlaylist(name, ids) => add_to_playlist(ctx, name, ids),
        AppTask::PlayPlaylist(name) => play_playlist(ctx, name),
        AppTask::DeletePlaylist(name) => delete_playlist(ctx, name),
        AppTask::ListPlaylists => list_playlists(ctx),
        AppTask::ListPlaylistItems(name) => list_playlist_items(ctx, name),

        AppTask::SaveQueue(saved) => save_queue(ctx, saved),
        AppTask::RestoreQueue => restore_queue(ctx),

        AppTask::Shutdown => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, time::Duration};

    use tempfile::TempDir;

    use super::*;
    use crate::db::tests::insert_media;

    fn config_in(dir: &TempDir) -> AppConfig {
        AppConfig {
            database_file: dir.path().join("test.db").to_string_lossy().into_owned(),
            ..AppConfig::default()
        }
    }

    fn next_event(event_rx: &Receiver<AppEvent>) -> AppEvent {
        event_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("no event from task worker")
    }

    #[test]
    fn queue_is_saved_before_shutdown() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let conn = db::init_db(&config.database_file).unwrap();
        insert_media(&conn, 1, MediaKind::Audio, "a");
        insert_media(&conn, 2, MediaKind::Audio, "b");
        drop(conn);

        let (task_tx, task_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = spawn_task_worker(&config, task_rx, event_tx);

        task_tx
            .send(AppTask::QueueMedia {
                ids: vec![2, 1],
                append: false,
            })
            .unwrap();

        let AppEvent::SetQueue(items, 0) = next_event(&event_rx) else {
            panic!("expected the queue to be set");
        };
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 1]);

        task_tx
            .send(AppTask::SaveQueue(SavedQueue {
                items,
                current: Some(1),
                ..SavedQueue::default()
            }))
            .unwrap();
        task_tx.send(AppTask::Shutdown).unwrap();
        worker.join().unwrap();

        let conn = db::init_db(&config.database_file).unwrap();
        let saved = db::load_queue(&conn).unwrap();
        assert_eq!(saved.items.len(), 2);
        assert_eq!(saved.current, Some(1));
    }

    #[test]
    fn prepared_item_is_loaded_with_its_generation() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let conn = db::init_db(&config.database_file).unwrap();
        insert_media(&conn, 7, MediaKind::Audio, "song");
        let item = db::fetch_media_by_ids(&conn, &[7]).unwrap().remove(0);
        drop(conn);

        let (task_tx, task_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = spawn_task_worker(&config, task_rx, event_tx);

        task_tx
            .send(AppTask::PrepareItem {
                item,
                generation: 3,
            })
            .unwrap();

        let AppEvent::LoadItem {
            item,
            start,
            generation,
        } = next_event(&event_rx)
        else {
            panic!("expected a load request");
        };
        assert_eq!(item.id, 7);
        assert_eq!(start, Duration::ZERO);
        assert_eq!(generation, 3);

        task_tx.send(AppTask::Shutdown).unwrap();
        worker.join().unwrap();

        let conn = db::init_db(&config.database_file).unwrap();
        assert_eq!(db::fetch_stats(&conn, 7).unwrap().play_count, 1);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let (task_tx, task_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = spawn_task_worker(&config, task_rx, event_tx);

        task_tx
            .send(AppTask::QueueMedia {
                ids: vec![99],
                append: true,
            })
            .unwrap();

        assert!(matches!(next_event(&event_rx), AppEvent::Message(_)));

        task_tx.send(AppTask::Shutdown).unwrap();
        worker.join().unwrap();
    }
}
