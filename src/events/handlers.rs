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

use std::{
    path::Path,
    time::{Duration, Instant},
};

use anyhow::Result;
use log::{debug, info, warn};

use crate::{
    App,
    commander::{Command, HELP, parse_command},
    config,
    db::scan::{ScanOptions, ScanProgress, ScanSummary},
    events::AppEvent,
    model::{
        HistoryEntry, MediaItem, Playlist, SavedQueue,
        queue::{Queue, QueueDelegate},
    },
    player::PlayerState,
    tasks::AppTask,
    util::format::{
        format_catalog, format_history, format_items, format_playlists, format_queue, format_time,
    },
};

pub(super) fn handle_input(app: &mut App, line: &str) -> Result<()> {
    if line.trim().is_empty() {
        return Ok(());
    }

    match parse_command(line) {
        Ok(command) => handle_command(app, command),
        Err(e) => {
            println!("{}", e);
            Ok(())
        }
    }
}

fn handle_command(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Scan => start_scan(app)?,
        Command::List(kind) => app.task_tx.send(AppTask::ListMedia(kind))?,

        Command::PlayCurrent => match app.queue.current_index() {
            Some(index) => {
                app.queue.jump_to_index(index);
            }
            None => println!("Queue is empty"),
        },
        Command::Play(ids) => app.task_tx.send(AppTask::QueueMedia { ids, append: false })?,
        Command::PlayAll { kind, start } => app.task_tx.send(AppTask::PlayAll(kind, start))?,
        Command::Add(ids) => app.task_tx.send(AppTask::QueueMedia { ids, append: true })?,
        Command::Remove(ids) => {
            app.queue.remove(ids);
            println!("{} items in queue", app.queue.len());
        }

        Command::Next => {
            if app.queue.has_next() {
                app.queue.next();
            } else {
                println!("No next item");
            }
        }
        Command::Previous => {
            let threshold = app.config.previous_restart_threshold();
            let elapsed = elapsed_of(app.player_time);
            if previous_or_restart(&mut app.queue, elapsed, threshold).is_none() {
                println!("No previous item");
            }
        }
        Command::Jump(index) => {
            if app.queue.jump_to_index(index).is_none() {
                println!("No item at position {}", index + 1);
            }
        }
        Command::Shuffle => {
            let shuffled = app.queue.toggle_shuffle();
            println!("Shuffle {}", if shuffled { "on" } else { "off" });
        }
        Command::Loop(loop_mode) => {
            app.queue.set_loop_mode(loop_mode);
            println!("Loop {}", loop_mode);
        }
        Command::Clear => app.queue.clear(),
        Command::Queue => println!("{}", format_queue(&app.queue.state())),
        Command::Status => {
            println!("{}", status_line(app));
            if let Some(catalog) = format_catalog(&app.catalog) {
                println!("{}", catalog);
            }
        }

        Command::Pause => app.player.toggle_pause()?,
        Command::Stop => {
            app.player.stop()?;
            app.needs_reload = true;
        }
        Command::Seek(delta) => app.player.seek(delta)?,
        Command::Volume(delta) => app.player.adjust_volume(delta)?,
        Command::Mute => app.player.toggle_mute()?,

        Command::Favourite(id) => app.task_tx.send(AppTask::ToggleFavourite(id))?,
        Command::Favourites => app.task_tx.send(AppTask::ListFavourites)?,
        Command::History => app.task_tx.send(AppTask::ListHistory)?,

        Command::PlaylistList(None) => app.task_tx.send(AppTask::ListPlaylists)?,
        Command::PlaylistList(Some(name)) => app.task_tx.send(AppTask::ListPlaylistItems(name))?,
        Command::PlaylistNew(name) => app.task_tx.send(AppTask::CreatePlaylist(name))?,
        Command::PlaylistAdd(name, ids) => app.task_tx.send(AppTask::AddToPlaylist(name, ids))?,
        Command::PlaylistPlay(name) => app.task_tx.send(AppTask::PlayPlaylist(name))?,
        Command::PlaylistRemove(name) => app.task_tx.send(AppTask::DeletePlaylist(name))?,

        Command::Dirs => {
            if app.config.media_dirs.is_empty() {
                println!("No media directories, add one with 'dir add <path>'");
            }
            for dir in &app.config.media_dirs {
                println!("{}", dir);
            }
        }
        Command::DirAdd(path) => add_media_dir(app, path),
        Command::DirRemove(path) => remove_media_dir(app, &path),

        Command::Help => println!("{}", HELP),
        Command::Quit => app.event_tx.send(AppEvent::ExitApplication)?,
    }

    Ok(())
}

fn start_scan(app: &mut App) -> Result<()> {
    if app.catalog.is_scanning() {
        println!("A scan is already running");
    } else if app.config.media_dirs.is_empty() {
        println!("No media directories, add one with 'dir add <path>'");
    } else {
        app.task_tx.send(AppTask::ScanLibrary(
            app.config.media_dirs.clone(),
            ScanOptions::from(&app.config),
        ))?;
    }

    Ok(())
}

fn add_media_dir(app: &mut App, path: String) {
    if app.config.media_dirs.contains(&path) {
        println!("{} is already a media directory", path);
        return;
    }
    if !Path::new(&path).is_dir() {
        println!("Not a directory: {}", path);
        return;
    }

    app.config.media_dirs.push(path.clone());
    persist_config(app);
    println!("Added {}, run 'scan' to index it", path);
}

fn remove_media_dir(app: &mut App, path: &str) {
    let before = app.config.media_dirs.len();
    app.config.media_dirs.retain(|dir| dir != path);

    if app.config.media_dirs.len() == before {
        println!("{} is not a media directory", path);
    } else {
        persist_config(app);
        println!("Removed {}, run 'scan' to drop its media", path);
    }
}

fn persist_config(app: &App) {
    if let Err(e) = config::save_config(&app.config) {
        warn!("Failed to save configuration: {}", e);
    }
}

/// Steps back through the queue, or restarts the current item once playback
/// is more than `threshold` into it.
pub(super) fn previous_or_restart<D: QueueDelegate>(
    queue: &mut Queue<D>,
    elapsed: Duration,
    threshold: Duration,
) -> Option<&MediaItem> {
    if elapsed > threshold {
        queue.restart_current()
    } else {
        queue.previous()
    }
}

/// The playback position reported by the engine.
fn elapsed_of(player_time: Option<f64>) -> Duration {
    player_time
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or_default()
}

fn status_line(app: &App) -> String {
    let state = match app.player_state {
        PlayerState::Playing => "Playing",
        PlayerState::Paused => "Paused",
        PlayerState::Stopped => "Stopped",
    };

    let title = app
        .now_playing
        .as_ref()
        .map(MediaItem::display_title)
        .or_else(|| app.player_title.clone())
        .unwrap_or_else(|| "-".to_string());

    let time = format_time(elapsed_of(app.player_time).as_secs());
    let duration = app
        .player_duration
        .map(format_time)
        .unwrap_or_else(|| "--:--".to_string());

    let position = app
        .queue
        .current_index()
        .map(|idx| format!("{}/{}", idx + 1, app.queue.len()))
        .unwrap_or_else(|| "-".to_string());

    let volume = app
        .volume
        .map(|v| format!("{}%", v))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}: {} [{} / {}]  queue {}  loop {}  shuffle {}  volume {}",
        state,
        title,
        time,
        duration,
        position,
        app.queue.loop_mode(),
        if app.queue.is_shuffled() { "on" } else { "off" },
        volume
    )
}

/// Queues a write of the current item's playback position.
pub(super) fn save_current_position(app: &mut App) -> Result<()> {
    let playing = app.now_playing.as_ref().filter(|_| app.clock_valid);

    if let (Some(item), Some(secs)) = (playing, app.player_time) {
        let position = elapsed_of(Some(secs)).as_millis() as i64;
        app.task_tx.send(AppTask::SavePosition(item.id, position))?;
    }
    app.last_position_save = Instant::now();

    Ok(())
}

pub(super) fn handle_current_item_changed(app: &mut App, item: Option<MediaItem>) -> Result<()> {
    save_current_position(app)?;

    // Anything still being prepared for the previous item is now stale, and
    // the engine keeps reporting the previous item's clock until it loads.
    app.load_generation += 1;
    app.clock_valid = false;
    app.player_time = None;
    app.player_duration = None;

    match item {
        Some(item) => {
            println!("Now playing: {}", item.display_title());
            app.task_tx.send(AppTask::PrepareItem {
                item: item.clone(),
                generation: app.load_generation,
            })?;
            app.now_playing = Some(item);
        }
        None => {
            app.player.stop()?;
            app.needs_reload = true;
            app.now_playing = None;
            println!("Playback stopped, the queue is empty");
        }
    }

    Ok(())
}

pub(super) fn handle_restart_current(app: &mut App, item: MediaItem) -> Result<()> {
    if app.needs_reload {
        // The engine has nothing loaded to seek in.
        app.load_generation += 1;
        app.clock_valid = false;
        app.task_tx.send(AppTask::PrepareItem {
            item,
            generation: app.load_generation,
        })?;
    } else {
        app.player.restart()?;
    }
    app.player_time = Some(0.0);

    Ok(())
}

pub(super) fn handle_load_item(
    app: &mut App,
    item: MediaItem,
    start: Duration,
    generation: u64,
) -> Result<()> {
    if generation != app.load_generation {
        debug!("Dropping stale load of {}", item.filename);
        return Ok(());
    }

    info!("Loading {}", item.filename);

    if !start.is_zero() {
        println!("Resuming at {}", format_time(start.as_secs()));
    }

    app.player.play_item(&item, start)?;
    app.needs_reload = false;
    app.clock_valid = true;
    app.player_time = Some(start.as_secs_f64());

    Ok(())
}

pub(super) fn handle_set_queue(app: &mut App, items: Vec<MediaItem>, start: usize) {
    let count = items.len();
    app.queue.set_queue(items, start);
    println!("Queued {} items", count);
}

pub(super) fn handle_append_to_queue(app: &mut App, items: Vec<MediaItem>) {
    let count = items.len();
    app.queue.append(items);
    println!("Added {} items, {} in queue", count, app.queue.len());
}

pub(super) fn handle_queue_restored(app: &mut App, saved: SavedQueue) {
    let count = saved.items.len();
    app.queue.restore(saved);
    println!("Restored a queue of {} items, 'play' to resume", count);
}

pub(super) fn handle_catalog_event(app: &mut App, progress: ScanProgress) {
    match &progress {
        ScanProgress::Started(directories) => {
            println!("Scanning {} directories", directories.len())
        }
        ScanProgress::StartedDirectory(directory) => println!("  {}", directory),
        ScanProgress::ProcessedFile(count, name) => debug!("{} {}", count, name),
        ScanProgress::FinishedDirectory(_) | ScanProgress::Finished(_) => {}
    }

    app.catalog.apply(progress);
}

pub(super) fn handle_scan_finished(summary: ScanSummary) {
    println!(
        "Scan complete: {} read, {} unchanged, {} removed, {} in library",
        summary.scanned, summary.unchanged, summary.removed, summary.total
    );
}

pub(super) fn handle_media_listed(items: Vec<MediaItem>) {
    println!("{}", format_items(&items));
}

pub(super) fn handle_favourites_ready(items: Vec<MediaItem>) {
    println!("Favourites:\n{}", format_items(&items));
}

pub(super) fn handle_history_ready(entries: Vec<HistoryEntry>) {
    println!("{}", format_history(&entries));
}

pub(super) fn handle_playlists_ready(playlists: Vec<Playlist>) {
    println!("{}", format_playlists(&playlists));
}

pub(super) fn handle_playlist_items_ready(name: String, items: Vec<MediaItem>) {
    println!("{}:\n{}", name, format_items(&items));
}

pub(super) fn handle_favourite_toggled(id: i64, favourite: bool) {
    if favourite {
        println!("{} added to favourites", id);
    } else {
        println!("{} removed from favourites", id);
    }
}

pub(super) fn handle_player_state_changed(app: &mut App, state: PlayerState) {
    app.player_state = state;
}

pub(super) fn handle_title_changed(app: &mut App, title: String) {
    app.player_title = Some(title);
}

pub(super) fn handle_duration_changed(app: &mut App, duration: u64) {
    app.player_duration = Some(duration);
}

pub(super) fn handle_time_changed(app: &mut App, seconds: f64) {
    if app.clock_valid {
        app.player_time = Some(seconds);
    }
}

pub(super) fn handle_volume_changed(app: &mut App, volume: u32) {
    app.volume = Some(volume);
}

pub(super) fn handle_track_finished(app: &mut App) -> Result<()> {
    app.needs_reload = true;

    // Finished items start from the beginning next time.
    if let Some(item) = &app.now_playing {
        app.task_tx.send(AppTask::SavePosition(item.id, 0))?;
    }
    app.player_time = None;

    if app.queue.next().is_none() {
        println!("End of queue");
    }

    Ok(())
}

pub(super) fn handle_tick(app: &mut App) -> Result<()> {
    let interval = app.config.position_save_interval();

    if app.player_state == PlayerState::Playing && app.last_position_save.elapsed() >= interval {
        save_current_position(app)?;
    }

    Ok(())
}

pub(super) fn handle_error(message: String) {
    println!("Error: {}", message);
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use super::*;
    use crate::{
        config::AppConfig,
        model::{
            fixtures::items,
            queue::tests::{Notification, Recorder},
        },
    };

    const THRESHOLD: Duration = Duration::from_millis(3000);

    fn queue_at_b() -> Queue<Recorder> {
        let mut queue = Queue::new(Recorder::default());
        queue.set_queue(items(&["a", "b", "c"]), 1);
        queue.delegate().take();
        queue
    }

    #[test]
    fn previous_well_into_an_item_restarts_it() {
        let mut queue = queue_at_b();

        let item = previous_or_restart(&mut queue, Duration::from_millis(3500), THRESHOLD)
            .map(|i| i.title.clone());

        assert_eq!(item.as_deref(), Some("b"));
        assert_eq!(queue.current_index(), Some(1));
        assert_eq!(
            queue.delegate().take(),
            vec![Notification::Restart("b".to_string())]
        );
    }

    #[test]
    fn previous_near_the_start_moves_back() {
        let mut queue = queue_at_b();

        let item = previous_or_restart(&mut queue, Duration::from_millis(500), THRESHOLD)
            .map(|i| i.title.clone());

        assert_eq!(item.as_deref(), Some("a"));
        assert_eq!(queue.current_index(), Some(0));
        assert_eq!(
            queue.delegate().take(),
            vec![Notification::Changed(Some("a".to_string()))]
        );
    }

    #[test]
    fn previous_exactly_at_threshold_moves_back() {
        let mut queue = queue_at_b();

        previous_or_restart(&mut queue, THRESHOLD, THRESHOLD);
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn previous_at_start_of_queue_is_ignored() {
        let mut queue = queue_at_b();
        queue.jump_to_index(0);
        queue.delegate().take();

        assert!(previous_or_restart(&mut queue, Duration::ZERO, THRESHOLD).is_none());
        assert_eq!(queue.current_index(), Some(0));
        assert!(queue.delegate().take().is_empty());
    }

    #[test]
    fn unusable_engine_times_count_as_zero() {
        assert_eq!(elapsed_of(None), Duration::ZERO);
        assert_eq!(elapsed_of(Some(-1.0)), Duration::ZERO);
        assert_eq!(elapsed_of(Some(f64::NAN)), Duration::ZERO);
        assert_eq!(elapsed_of(Some(2.5)), Duration::from_millis(2500));
    }

    fn test_app() -> (App, Receiver<AppTask>) {
        let (task_tx, task_rx) = mpsc::channel();
        let app = App::new(AppConfig::default(), task_tx).unwrap();
        (app, task_rx)
    }

    fn saved_positions(task_rx: &Receiver<AppTask>) -> Vec<(i64, i64)> {
        task_rx
            .try_iter()
            .filter_map(|task| match task {
                AppTask::SavePosition(id, position) => Some((id, position)),
                _ => None,
            })
            .collect()
    }

    fn play(app: &mut App, item: &MediaItem) {
        handle_current_item_changed(app, Some(item.clone())).unwrap();
        let generation = app.load_generation;
        handle_load_item(app, item.clone(), Duration::ZERO, generation).unwrap();
    }

    #[test]
    fn previous_item_clock_is_not_saved_against_the_next_item() {
        let (mut app, task_rx) = test_app();
        let items = items(&["a", "b", "c"]);

        play(&mut app, &items[0]);
        handle_time_changed(&mut app, 120.0);

        // b is still being prepared while the engine plays on with a.
        handle_current_item_changed(&mut app, Some(items[1].clone())).unwrap();
        handle_time_changed(&mut app, 121.0);
        save_current_position(&mut app).unwrap();
        handle_current_item_changed(&mut app, Some(items[2].clone())).unwrap();

        assert_eq!(saved_positions(&task_rx), vec![(1, 120_000)]);
    }

    #[test]
    fn clock_is_tracked_again_once_the_item_loads() {
        let (mut app, task_rx) = test_app();
        let items = items(&["a", "b"]);

        play(&mut app, &items[0]);
        handle_time_changed(&mut app, 30.0);
        play(&mut app, &items[1]);
        handle_time_changed(&mut app, 4.0);
        save_current_position(&mut app).unwrap();

        assert_eq!(saved_positions(&task_rx), vec![(1, 30_000), (2, 4_000)]);
    }

    #[test]
    fn stale_load_leaves_the_clock_untracked() {
        let (mut app, task_rx) = test_app();
        let items = items(&["a", "b"]);

        handle_current_item_changed(&mut app, Some(items[0].clone())).unwrap();
        let stale = app.load_generation;
        handle_current_item_changed(&mut app, Some(items[1].clone())).unwrap();
        handle_load_item(&mut app, items[0].clone(), Duration::ZERO, stale).unwrap();
        handle_time_changed(&mut app, 10.0);
        save_current_position(&mut app).unwrap();

        assert!(saved_positions(&task_rx).is_empty());
    }
}
