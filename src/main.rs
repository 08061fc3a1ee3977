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

//! # Media Player.
//!
//! An audio and video library manager and player driven from the console.
//!
//! It uses an event-driven architecture where:
//!
//! * The **Main Thread** owns the playback queue and applies every event to
//!   the application state.
//! * **Background Workers** handle database queries, library scans and
//!   playback via asynchronous command processing.
//! * **Input and Tick Threads** capture console lines and system ticks to
//!   drive the state forward.
//!
//! ## Architecture
//!
//! Communication between the event loop and background workers is handled via
//! `std::sync::mpsc` channels. On exit the queue is handed to the task worker
//! to be saved, and the worker is joined so the write is not lost.
//!
//! Diagnostics are logged to stderr, set `RUST_LOG` to change the level.
//! Stdout is reserved for console output.

mod commander;
mod config;
mod db;
mod events;
mod model;
mod player;
mod tasks;
mod util;

use anyhow::{Context, Result, anyhow};
use env_logger::Env;
use log::{info, warn};
use std::{
    io::{self, BufRead},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    config::AppConfig,
    events::{AppEvent, process_events},
    model::{MediaItem, catalog::Catalog, queue::Queue},
    player::{MediaPlayer, PlayerState},
    tasks::AppTask,
};

const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Application state.
struct App {
    pub config: AppConfig,

    pub event_tx: Sender<AppEvent>,
    pub event_rx: Receiver<AppEvent>,

    pub task_tx: Sender<AppTask>,

    pub player: MediaPlayer,

    pub queue: Queue<Sender<AppEvent>>,
    pub catalog: Catalog,

    pub player_state: PlayerState,
    pub now_playing: Option<MediaItem>,
    pub player_title: Option<String>,
    pub player_duration: Option<u64>,
    pub player_time: Option<f64>,
    pub volume: Option<u32>,

    /// Bumped whenever the current item changes, loads tagged with an older
    /// value are discarded.
    pub load_generation: u64,
    /// The engine clock belongs to `now_playing`. Cleared on every change of
    /// item until the engine has been told to load the new one.
    pub clock_valid: bool,
    /// The engine has nothing loaded, a restart has to load the item again.
    pub needs_reload: bool,
    pub last_position_save: Instant,
}

impl App {
    /// Create a new instance of application state.
    pub fn new(config: AppConfig, task_tx: Sender<AppTask>) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel();

        let player = MediaPlayer::new(event_tx.clone())?;
        let queue = Queue::new(event_tx.clone());

        Ok(Self {
            config,
            event_tx,
            event_rx,
            task_tx,
            player,
            queue,
            catalog: Catalog::new(),
            player_state: PlayerState::Stopped,
            now_playing: None,
            player_title: None,
            player_duration: None,
            player_time: None,
            volume: None,
            load_generation: 0,
            clock_valid: false,
            needs_reload: true,
            last_position_save: Instant::now(),
        })
    }
}

/// The entry point of the application.
///
/// Sets up logging and the communication channels, initializes the
/// application state, runs the event loop and returns an error if any part of
/// the execution fails.
fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::load_config();

    let (task_tx, task_rx) = mpsc::channel();

    let mut app = App::new(config, task_tx).context("Failed to initialise application")?;

    run(&mut app, task_rx).context("Application error occurred")
}

/// Starts the application's background workers and enters the main event loop.
///
/// This function spawns several long-running background threads:
/// * A task worker to process asynchronous [`AppTask`]s.
/// * An input thread to read console commands.
/// * A tick thread to trigger periodic position saves.
///
/// After spawning the workers, it hands control to [`process_events`] and
/// shuts the task worker down once the event loop ends.
fn run(app: &mut App, task_rx: Receiver<AppTask>) -> Result<()> {
    let task_event_tx = app.event_tx.clone();
    let task_worker = tasks::spawn_task_worker(&app.config, task_rx, task_event_tx);

    // Spawn a thread to translate console lines to application events.
    let tx_input = app.event_tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx_input.send(AppEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
        // End of input ends the session like 'q' does.
        let _ = tx_input.send(AppEvent::ExitApplication);
    });

    let tx_tick = app.event_tx.clone();
    thread::spawn(move || {
        while tx_tick.send(AppEvent::Tick).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });

    if app.config.restore_queue {
        app.task_tx.send(AppTask::RestoreQueue)?;
    }

    println!("Type 'help' for a list of commands");

    let res = process_events(app);

    shutdown(app, task_worker)?;

    res
}

/// Saves the queue and playback position, then waits for the task worker to
/// finish writing them.
fn shutdown(app: &mut App, task_worker: JoinHandle<()>) -> Result<()> {
    info!("Shutting down");

    // The worker may already be gone after a fatal error, there is nothing
    // left to save to in that case.
    if events::save_position_on_exit(app).is_ok() {
        let _ = app.task_tx.send(AppTask::SaveQueue(app.queue.saved()));
        let _ = app.task_tx.send(AppTask::Shutdown);
    }

    task_worker
        .join()
        .map_err(|_| anyhow!("Task worker panicked"))?;

    let _ = app.player.stop();

    Ok(())
}
