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

//! Headless playback engine.
//!
//! Nothing is decoded. The engine keeps a playback clock for the loaded item
//! and reports progress and end of media exactly like the MPV engine does, so
//! the rest of the application behaves the same without `libmpv`.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    events::AppEvent,
    player::{PlayerCommand, PlayerState},
};

const TICK: Duration = Duration::from_millis(250);

const MAX_VOLUME: i32 = 100;

pub(crate) fn spawn_player_worker(command_rx: Receiver<PlayerCommand>, event_tx: Sender<AppEvent>) {
    let error_tx = event_tx.clone();

    thread::spawn(move || {
        if let Err(e) = player_worker(command_rx, event_tx) {
            let _ = error_tx.send(AppEvent::FatalError(format!("Player worker failure: {:?}", e)));
        }
    });
}

fn player_worker(command_rx: Receiver<PlayerCommand>, event_tx: Sender<AppEvent>) -> Result<()> {
    let mut engine = HeadlessEngine::new();
    let mut last_tick = Instant::now();

    loop {
        let events = match command_rx.recv_timeout(TICK) {
            Ok(command) => {
                // A newly loaded or restarted item starts its own clock.
                if restarts_clock(&command) {
                    last_tick = Instant::now();
                }
                engine.apply(command)
            }
            Err(RecvTimeoutError::Timeout) => vec![],
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };

        let now = Instant::now();
        let elapsed = now - last_tick;
        last_tick = now;

        for event in events.into_iter().chain(engine.advance(elapsed)) {
            event_tx.send(event).context("Failed to send player event")?;
        }
    }
}

fn restarts_clock(command: &PlayerCommand) -> bool {
    matches!(command, PlayerCommand::PlayFile { .. } | PlayerCommand::Restart)
}

struct HeadlessEngine {
    loaded: bool,
    duration: Duration,
    position: Duration,
    paused: bool,
    idle: bool,
    volume: i32,
    muted: bool,
    state: PlayerState,
}

impl HeadlessEngine {
    fn new() -> Self {
        Self {
            loaded: false,
            duration: Duration::ZERO,
            position: Duration::ZERO,
            paused: false,
            idle: true,
            volume: MAX_VOLUME,
            muted: false,
            state: PlayerState::Stopped,
        }
    }

    fn apply(&mut self, command: PlayerCommand) -> Vec<AppEvent> {
        debug!("Player command: {:?}", command);

        let mut events = vec![];

        match command {
            PlayerCommand::PlayFile {
                title,
                duration,
                start,
                ..
            } => {
                info!("Now playing {}", title);
                self.loaded = true;
                self.duration = duration;
                self.position = if duration.is_zero() { start } else { start.min(duration) };
                self.paused = false;
                self.idle = false;

                events.push(AppEvent::TitleChanged(title));
                events.push(AppEvent::DurationChanged(duration.as_secs()));
                events.push(AppEvent::TimeChanged(self.position.as_secs_f64()));
            }
            PlayerCommand::Restart if self.loaded => {
                self.position = Duration::ZERO;
                self.paused = false;
                self.idle = false;
                events.push(AppEvent::TimeChanged(0.0));
            }
            PlayerCommand::Restart => {}
            PlayerCommand::TogglePause => {
                if !self.idle {
                    self.paused = !self.paused;
                }
            }
            PlayerCommand::Seek(delta) => {
                if !self.idle {
                    let target = self.position.as_secs_f64() + f64::from(delta);
                    let mut position = Duration::from_secs_f64(target.max(0.0));
                    if !self.duration.is_zero() {
                        position = position.min(self.duration);
                    }
                    self.position = position;
                    events.push(AppEvent::TimeChanged(position.as_secs_f64()));
                }
            }
            PlayerCommand::Stop => {
                self.idle = true;
                self.position = Duration::ZERO;
            }
            PlayerCommand::AdjustVolume(delta) => {
                self.volume = (self.volume + delta).clamp(0, MAX_VOLUME);
                events.push(AppEvent::VolumeChanged(self.volume as u32));
            }
            PlayerCommand::ToggleMute => {
                self.muted = !self.muted;
                info!("Output {}", if self.muted { "muted" } else { "unmuted" });
            }
        }

        self.push_state_change(&mut events);
        events
    }

    /// Moves the clock forward, reporting progress and the end of the item.
    fn advance(&mut self, elapsed: Duration) -> Vec<AppEvent> {
        if self.idle || self.paused {
            return vec![];
        }

        self.position += elapsed;

        let mut events = vec![];

        if !self.duration.is_zero() && self.position >= self.duration {
            self.position = self.duration;
            self.idle = true;
            events.push(AppEvent::TimeChanged(self.position.as_secs_f64()));
            events.push(AppEvent::TrackFinished);
        } else {
            events.push(AppEvent::TimeChanged(self.position.as_secs_f64()));
        }

        self.push_state_change(&mut events);
        events
    }

    fn push_state_change(&mut self, events: &mut Vec<AppEvent>) {
        let state = PlayerState::from_flags(self.paused, self.idle);
        if state != self.state {
            self.state = state;
            events.push(AppEvent::PlayerStateChanged(state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(duration_secs: u64, start_secs: u64) -> PlayerCommand {
        PlayerCommand::PlayFile {
            filename: "/media/a.mp3".to_string(),
            title: "a".to_string(),
            duration: Duration::from_secs(duration_secs),
            start: Duration::from_secs(start_secs),
        }
    }

    #[test]
    fn playing_an_item_reports_title_and_state() {
        let mut engine = HeadlessEngine::new();
        let events = engine.apply(play(10, 0));

        assert!(matches!(&events[0], AppEvent::TitleChanged(t) if t == "a"));
        assert!(matches!(events[1], AppEvent::DurationChanged(10)));
        assert!(matches!(
            events.last(),
            Some(AppEvent::PlayerStateChanged(PlayerState::Playing))
        ));
    }

    #[test]
    fn clock_runs_to_the_end_of_the_item() {
        let mut engine = HeadlessEngine::new();
        engine.apply(play(2, 0));

        let events = engine.advance(Duration::from_secs(1));
        assert!(matches!(events.as_slice(), [AppEvent::TimeChanged(t)] if *t == 1.0));

        let events = engine.advance(Duration::from_secs(5));
        assert!(events.iter().any(|e| matches!(e, AppEvent::TrackFinished)));
        assert!(events
            .iter()
            .any(|e| matches!(e, AppEvent::PlayerStateChanged(PlayerState::Stopped))));

        assert!(engine.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut engine = HeadlessEngine::new();
        engine.apply(play(10, 3));
        engine.apply(PlayerCommand::TogglePause);

        assert!(engine.advance(Duration::from_secs(4)).is_empty());
        assert_eq!(engine.position, Duration::from_secs(3));
    }

    #[test]
    fn restart_and_seek_move_the_clock() {
        let mut engine = HeadlessEngine::new();
        engine.apply(play(10, 6));

        engine.apply(PlayerCommand::Seek(-20));
        assert_eq!(engine.position, Duration::ZERO);

        engine.apply(PlayerCommand::Seek(30));
        assert_eq!(engine.position, Duration::from_secs(10));

        engine.apply(PlayerCommand::Restart);
        assert_eq!(engine.position, Duration::ZERO);
    }

    #[test]
    fn unknown_duration_never_finishes() {
        let mut engine = HeadlessEngine::new();
        engine.apply(play(0, 0));

        let events = engine.advance(Duration::from_secs(3600));
        assert!(!events.iter().any(|e| matches!(e, AppEvent::TrackFinished)));
    }

    #[test]
    fn volume_is_clamped() {
        let mut engine = HeadlessEngine::new();
        let events = engine.apply(PlayerCommand::AdjustVolume(15));
        assert!(matches!(events.as_slice(), [AppEvent::VolumeChanged(100)]));

        let events = engine.apply(PlayerCommand::AdjustVolume(-150));
        assert!(matches!(events.as_slice(), [AppEvent::VolumeChanged(0)]));
    }

    #[test]
    fn only_loads_and_restarts_reset_the_clock() {
        assert!(restarts_clock(&play(10, 0)));
        assert!(restarts_clock(&PlayerCommand::Restart));
        assert!(!restarts_clock(&PlayerCommand::TogglePause));
        assert!(!restarts_clock(&PlayerCommand::Seek(5)));
    }

    #[test]
    fn time_spent_before_a_load_is_not_charged_to_the_new_item() {
        let (command_tx, command_rx) = std::sync::mpsc::channel();
        let (event_tx, event_rx) = std::sync::mpsc::channel();
        spawn_player_worker(command_rx, event_tx);

        thread::sleep(Duration::from_millis(200));
        command_tx.send(play(10, 5)).unwrap();

        let times: Vec<f64> = event_rx
            .iter()
            .filter_map(|e| match e {
                AppEvent::TimeChanged(t) => Some(t),
                _ => None,
            })
            .take(2)
            .collect();

        assert_eq!(times[0], 5.0);
        assert!(times[1] < 5.1, "clock started at {}", times[1]);
    }
}
