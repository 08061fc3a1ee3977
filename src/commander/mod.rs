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

//! Console command parsing.
//!
//! Each line typed at the console is split on whitespace and matched against
//! the known command shapes. Parsing is pure, dispatching the resulting
//! [`Command`] is left to the event handlers.
//!
//! Queue positions are entered 1-based, as shown by the `queue` listing, and
//! converted to 0-based indices here.

use thiserror::Error;

use crate::model::{LoopMode, MediaKind};

pub(crate) const HELP: &str = "\
Library:   scan | ls [audio|video] | dirs | dir add <path> | dir rm <path>
Queue:     play [<ids..>] | play all [audio|video] [n] | add <ids..> | rm <ids..>
           next | prev | jump <n> | shuffle | loop none|all|one | clear | queue
Playback:  pause | stop | seek <+-secs> | vol <+-delta> | mute | status
Personal:  fav <id> | favs | history
Playlists: pl ls [name] | pl new <name> | pl add <name> <ids..> | pl play <name> | pl rm <name>
           q to quit";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Scan,
    List(Option<MediaKind>),
    /// Replay the current queue item.
    PlayCurrent,
    Play(Vec<i64>),
    PlayAll {
        kind: Option<MediaKind>,
        start: usize,
    },
    Add(Vec<i64>),
    Remove(Vec<i64>),
    Next,
    Previous,
    Jump(usize),
    Shuffle,
    Loop(LoopMode),
    Clear,
    Queue,
    Status,
    Pause,
    Stop,
    Seek(i32),
    Volume(i32),
    Mute,
    Favourite(i64),
    Favourites,
    History,
    PlaylistList(Option<String>),
    PlaylistNew(String),
    PlaylistAdd(String, Vec<i64>),
    PlaylistPlay(String),
    PlaylistRemove(String),
    Dirs,
    DirAdd(String),
    DirRemove(String),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum CommandError {
    #[error("No command given")]
    Empty,
    #[error("Unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Not a media id: {0}")]
    InvalidId(String),
    #[error("Not a number: {0}")]
    InvalidNumber(String),
    #[error("Unknown loop mode '{0}', expected none, all or one")]
    InvalidLoopMode(String),
    #[error("Queue positions start at 1")]
    ZeroPosition,
}

/// Parses one line of console input.
pub(crate) fn parse_command(line: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let command = match parts.as_slice() {
        [] => return Err(CommandError::Empty),

        ["q"] | ["quit"] | ["exit"] => Command::Quit,
        ["help"] | ["?"] => Command::Help,

        ["scan"] => Command::Scan,
        ["ls"] => Command::List(None),
        ["ls", kind] => Command::List(Some(parse_kind(kind, "ls [audio|video]")?)),

        ["dirs"] => Command::Dirs,
        ["dir", "add", path @ ..] if !path.is_empty() => Command::DirAdd(path.join(" ")),
        ["dir", "rm", path @ ..] if !path.is_empty() => Command::DirRemove(path.join(" ")),
        ["dir", ..] => return Err(CommandError::Usage("dir add <path> | dir rm <path>")),

        ["play"] => Command::PlayCurrent,
        ["play", "all", rest @ ..] => parse_play_all(rest)?,
        ["play", ids @ ..] => Command::Play(parse_ids(ids)?),
        ["add", ids @ ..] if !ids.is_empty() => Command::Add(parse_ids(ids)?),
        ["add"] => return Err(CommandError::Usage("add <ids..>")),
        ["rm", ids @ ..] if !ids.is_empty() => Command::Remove(parse_ids(ids)?),
        ["rm"] => return Err(CommandError::Usage("rm <ids..>")),

        ["next"] | ["n"] => Command::Next,
        ["prev"] | ["p"] => Command::Previous,
        ["jump", n] => Command::Jump(parse_position(n)?),
        ["jump", ..] => return Err(CommandError::Usage("jump <n>")),
        ["shuffle"] => Command::Shuffle,
        ["loop", mode] => Command::Loop(
            LoopMode::parse(mode).ok_or_else(|| CommandError::InvalidLoopMode(mode.to_string()))?,
        ),
        ["loop", ..] => return Err(CommandError::Usage("loop none|all|one")),
        ["clear"] => Command::Clear,
        ["queue"] => Command::Queue,
        ["status"] => Command::Status,

        ["pause"] => Command::Pause,
        ["stop"] => Command::Stop,
        ["seek", delta] => Command::Seek(parse_number(delta)?),
        ["seek", ..] => return Err(CommandError::Usage("seek <+-secs>")),
        ["vol", delta] => Command::Volume(parse_number(delta)?),
        ["vol", ..] => return Err(CommandError::Usage("vol <+-delta>")),
        ["mute"] => Command::Mute,

        ["fav", id] => Command::Favourite(parse_id(id)?),
        ["fav", ..] => return Err(CommandError::Usage("fav <id>")),
        ["favs"] => Command::Favourites,
        ["history"] => Command::History,

        ["pl", "ls"] => Command::PlaylistList(None),
        ["pl", "ls", name @ ..] => Command::PlaylistList(Some(name.join(" "))),
        ["pl", "new", name @ ..] if !name.is_empty() => Command::PlaylistNew(name.join(" ")),
        ["pl", "add", rest @ ..] if rest.len() > 1 => parse_playlist_add(rest)?,
        ["pl", "play", name @ ..] if !name.is_empty() => Command::PlaylistPlay(name.join(" ")),
        ["pl", "rm", name @ ..] if !name.is_empty() => Command::PlaylistRemove(name.join(" ")),
        ["pl", ..] => {
            return Err(CommandError::Usage(
                "pl ls [name] | pl new <name> | pl add <name> <ids..> | pl play <name> | pl rm <name>",
            ));
        }

        [other, ..] => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(command)
}

fn parse_play_all(rest: &[&str]) -> Result<Command, CommandError> {
    const USAGE: &str = "play all [audio|video] [n]";

    let (kind, start) = match rest {
        [] => (None, 0),
        [n] if n.chars().all(|c| c.is_ascii_digit()) => (None, parse_position(n)?),
        [kind] => (Some(parse_kind(kind, USAGE)?), 0),
        [kind, n] => (Some(parse_kind(kind, USAGE)?), parse_position(n)?),
        _ => return Err(CommandError::Usage(USAGE)),
    };

    Ok(Command::PlayAll { kind, start })
}

/// The trailing run of ids follows a name that may contain spaces.
fn parse_playlist_add(rest: &[&str]) -> Result<Command, CommandError> {
    let split = rest
        .iter()
        .rposition(|v| v.parse::<i64>().is_err())
        .map_or(1, |last_word| last_word + 1);

    let (name, ids) = rest.split_at(split.min(rest.len() - 1));
    Ok(Command::PlaylistAdd(name.join(" "), parse_ids(ids)?))
}

fn parse_kind(value: &str, usage: &'static str) -> Result<MediaKind, CommandError> {
    MediaKind::parse(value).ok_or(CommandError::Usage(usage))
}

fn parse_ids(values: &[&str]) -> Result<Vec<i64>, CommandError> {
    if values.is_empty() {
        return Err(CommandError::Usage("play <ids..>"));
    }
    values.iter().map(|v| parse_id(v)).collect()
}

fn parse_id(value: &str) -> Result<i64, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::InvalidId(value.to_string()))
}

fn parse_number(value: &str) -> Result<i32, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::InvalidNumber(value.to_string()))
}

/// Converts a 1-based queue position to an index.
fn parse_position(value: &str) -> Result<usize, CommandError> {
    let position: usize = value
        .parse()
        .map_err(|_| CommandError::InvalidNumber(value.to_string()))?;

    position.checked_sub(1).ok_or(CommandError::ZeroPosition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command("next"), Ok(Command::Next));
        assert_eq!(parse_command("  prev  "), Ok(Command::Previous));
        assert_eq!(parse_command("shuffle"), Ok(Command::Shuffle));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert_eq!(parse_command("play"), Ok(Command::PlayCurrent));
    }

    #[test]
    fn blank_and_unknown_input() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("dance now"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn listing_by_kind() {
        assert_eq!(parse_command("ls"), Ok(Command::List(None)));
        assert_eq!(
            parse_command("ls video"),
            Ok(Command::List(Some(MediaKind::Video)))
        );
        assert!(matches!(
            parse_command("ls pictures"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn ids_accept_negative_values() {
        assert_eq!(
            parse_command("play 12 -7 12"),
            Ok(Command::Play(vec![12, -7, 12]))
        );
        assert_eq!(
            parse_command("add 3 x"),
            Err(CommandError::InvalidId("x".to_string()))
        );
        assert!(matches!(parse_command("rm"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn play_all_variants() {
        assert_eq!(
            parse_command("play all"),
            Ok(Command::PlayAll {
                kind: None,
                start: 0
            })
        );
        assert_eq!(
            parse_command("play all 4"),
            Ok(Command::PlayAll {
                kind: None,
                start: 3
            })
        );
        assert_eq!(
            parse_command("play all audio 2"),
            Ok(Command::PlayAll {
                kind: Some(MediaKind::Audio),
                start: 1
            })
        );
    }

    #[test]
    fn jump_positions_are_one_based() {
        assert_eq!(parse_command("jump 1"), Ok(Command::Jump(0)));
        assert_eq!(parse_command("jump 0"), Err(CommandError::ZeroPosition));
        assert_eq!(
            parse_command("jump -1"),
            Err(CommandError::InvalidNumber("-1".to_string()))
        );
    }

    #[test]
    fn loop_modes() {
        assert_eq!(parse_command("loop all"), Ok(Command::Loop(LoopMode::All)));
        assert_eq!(parse_command("loop off"), Ok(Command::Loop(LoopMode::None)));
        assert_eq!(
            parse_command("loop twice"),
            Err(CommandError::InvalidLoopMode("twice".to_string()))
        );
    }

    #[test]
    fn relative_adjustments() {
        assert_eq!(parse_command("seek +30"), Ok(Command::Seek(30)));
        assert_eq!(parse_command("seek -10"), Ok(Command::Seek(-10)));
        assert_eq!(parse_command("vol -5"), Ok(Command::Volume(-5)));
    }

    #[test]
    fn playlist_commands_keep_names_with_spaces() {
        assert_eq!(
            parse_command("pl new Road Trip"),
            Ok(Command::PlaylistNew("Road Trip".to_string()))
        );
        assert_eq!(
            parse_command("pl play Road Trip"),
            Ok(Command::PlaylistPlay("Road Trip".to_string()))
        );
        assert_eq!(
            parse_command("pl add mix 1 2"),
            Ok(Command::PlaylistAdd("mix".to_string(), vec![1, 2]))
        );
        assert_eq!(parse_command("pl ls"), Ok(Command::PlaylistList(None)));
        assert_eq!(
            parse_command("pl add Road Trip 1 2"),
            Ok(Command::PlaylistAdd("Road Trip".to_string(), vec![1, 2]))
        );
        assert_eq!(
            parse_command("pl add 2024 5"),
            Ok(Command::PlaylistAdd("2024".to_string(), vec![5]))
        );
        assert!(matches!(parse_command("pl add mix"), Err(CommandError::Usage(_))));
        assert!(matches!(
            parse_command("pl add Road Trip"),
            Err(CommandError::InvalidId(id)) if id == "Trip"
        ));
    }

    #[test]
    fn directory_commands() {
        assert_eq!(parse_command("dirs"), Ok(Command::Dirs));
        assert_eq!(
            parse_command("dir add /media/My Music"),
            Ok(Command::DirAdd("/media/My Music".to_string()))
        );
        assert!(matches!(parse_command("dir"), Err(CommandError::Usage(_))));
    }
}
