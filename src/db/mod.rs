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

//! Data access layer.
//!
//! This module handles all interactions with the SQLite database, including
//! schema creation and fetching media metadata. It uses cached statements
//! to optimize frequently executed queries.
//!
//! # Tables
//!
//! * `media` - Audio and video files found by the library scanner.
//! * `media_stats` - Play counts, saved positions and favourites.
//! * `playlists` / `playlist_items` - Named, ordered lists of media.
//! * `history` - One row per item started.
//! * `saved_queue` / `playback_state` - The queue as it was on exit.
//!
//! Everything except `media` is keyed by the durable id of a file rather than
//! a row id, so user data survives a rescan of the library.
//!
//! # Performance
//!
//! Most functions in this module use [`rusqlite::Connection::prepare_cached`]
//! to reduce SQL parsing overhead.

mod model;
pub(crate) mod scan;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{HistoryEntry, LoopMode, MediaItem, MediaKind, MediaStats, Playlist, SavedQueue};

const MEDIA_COLUMNS: &str =
    "m.durable_id, m.kind, m.title, m.artist, m.album, m.duration, m.filename, m.artwork";

/// Opens a connection to the SQLite database and configures performance settings.
///
/// This function performs the following setup:
/// * **WAL Mode**: Enables Write-Ahead Logging for better concurrency.
/// * **Performance Tuning**: Sets synchronous mode to `NORMAL` and increases the cache size.
/// * **Constraints**: Enforces foreign key integrity.
/// * **Schema**: Executes [`create_schema`] to ensure all tables and indices exist.
///
/// # Errors
///
/// Returns an error if:
/// * The database file cannot be opened.
/// * The initial PRAGMA configurations fail.
/// * The schema initialization fails.
pub(crate) fn init_db(path: &str) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;

    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
    if journal_mode != "wal" {
        anyhow::bail!(
            "Failed to switch to WAL mode. Current mode: {}",
            journal_mode
        );
    }

    conn.execute_batch(
        "
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -64000; -- Use 64MB of RAM for cache
    ",
    )?;

    conn.set_prepared_statement_cache_capacity(100);

    create_schema(&conn)?;

    Ok(conn)
}

/// Create the database schema.
///
/// This operation is wrapped in a single SQL transaction to ensure the schema
/// is updated atomically.
///
/// # Errors
///
/// Returns an error if the transaction fails, if there are permission issues
/// with the database file, or if the SQL syntax is invalid.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            durable_id INTEGER NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK (kind IN ('audio', 'video')),
            title TEXT NOT NULL COLLATE NOCASE,
            artist TEXT COLLATE NOCASE,
            album TEXT COLLATE NOCASE,
            duration INTEGER NOT NULL DEFAULT 0,
            filename TEXT NOT NULL UNIQUE,
            artwork TEXT,
            modified INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_media_kind ON media (kind);

        CREATE TABLE IF NOT EXISTS media_stats (
            durable_id INTEGER PRIMARY KEY,
            play_count INTEGER NOT NULL DEFAULT 0,
            last_played INTEGER,
            position INTEGER NOT NULL DEFAULT 0,
            favourite INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS playlists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL COLLATE NOCASE UNIQUE,
            created INTEGER NOT NULL DEFAULT (unixepoch())
        );

        CREATE TABLE IF NOT EXISTS playlist_items (
            playlist_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            durable_id INTEGER NOT NULL,
            PRIMARY KEY (playlist_id, position),
            FOREIGN KEY (playlist_id) REFERENCES playlists (id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            durable_id INTEGER NOT NULL,
            played_at INTEGER NOT NULL DEFAULT (unixepoch())
        );

        CREATE INDEX IF NOT EXISTS idx_history_played_at ON history (played_at);

        CREATE TABLE IF NOT EXISTS saved_queue (
            position INTEGER PRIMARY KEY,
            durable_id INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS playback_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            current_position INTEGER,
            loop_mode TEXT NOT NULL DEFAULT 'none',
            shuffled INTEGER NOT NULL DEFAULT 0
        );

        COMMIT;",
    )
    .context("Failed to create schema")
}

/// Fetches all media, optionally restricted to one kind, sorted for browsing.
pub(crate) fn fetch_media(conn: &Connection, kind: Option<MediaKind>) -> Result<Vec<MediaItem>> {
    let sql = format!(
        "SELECT {MEDIA_COLUMNS}
         FROM media m
         WHERE ?1 IS NULL OR m.kind = ?1
         ORDER BY m.kind, m.artist, m.album, m.title"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map(params![kind], MediaItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Fetches media by durable id.
///
/// The result follows the order of `ids`, including repeats. Ids that are not
/// in the library are skipped.
pub(crate) fn fetch_media_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<MediaItem>> {
    let sql = format!("SELECT {MEDIA_COLUMNS} FROM media m WHERE m.durable_id = ?");

    let mut stmt = conn.prepare_cached(&sql)?;

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = stmt.query_row([id], MediaItem::from_row).optional()? {
            results.push(item);
        }
    }

    Ok(results)
}

pub(crate) fn fetch_stats(conn: &Connection, durable_id: i64) -> Result<MediaStats> {
    let sql = "
        SELECT play_count, last_played, position, favourite
        FROM media_stats
        WHERE durable_id = ?";

    let mut stmt = conn.prepare_cached(sql)?;
    let stats = stmt
        .query_row([durable_id], MediaStats::from_row)
        .optional()?
        .unwrap_or_default();

    Ok(stats)
}

/// Counts a play of the item and appends it to the play history.
pub(crate) fn record_play(conn: &mut Connection, durable_id: i64) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO media_stats (durable_id, play_count, last_played)
         VALUES (?1, 1, unixepoch())
         ON CONFLICT (durable_id)
         DO UPDATE SET play_count = play_count + 1, last_played = unixepoch()",
        params![durable_id],
    )?;

    tx.execute(
        "INSERT INTO history (durable_id) VALUES (?1)",
        params![durable_id],
    )?;

    tx.commit().context("Failed to record play")
}

pub(crate) fn save_position(conn: &Connection, durable_id: i64, position: i64) -> Result<()> {
    let sql = "
        INSERT INTO media_stats (durable_id, position)
        VALUES (?1, ?2)
        ON CONFLICT (durable_id)
        DO UPDATE SET position = ?2";

    let mut stmt = conn.prepare_cached(sql)?;
    stmt.execute(params![durable_id, position.max(0)])?;

    Ok(())
}

/// Flips the favourite flag of an item and returns the new value.
pub(crate) fn toggle_favourite(conn: &Connection, durable_id: i64) -> Result<bool> {
    let sql = "
        INSERT INTO media_stats (durable_id, favourite)
        VALUES (?1, 1)
        ON CONFLICT (durable_id)
        DO UPDATE SET favourite = NOT favourite
        RETURNING favourite";

    let mut stmt = conn.prepare_cached(sql)?;
    let favourite = stmt.query_row(params![durable_id], |r| r.get(0))?;

    Ok(favourite)
}

pub(crate) fn fetch_favourites(conn: &Connection) -> Result<Vec<MediaItem>> {
    let sql = format!(
        "SELECT {MEDIA_COLUMNS}
         FROM media m
         JOIN media_stats s ON s.durable_id = m.durable_id
         WHERE s.favourite = 1
         ORDER BY m.kind, m.artist, m.album, m.title"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map([], MediaItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Fetches the most recent plays, newest first.
pub(crate) fn fetch_history(conn: &Connection, limit: usize) -> Result<Vec<HistoryEntry>> {
    let sql = format!(
        "SELECT {MEDIA_COLUMNS}, h.played_at
         FROM history h
         JOIN media m ON m.durable_id = h.durable_id
         ORDER BY h.played_at DESC, h.id DESC
         LIMIT ?"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map([limit as i64], HistoryEntry::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

pub(crate) fn create_playlist(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO playlists (name) VALUES (?1)", params![name])
        .with_context(|| format!("Failed to create playlist '{}'", name))?;

    Ok(conn.last_insert_rowid())
}

/// Deletes a playlist, returns `false` when no playlist has that name.
pub(crate) fn delete_playlist(conn: &Connection, name: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM playlists WHERE name = ?1", params![name])?;

    Ok(deleted > 0)
}

fn find_playlist(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare_cached("SELECT id FROM playlists WHERE name = ?")?;
    stmt.query_row([name], |r| r.get(0))
        .optional()?
        .with_context(|| format!("No playlist named '{}'", name))
}

/// Appends media to the end of a playlist, returns the number of items added.
///
/// Ids that are not in the library are ignored.
pub(crate) fn add_to_playlist(conn: &mut Connection, name: &str, ids: &[i64]) -> Result<usize> {
    let playlist_id = find_playlist(conn, name)?;
    let known = fetch_media_by_ids(conn, ids)?;

    let tx = conn.transaction()?;

    let next_position: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_items WHERE playlist_id = ?",
        [playlist_id],
        |r| r.get(0),
    )?;

    for (offset, item) in known.iter().enumerate() {
        tx.execute(
            "INSERT INTO playlist_items (playlist_id, position, durable_id) VALUES (?1, ?2, ?3)",
            params![playlist_id, next_position + offset as i64, item.id],
        )?;
    }

    tx.commit().context("Failed to update playlist")?;

    Ok(known.len())
}

/// Fetches the items of a playlist in order.
///
/// Entries whose file is no longer in the library are left out.
pub(crate) fn fetch_playlist_items(conn: &Connection, name: &str) -> Result<Vec<MediaItem>> {
    let playlist_id = find_playlist(conn, name)?;

    let sql = format!(
        "SELECT {MEDIA_COLUMNS}
         FROM playlist_items p
         JOIN media m ON m.durable_id = p.durable_id
         WHERE p.playlist_id = ?
         ORDER BY p.position"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map([playlist_id], MediaItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

pub(crate) fn fetch_playlists(conn: &Connection) -> Result<Vec<Playlist>> {
    let sql = "
        SELECT p.id, p.name, COUNT(i.durable_id)
        FROM playlists p
        LEFT JOIN playlist_items i ON i.playlist_id = p.id
        GROUP BY p.id
        ORDER BY p.name";

    let mut stmt = conn.prepare_cached(sql)?;
    let results = stmt
        .query_map([], |row| {
            Ok(Playlist {
                id: row.get(0)?,
                name: row.get(1)?,
                item_count: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Replaces the saved queue.
pub(crate) fn save_queue(conn: &mut Connection, queue: &SavedQueue) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM saved_queue", [])?;

    for (position, item) in queue.items.iter().enumerate() {
        tx.execute(
            "INSERT INTO saved_queue (position, durable_id) VALUES (?1, ?2)",
            params![position as i64, item.id],
        )?;
    }

    tx.execute(
        "INSERT INTO playback_state (id, current_position, loop_mode, shuffled)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT (id)
         DO UPDATE SET current_position = ?1, loop_mode = ?2, shuffled = ?3",
        params![
            queue.current.map(|c| c as i64),
            queue.loop_mode,
            queue.shuffled
        ],
    )?;

    tx.commit().context("Failed to save queue")
}

/// Loads the saved queue.
///
/// Items whose files have left the library are dropped. If the saved current
/// item is one of them, the item that followed it becomes current.
pub(crate) fn load_queue(conn: &Connection) -> Result<SavedQueue> {
    let state: Option<(Option<i64>, LoopMode, bool)> = conn
        .query_row(
            "SELECT current_position, loop_mode, shuffled FROM playback_state WHERE id = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;

    let Some((current_position, loop_mode, shuffled)) = state else {
        return Ok(SavedQueue::default());
    };

    let sql = format!(
        "SELECT q.position, {MEDIA_COLUMNS}
         FROM saved_queue q
         JOIN media m ON m.durable_id = q.durable_id
         ORDER BY q.position"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let position: i64 = row.get(0)?;
            Ok((position, MediaItem::from_row_at(row, 1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let current = match current_position {
        Some(saved) if !rows.is_empty() => Some(
            rows.iter()
                .position(|(position, _)| *position >= saved)
                .unwrap_or(rows.len() - 1),
        ),
        _ => None,
    };

    Ok(SavedQueue {
        items: rows.into_iter().map(|(_, item)| item).collect(),
        current,
        loop_mode,
        shuffled,
    })
}
