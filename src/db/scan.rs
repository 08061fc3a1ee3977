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

//! Media library indexing and database persistence.
//!
//! This module handles the discovery of audio and video files on the local
//! filesystem and the management of the associated database records.
//!
//! It utilizes `WalkDir` for directory traversal and `Lofty` for metadata
//! extraction.
//!
//! A scan is incremental: every file found is upserted by path, files whose
//! modification time has not changed are not re-read, and records for files
//! that have disappeared from a scanned directory are removed. Play
//! statistics, playlists and history are keyed by the durable id of a file,
//! a hash of its path, so they survive rescans.
//!
//! # Performance
//!
//! Library scans are performed within an atomic SQLite transaction to
//! maximize write throughput and ensure database integrity.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use walkdir::{DirEntry, WalkDir};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::AppConfig;
use crate::model::MediaKind;

const ARTWORK_NAMES: [&str; 6] = [
    "cover.jpg",
    "cover.png",
    "folder.jpg",
    "folder.png",
    "front.jpg",
    "front.png",
];

/// Progress reports emitted while a scan runs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScanProgress {
    Started(Vec<String>),
    StartedDirectory(String),
    /// Files processed so far in the current directory, and the latest one.
    ProcessedFile(usize, String),
    FinishedDirectory(String),
    /// Total number of media records after the scan.
    Finished(i64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ScanSummary {
    /// Files whose metadata was (re)read.
    pub(crate) scanned: usize,
    /// Files already indexed with an unchanged modification time.
    pub(crate) unchanged: usize,
    /// Records deleted because their file is gone.
    pub(crate) removed: usize,
    pub(crate) total: i64,
}

/// The filtering rules of a scan.
#[derive(Debug, Clone)]
pub(crate) struct ScanOptions {
    pub(crate) audio_extensions: HashSet<String>,
    pub(crate) video_extensions: HashSet<String>,
    pub(crate) include_hidden: bool,
    pub(crate) excluded_dirs: Vec<String>,
}

impl From<&AppConfig> for ScanOptions {
    fn from(config: &AppConfig) -> Self {
        let lowercase = |exts: &[String]| -> HashSet<String> {
            exts.iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        };

        Self {
            audio_extensions: lowercase(&config.audio_extensions),
            video_extensions: lowercase(&config.video_extensions),
            include_hidden: config.include_hidden,
            excluded_dirs: config.excluded_dirs.clone(),
        }
    }
}

impl ScanOptions {
    fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();

        if self.audio_extensions.contains(&ext) {
            Some(MediaKind::Audio)
        } else if self.video_extensions.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Whether the walk should skip this entry, and everything below it.
    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }

        let name = entry.file_name().to_string_lossy();

        if !self.include_hidden && name.starts_with('.') {
            return true;
        }

        entry.file_type().is_dir()
            && self
                .excluded_dirs
                .iter()
                .any(|excluded| *name == **excluded || entry.path() == Path::new(excluded))
    }
}

/// The durable identifier of a media file, stable for as long as its path is.
pub(crate) fn durable_id(filename: &str) -> i64 {
    xxh3_64(filename.as_bytes()) as i64
}

struct MediaRecord {
    title: String,
    artist: Option<String>,
    album: Option<String>,
    duration: i64,
}

/// Scans the media directories and synchronizes the database.
///
/// Directories that do not exist are reported and skipped, their records are
/// left alone so an unmounted drive does not wipe part of the library.
///
/// # Arguments
///
/// * `conn` - A mutable reference to the SQLite database connection.
/// * `roots` - The directories containing the media library.
/// * `options` - Extension, hidden file and exclusion rules.
/// * `progress` - Called with a [`ScanProgress`] report as the scan proceeds.
///
/// # Errors
///
/// Returns an error if the transaction fails or if database constraints are
/// violated during insertion.
pub(crate) fn process_media_library<F>(
    conn: &mut Connection,
    roots: &[String],
    options: &ScanOptions,
    mut progress: F,
) -> Result<ScanSummary>
where
    F: FnMut(ScanProgress),
{
    let mut summary = ScanSummary::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut walked_roots: Vec<PathBuf> = Vec::new();
    let mut artwork_cache: HashMap<PathBuf, Option<String>> = HashMap::new();

    progress(ScanProgress::Started(roots.to_vec()));

    let tx = conn.transaction()?;

    for root in roots {
        progress(ScanProgress::StartedDirectory(root.clone()));

        let root_path = Path::new(root);
        if !root_path.is_dir() {
            warn!("Skipping media directory {}: not a directory", root);
            progress(ScanProgress::FinishedDirectory(root.clone()));
            continue;
        }
        walked_roots.push(root_path.to_path_buf());

        let mut count = 0;

        let entries = WalkDir::new(root_path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !options.is_pruned(e));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root, e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(kind) = options.classify(path) else {
                continue;
            };

            let Some(filename) = path.to_str() else {
                warn!("Skipping {}: path is not valid UTF-8", path.display());
                continue;
            };

            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_secs() as i64);

            seen.insert(filename.to_string());
            count += 1;

            if indexed_modified(&tx, filename)? == Some(modified) {
                summary.unchanged += 1;
            } else {
                let record = read_metadata(path, kind);
                let artwork = path
                    .parent()
                    .and_then(|dir| find_artwork(&mut artwork_cache, dir));

                upsert_media(&tx, filename, kind, &record, artwork, modified)?;
                summary.scanned += 1;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            progress(ScanProgress::ProcessedFile(count, name));
        }

        progress(ScanProgress::FinishedDirectory(root.clone()));
    }

    summary.removed = remove_missing(&tx, &walked_roots, &seen)?;

    tx.commit().context("Failed to commit transaction")?;

    summary.total = conn.query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;

    info!(
        "Library scan finished: {} read, {} unchanged, {} removed, {} total",
        summary.scanned, summary.unchanged, summary.removed, summary.total
    );

    progress(ScanProgress::Finished(summary.total));

    Ok(summary)
}

fn indexed_modified(tx: &Transaction, filename: &str) -> Result<Option<i64>> {
    let mut stmt = tx.prepare_cached("SELECT modified FROM media WHERE filename = ?")?;
    let modified = stmt.query_row([filename], |r| r.get(0)).optional()?;

    Ok(modified)
}

fn upsert_media(
    tx: &Transaction,
    filename: &str,
    kind: MediaKind,
    record: &MediaRecord,
    artwork: Option<String>,
    modified: i64,
) -> Result<()> {
    let sql = "
        INSERT INTO media (durable_id, kind, title, artist, album, duration, filename, artwork, modified)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT (filename)
        DO UPDATE SET
            kind = excluded.kind,
            title = excluded.title,
            artist = excluded.artist,
            album = excluded.album,
            duration = excluded.duration,
            artwork = excluded.artwork,
            modified = excluded.modified";

    let mut stmt = tx.prepare_cached(sql)?;
    stmt.execute(params![
        durable_id(filename),
        kind,
        record.title,
        record.artist,
        record.album,
        record.duration,
        filename,
        artwork,
        modified
    ])
    .with_context(|| format!("Failed to index {}", filename))?;

    Ok(())
}

/// Deletes records under the walked roots whose files were not seen.
fn remove_missing(tx: &Transaction, roots: &[PathBuf], seen: &HashSet<String>) -> Result<usize> {
    let filenames = {
        let mut stmt = tx.prepare_cached("SELECT filename FROM media")?;
        stmt.query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut removed = 0;
    for filename in filenames {
        let under_root = roots.iter().any(|root| Path::new(&filename).starts_with(root));
        if under_root && !seen.contains(&filename) {
            debug!("Removing missing file {}", filename);
            removed += tx.execute("DELETE FROM media WHERE filename = ?", [&filename])?;
        }
    }

    Ok(removed)
}

/// Reads title, artist, album and duration from the file.
///
/// Files without readable tags are still indexed, titled after the file
/// name. The album artist takes precedence over the track artist.
fn read_metadata(path: &Path, kind: MediaKind) -> MediaRecord {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut record = MediaRecord {
        title: stem,
        artist: None,
        album: None,
        duration: 0,
    };

    let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
        Ok(file) => file,
        Err(e) => {
            debug!("No readable {} metadata in {}: {}", kind, path.display(), e);
            return record;
        }
    };

    record.duration = i64::try_from(tagged_file.properties().duration().as_millis()).unwrap_or(0);

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return record;
    };

    if let Some(title) = tag.title().filter(|t| !t.trim().is_empty()) {
        record.title = title.to_string();
    }

    let album_artist = tag
        .items()
        .find(|item| matches!(item.key(), ItemKey::AlbumArtist))
        .and_then(|item| item.value().text())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string());

    record.artist = album_artist.or_else(|| tag.artist().map(|a| a.to_string()));
    record.album = tag.album().map(|a| a.to_string());

    record
}

/// Looks for a cover image next to the media file.
fn find_artwork(cache: &mut HashMap<PathBuf, Option<String>>, dir: &Path) -> Option<String> {
    cache
        .entry(dir.to_path_buf())
        .or_insert_with(|| {
            ARTWORK_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
                .and_then(|p| p.to_str().map(String::from))
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use lofty::{
        config::WriteOptions,
        tag::{Tag, TagType},
    };
    use tempfile::TempDir;

    use super::*;
    use crate::db::{self, tests::TestDb};

    fn options() -> ScanOptions {
        ScanOptions::from(&AppConfig::default())
    }

    fn touch(root: &Path, relative: &str) -> String {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not really media").unwrap();
        path.to_str().unwrap().to_string()
    }

    /// One second of 16-bit mono silence at 8 kHz, tagged with ID3v2.
    fn tagged_wav(root: &Path, relative: &str, tags: &[(ItemKey, &str)]) -> String {
        const SAMPLE_RATE: u32 = 8000;
        let data_len = SAMPLE_RATE * 2;

        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        wav.resize(wav.len() + data_len as usize, 0);

        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, wav).unwrap();

        let mut tag = Tag::new(TagType::Id3v2);
        for (key, value) in tags {
            tag.insert_text(key.clone(), value.to_string());
        }
        tag.save_to_path(&path, WriteOptions::default()).unwrap();

        path.to_str().unwrap().to_string()
    }

    fn scan(db: &mut TestDb, root: &TempDir, options: &ScanOptions) -> (ScanSummary, Vec<ScanProgress>) {
        let roots = vec![root.path().to_str().unwrap().to_string()];
        let mut reports = Vec::new();
        let summary =
            process_media_library(&mut db.conn, &roots, options, |p| reports.push(p)).unwrap();
        (summary, reports)
    }

    fn indexed(db: &TestDb) -> Vec<String> {
        let mut titles: Vec<String> = db::fetch_media(&db.conn, None)
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        titles.sort();
        titles
    }

    #[test]
    fn indexes_audio_and_video_by_extension() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "album/song.MP3");
        touch(root.path(), "clips/holiday.mkv");
        touch(root.path(), "notes.txt");

        let (summary, _) = scan(&mut db, &root, &options());

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(indexed(&db), vec!["holiday", "song"]);

        let videos = db::fetch_media(&db.conn, Some(MediaKind::Video)).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].duration, 0);
    }

    #[test]
    fn skips_hidden_and_excluded_directories() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "keep/a.mp3");
        touch(root.path(), ".cache/b.mp3");
        touch(root.path(), "keep/.c.mp3");
        touch(root.path(), "Podcasts/d.mp3");
        let excluded_path = touch(root.path(), "private/e.mp4");

        let mut options = options();
        options.excluded_dirs = vec![
            "Podcasts".to_string(),
            Path::new(&excluded_path).parent().unwrap().to_str().unwrap().to_string(),
        ];

        scan(&mut db, &root, &options);
        assert_eq!(indexed(&db), vec!["a"]);
    }

    #[test]
    fn includes_hidden_files_when_asked() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), ".hidden/a.mp3");

        let mut options = options();
        options.include_hidden = true;

        scan(&mut db, &root, &options);
        assert_eq!(indexed(&db), vec!["a"]);
    }

    #[test]
    fn rescan_keeps_durable_ids_and_prunes_missing_files() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        let kept = touch(root.path(), "a.mp3");
        let gone = touch(root.path(), "b.mp3");

        scan(&mut db, &root, &options());
        db::toggle_favourite(&db.conn, durable_id(&kept)).unwrap();

        fs::remove_file(&gone).unwrap();
        let (summary, _) = scan(&mut db, &root, &options());

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.scanned, 0);
        assert_eq!(indexed(&db), vec!["a"]);

        let favourites = db::fetch_favourites(&db.conn).unwrap();
        assert_eq!(favourites.len(), 1);
        assert_eq!(favourites[0].id, durable_id(&kept));
    }

    #[test]
    fn missing_root_does_not_prune_records() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "a.mp3");
        scan(&mut db, &root, &options());

        let missing = vec![root.path().join("unmounted").to_str().unwrap().to_string()];
        let summary = process_media_library(&mut db.conn, &missing, &options(), |_| {}).unwrap();

        assert_eq!(summary.removed, 0);
        assert_eq!(summary.total, 1);
    }

    #[test]
    fn picks_up_cover_art_next_to_media() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "album/a.flac");
        let cover = touch(root.path(), "album/cover.jpg");

        scan(&mut db, &root, &options());

        let items = db::fetch_media(&db.conn, None).unwrap();
        assert_eq!(items[0].artwork.as_deref(), Some(cover.as_str()));
    }

    #[test]
    fn reports_progress_in_order() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "a.mp3");
        touch(root.path(), "b.mp3");

        let (_, reports) = scan(&mut db, &root, &options());
        let root_name = root.path().to_str().unwrap().to_string();

        assert_eq!(reports.first(), Some(&ScanProgress::Started(vec![root_name.clone()])));
        assert_eq!(reports[1], ScanProgress::StartedDirectory(root_name.clone()));
        assert!(matches!(reports[3], ScanProgress::ProcessedFile(2, _)));
        assert_eq!(reports[4], ScanProgress::FinishedDirectory(root_name));
        assert_eq!(reports.last(), Some(&ScanProgress::Finished(2)));
    }

    #[test]
    fn album_artist_takes_precedence_over_track_artist() {
        let root = tempfile::tempdir().unwrap();
        let path = tagged_wav(
            root.path(),
            "album/track.wav",
            &[
                (ItemKey::TrackTitle, "Opening"),
                (ItemKey::TrackArtist, "Guest Singer"),
                (ItemKey::AlbumArtist, "The Band"),
                (ItemKey::AlbumTitle, "First Record"),
            ],
        );

        let record = read_metadata(Path::new(&path), MediaKind::Audio);

        assert_eq!(record.title, "Opening");
        assert_eq!(record.artist.as_deref(), Some("The Band"));
        assert_eq!(record.album.as_deref(), Some("First Record"));
        assert!((990..=1010).contains(&record.duration), "{}", record.duration);
    }

    #[test]
    fn track_artist_is_used_without_album_artist() {
        let mut db = TestDb::new();
        let root = tempfile::tempdir().unwrap();
        tagged_wav(
            root.path(),
            "single.wav",
            &[
                (ItemKey::TrackTitle, "Solo"),
                (ItemKey::TrackArtist, "Guest Singer"),
            ],
        );

        scan(&mut db, &root, &options());

        let items = db::fetch_media(&db.conn, Some(MediaKind::Audio)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Solo");
        assert_eq!(items[0].artist.as_deref(), Some("Guest Singer"));
        assert_eq!(items[0].album, None);
    }

    #[test]
    fn durable_id_depends_only_on_path() {
        assert_eq!(durable_id("/music/a.mp3"), durable_id("/music/a.mp3"));
        assert_ne!(durable_id("/music/a.mp3"), durable_id("/music/b.mp3"));
    }
}
