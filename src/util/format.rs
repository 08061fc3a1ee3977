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

use crate::model::{
    HistoryEntry, MediaItem, Playlist,
    catalog::{Catalog, CatalogStatus},
    queue::QueueState,
};

/// Formats a duration in seconds into a human-readable `MM:SS` string.
///
/// This is used primarily for displaying playback positions and total
/// durations in the console.
///
/// # Arguments
///
/// * `total_seconds` - The duration to format, represented as a 64-bit integer.
///
/// Minutes are not wrapped into hours, so 65 seconds is `01:05` and an hour
/// is `60:00`.
pub(crate) fn format_time(total_seconds: u64) -> String {
    let mins = total_seconds / 60;
    let secs = total_seconds % 60;
    format!("{:02}:{:02}", mins, secs)
}

/// Formats a millisecond duration from the library, unknown durations are
/// shown as `--:--`.
pub(crate) fn format_duration_ms(millis: i64) -> String {
    if millis <= 0 {
        "--:--".to_string()
    } else {
        format_time(millis as u64 / 1000)
    }
}

/// One line of a media listing: id, kind, duration and title.
pub(crate) fn format_item(item: &MediaItem) -> String {
    let mut line = format!(
        "{:>20}  {:<5}  {:>6}  {}",
        item.id,
        item.kind,
        format_duration_ms(item.duration),
        item.display_title()
    );

    if let Some(album) = item.album.as_deref().filter(|a| !a.is_empty()) {
        line.push_str(&format!(" [{}]", album));
    }

    line
}

pub(crate) fn format_items(items: &[MediaItem]) -> String {
    if items.is_empty() {
        return "(nothing)".to_string();
    }

    items.iter().map(format_item).collect::<Vec<_>>().join("\n")
}

/// The queue in playback order with 1-based positions, the current item
/// marked with `>`.
pub(crate) fn format_queue(state: &QueueState) -> String {
    if state.items.is_empty() {
        return "Queue is empty".to_string();
    }

    let mut lines = vec![format!(
        "{} items, loop {}, shuffle {}",
        state.items.len(),
        state.loop_mode,
        if state.is_shuffled { "on" } else { "off" }
    )];

    for (idx, item) in state.items.iter().enumerate() {
        let marker = if state.current_index == Some(idx) { '>' } else { ' ' };
        lines.push(format!("{}{:>4}  {}", marker, idx + 1, format_item(item)));
    }

    lines.join("\n")
}

pub(crate) fn format_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "(nothing played yet)".to_string();
    }

    entries
        .iter()
        .map(|e| format!("{:>12}  {}", e.played_at, format_item(&e.item)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn format_playlists(playlists: &[Playlist]) -> String {
    if playlists.is_empty() {
        return "(no playlists)".to_string();
    }

    playlists
        .iter()
        .map(|p| format!("{}  ({} items)", p.name, p.item_count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scan progress per media directory, `None` before the first scan.
pub(crate) fn format_catalog(catalog: &Catalog) -> Option<String> {
    if catalog.status == CatalogStatus::Idle {
        return None;
    }

    let mut lines = vec![match catalog.total {
        Some(total) if !catalog.is_scanning() => format!("Library: {} items", total),
        _ => "Library: scanning".to_string(),
    }];

    for directory in &catalog.directory_status {
        let state = match directory.status {
            CatalogStatus::Idle => "waiting",
            CatalogStatus::Scanning => "scanning",
            CatalogStatus::Finished => "done",
        };
        lines.push(format!(
            "  {}  {} files, {}",
            directory.name, directory.count, state
        ));
    }

    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::scan::ScanProgress,
        model::{LoopMode, fixtures::items},
    };

    #[test]
    fn times() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(3600), "60:00");
        assert_eq!(format_duration_ms(0), "--:--");
        assert_eq!(format_duration_ms(61_500), "01:01");
    }

    #[test]
    fn queue_marks_current_item() {
        let items = items(&["a", "b"]);
        let state = QueueState {
            original_items: items.clone(),
            items,
            current_index: Some(1),
            loop_mode: LoopMode::All,
            is_shuffled: false,
        };

        let text = format_queue(&state);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "2 items, loop all, shuffle off");
        assert!(lines[1].starts_with("    1  "));
        assert!(lines[2].starts_with(">   2  "));
        assert!(lines[2].contains("Test Artist - b [Test Album]"));
    }

    #[test]
    fn empty_listings() {
        assert_eq!(format_items(&[]), "(nothing)");
        assert_eq!(format_playlists(&[]), "(no playlists)");
    }

    #[test]
    fn catalog_progress() {
        let mut catalog = Catalog::new();
        assert_eq!(format_catalog(&catalog), None);

        catalog.apply(ScanProgress::Started(vec!["/media".into()]));
        catalog.apply(ScanProgress::StartedDirectory("/media".into()));
        catalog.apply(ScanProgress::ProcessedFile(2, "a.mp3".into()));
        assert_eq!(
            format_catalog(&catalog).as_deref(),
            Some("Library: scanning\n  /media  2 files, scanning")
        );

        catalog.apply(ScanProgress::FinishedDirectory("/media".into()));
        catalog.apply(ScanProgress::Finished(2));
        assert_eq!(
            format_catalog(&catalog).as_deref(),
            Some("Library: 2 items\n  /media  2 files, done")
        );
    }
}
