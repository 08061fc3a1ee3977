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

//! Media catalog scan progress.
//!
//! This module keeps track of a running library scan, per media directory,
//! from the progress reports the scanner emits.

use crate::db::scan::ScanProgress;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CatalogStatus {
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug)]
pub(crate) struct DirectoryStatus {
    pub(crate) status: CatalogStatus,
    pub(crate) name: String,
    pub(crate) count: usize,
}

#[derive(Debug)]
pub(crate) struct Catalog {
    pub(crate) status: CatalogStatus,
    pub(crate) directory_status: Vec<DirectoryStatus>,
    pub(crate) total: Option<i64>,
    current_directory_index: Option<usize>,
}

impl Catalog {
    pub(crate) fn new() -> Self {
        Self {
            status: CatalogStatus::Idle,
            directory_status: vec![],
            total: None,
            current_directory_index: None,
        }
    }

    /// Folds a scanner progress report into the catalog state.
    pub(crate) fn apply(&mut self, progress: ScanProgress) {
        match progress {
            ScanProgress::Started(directories) => self.prepare_scan(&directories),
            ScanProgress::StartedDirectory(directory) => self.begin_scan_directory(&directory),
            ScanProgress::ProcessedFile(count, _) => self.update_scan_directory(count),
            ScanProgress::FinishedDirectory(_) => self.end_scan_directory(),
            ScanProgress::Finished(total) => self.finish_scan(total),
        }
    }

    pub(crate) fn is_scanning(&self) -> bool {
        self.status == CatalogStatus::Scanning
    }

    fn prepare_scan(&mut self, directories: &[String]) {
        self.status = CatalogStatus::Scanning;
        self.total = None;

        self.directory_status = directories
            .iter()
            .map(|d| DirectoryStatus {
                status: CatalogStatus::Idle,
                name: d.clone(),
                count: 0,
            })
            .collect();
    }

    fn begin_scan_directory(&mut self, directory: &str) {
        self.current_directory_index = self
            .directory_status
            .iter()
            .position(|s| s.name == directory);

        if let Some(idx) = self.current_directory_index {
            self.directory_status[idx].status = CatalogStatus::Scanning;
        }
    }

    fn update_scan_directory(&mut self, count: usize) {
        if let Some(status) = self
            .current_directory_index
            .and_then(|idx| self.directory_status.get_mut(idx))
        {
            status.count = count;
        }
    }

    fn end_scan_directory(&mut self) {
        if let Some(idx) = self.current_directory_index.take() {
            self.directory_status[idx].status = CatalogStatus::Finished;
        }
    }

    fn finish_scan(&mut self, total: i64) {
        self.status = CatalogStatus::Finished;
        self.total = Some(total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_directory_progress() {
        let mut catalog = Catalog::new();
        assert!(!catalog.is_scanning());

        catalog.apply(ScanProgress::Started(vec!["/music".into(), "/videos".into()]));
        assert!(catalog.is_scanning());

        catalog.apply(ScanProgress::StartedDirectory("/videos".into()));
        catalog.apply(ScanProgress::ProcessedFile(4, "clip.mp4".into()));
        assert_eq!(catalog.directory_status[1].status, CatalogStatus::Scanning);
        assert_eq!(catalog.directory_status[1].count, 4);

        catalog.apply(ScanProgress::FinishedDirectory("/videos".into()));
        catalog.apply(ScanProgress::Finished(4));

        assert_eq!(catalog.directory_status[0].status, CatalogStatus::Idle);
        assert_eq!(catalog.directory_status[1].status, CatalogStatus::Finished);
        assert_eq!(catalog.status, CatalogStatus::Finished);
        assert_eq!(catalog.total, Some(4));
    }
}
