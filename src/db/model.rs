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

//! Database row mapping for domain models.
//!
//! This module provides the conversion logic between raw SQLite result rows
//! and high-level domain models, ensuring type-safe extraction of model
//! attributes from database queries.

use rusqlite::{
    Result, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};

use crate::model::{HistoryEntry, LoopMode, MediaItem, MediaKind, MediaStats};

/// Number of columns [`MediaItem::from_row`] consumes.
const MEDIA_COLUMN_COUNT: usize = 8;

impl MediaItem {
    /// Maps an SQLite row to a [`MediaItem`] instance.
    ///
    /// This is a helper function designed to be used with [`rusqlite::Statement::query_map`].
    ///
    /// # Errors
    ///
    /// Returns a [`rusqlite::Error`] if:
    /// * The row does not contain enough columns.
    /// * The data in a column cannot be converted to the required Rust type.
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        Self::from_row_at(row, 0)
    }

    /// Maps the media columns of a row that starts at column `offset`.
    pub(crate) fn from_row_at(row: &Row, offset: usize) -> Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            kind: row.get(offset + 1)?,
            title: row.get(offset + 2)?,
            artist: row.get(offset + 3)?,
            album: row.get(offset + 4)?,
            duration: row.get(offset + 5)?,
            filename: row.get(offset + 6)?,
            artwork: row.get(offset + 7)?,
        })
    }
}

impl HistoryEntry {
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            item: MediaItem::from_row(row)?,
            played_at: row.get(MEDIA_COLUMN_COUNT)?,
        })
    }
}

impl MediaStats {
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            play_count: row.get(0)?,
            last_played: row.get(1)?,
            position: row.get(2)?,
            favourite: row.get(3)?,
        })
    }
}

impl ToSql for MediaKind {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MediaKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        MediaKind::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for LoopMode {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for LoopMode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        LoopMode::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}
