// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Utilities to manage keyset-paginated searches.
//!
//! Searches return resources ordered by `(created_at DESC, pid DESC)`, so the
//! most recently created resources come first. A [`PageCursor`] is the key of
//! the last row of a page, and the next page holds rows strictly smaller than
//! it. Deleting rows which were already returned does not shift later pages.

use chrono::{DateTime, Utc};
use expunge_data_model::{ResourcePid, ResourceRow};
use serde::{Deserialize, Serialize};

/// The position of a row in the reverse-chronological ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageCursor {
    /// When the row was created
    pub created_at: DateTime<Utc>,

    /// The row PID, used to break ties between rows created at the same time
    pub pid: ResourcePid,
}

impl PageCursor {
    /// The cursor pointing at a given row
    #[must_use]
    pub fn of(row: &ResourceRow) -> Self {
        Self {
            created_at: row.created_at,
            pid: row.pid,
        }
    }

    /// Whether a row comes strictly after this cursor in the ordering
    #[must_use]
    pub fn is_before(&self, row: &ResourceRow) -> bool {
        Self::of(row) < *self
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Only return rows strictly older than this cursor
    pub before: Option<PageCursor>,

    /// The maximum number of rows to return
    pub count: usize,
}

impl Pagination {
    /// Creates a [`Pagination`] which gets the first N rows
    #[must_use]
    pub const fn first(count: usize) -> Self {
        Self {
            before: None,
            count,
        }
    }

    /// Get rows older than the given cursor
    #[must_use]
    pub fn before(mut self, cursor: PageCursor) -> Self {
        self.before = Some(cursor);
        self
    }

    /// Process the rows returned by a paginated query
    ///
    /// Backends are expected to fetch `count + 1` rows in order: the extra row
    /// only tells whether there is a next page, and is dropped here.
    #[must_use]
    pub fn process(&self, mut rows: Vec<ResourceRow>) -> Page {
        let is_full = rows.len() > self.count;
        rows.truncate(self.count);

        let next = if is_full {
            rows.last().map(PageCursor::of)
        } else {
            None
        };

        Page { rows, next }
    }
}

/// A page of rows returned by a paginated search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// The rows in the page, newest first
    pub rows: Vec<ResourceRow>,

    /// The cursor to fetch the next page with, if there is one
    pub next: Option<PageCursor>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use expunge_data_model::ResourceType;

    use super::*;

    fn row(pid: i64, second: u32) -> ResourceRow {
        ResourceRow {
            pid: ResourcePid::new(pid),
            resource_type: ResourceType::new("Patient").unwrap(),
            created_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, second).unwrap(),
        }
    }

    #[test]
    fn test_process_full_page() {
        let pagination = Pagination::first(2);
        let page = pagination.process(vec![row(3, 3), row(2, 2), row(1, 1)]);

        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.next, Some(PageCursor::of(&row(2, 2))));
    }

    #[test]
    fn test_process_last_page() {
        let pagination = Pagination::first(2);
        let page = pagination.process(vec![row(3, 3), row(2, 2)]);

        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_cursor_ordering_breaks_ties_on_pid() {
        let cursor = PageCursor::of(&row(5, 10));

        assert!(cursor.is_before(&row(4, 10)));
        assert!(cursor.is_before(&row(9, 9)));
        assert!(!cursor.is_before(&row(5, 10)));
        assert!(!cursor.is_before(&row(6, 10)));
        assert!(!cursor.is_before(&row(1, 11)));
    }
}
