// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Reads the resources matching a set of criteria, newest first, in batches

use std::collections::VecDeque;

use expunge_data_model::{Batch, ResourceRow, SearchCriterion};
use expunge_storage::{Page, PageCursor, Pagination, RepositoryAccess, RepositoryError};
use tracing::debug;

use crate::{ClearJobError, State};

/// The paging state of a single criterion
struct CriterionCursor {
    criterion: SearchCriterion,

    /// Where the next page starts, `None` before the first page
    cursor: Option<PageCursor>,

    /// Rows fetched but not yet emitted, newest first
    buffer: VecDeque<ResourceRow>,

    exhausted: bool,
}

impl CriterionCursor {
    fn new(criterion: SearchCriterion) -> Self {
        Self {
            criterion,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Fetch the next page if everything fetched so far was consumed
    async fn refill(&mut self, state: &State, page_size: usize) -> Result<(), ClearJobError> {
        if self.exhausted || !self.buffer.is_empty() {
            return Ok(());
        }

        let mut pagination = Pagination::first(page_size);
        if let Some(cursor) = self.cursor {
            pagination = pagination.before(cursor);
        }

        let page = self
            .fetch(state, pagination)
            .await
            .map_err(|source| ClearJobError::Query {
                criterion: self.criterion.clone(),
                last_cursor: self.cursor,
                source,
            })?;

        debug!(
            criterion = %self.criterion,
            rows = page.rows.len(),
            "fetched a page of resources"
        );

        self.exhausted = page.next.is_none();
        if page.next.is_some() {
            self.cursor = page.next;
        }
        self.buffer.extend(page.rows);

        Ok(())
    }

    async fn fetch(&self, state: &State, pagination: Pagination) -> Result<Page, RepositoryError> {
        let mut repo = state.repository().await?;
        let page = repo
            .resource_search()
            .search(&self.criterion, pagination)
            .await?;

        // Searching is read-only
        repo.cancel().await?;

        Ok(page)
    }
}

/// Yields batches of resource PIDs matching any of a set of criteria, most
/// recently created first
///
/// Each criterion is paged through with its own keyset cursor, holding at most
/// one page ahead of what was emitted. Results of the criteria are merged, and
/// a resource matched by several criteria is emitted once. Since pages are
/// keyed on `(created_at, pid)` rather than offsets, deleting the emitted
/// resources between two calls does not make the reader skip any row.
pub struct ReverseChronologicalPidReader {
    state: State,
    chunk_size: usize,
    page_size: usize,
    criteria: Vec<CriterionCursor>,

    /// The key of the last emitted row, everything at or above it was
    /// already emitted
    high_water_mark: Option<PageCursor>,
}

impl ReverseChronologicalPidReader {
    /// Create a reader over the given criteria
    ///
    /// Both `chunk_size` and `page_size` are clamped to at least 1.
    #[must_use]
    pub fn new(
        state: State,
        criteria: Vec<SearchCriterion>,
        chunk_size: usize,
        page_size: usize,
    ) -> Self {
        Self {
            state,
            chunk_size: chunk_size.max(1),
            page_size: page_size.max(1),
            criteria: criteria.into_iter().map(CriterionCursor::new).collect(),
            high_water_mark: None,
        }
    }

    /// Get the next batch of PIDs, or `None` once every criterion is
    /// exhausted
    ///
    /// Batches hold `chunk_size` PIDs, except the last one which may be
    /// shorter.
    ///
    /// # Errors
    ///
    /// Returns [`ClearJobError::Query`] if fetching a page failed. The reader
    /// should not be used after that.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>, ClearJobError> {
        let mut pids = Vec::with_capacity(self.chunk_size);

        while pids.len() < self.chunk_size {
            let Some(row) = self.next_row().await? else {
                break;
            };
            pids.push(row.pid);
        }

        Ok(Batch::new(pids))
    }

    async fn next_row(&mut self) -> Result<Option<ResourceRow>, ClearJobError> {
        loop {
            for criterion in &mut self.criteria {
                criterion.refill(&self.state, self.page_size).await?;
            }

            // The newest head among all criteria
            let newest = self
                .criteria
                .iter()
                .enumerate()
                .filter_map(|(index, criterion)| {
                    criterion
                        .buffer
                        .front()
                        .map(|row| (PageCursor::of(row), index))
                })
                .max();

            let Some((key, index)) = newest else {
                return Ok(None);
            };

            let Some(row) = self.criteria[index].buffer.pop_front() else {
                continue;
            };

            // Already emitted through another criterion
            if self.high_water_mark.is_some_and(|mark| key >= mark) {
                continue;
            }

            self.high_water_mark = Some(key);
            return Ok(Some(row));
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use expunge_data_model::{DeleteStatement, DependentTable, ResourcePid, ResourceType};
    use expunge_storage::RepositoryTransaction;
    use expunge_storage_memory::{MemoryRepositoryFactory, NewResource};

    use super::*;

    fn resource(resource_type: &str, second: u32) -> NewResource {
        NewResource::new(
            ResourceType::new(resource_type).unwrap(),
            Utc.with_ymd_and_hms(2022, 3, 1, 8, 0, second).unwrap(),
        )
    }

    fn criteria(raw: &[&str]) -> Vec<SearchCriterion> {
        raw.iter()
            .map(|raw| SearchCriterion::parse(raw).unwrap())
            .collect()
    }

    async fn drain(reader: &mut ReverseChronologicalPidReader) -> Vec<Vec<ResourcePid>> {
        let mut batches = Vec::new();
        while let Some(batch) = reader.next_batch().await.unwrap() {
            batches.push(batch.into_pids());
        }
        batches
    }

    #[tokio::test]
    async fn test_newest_first_in_chunks() {
        let factory = MemoryRepositoryFactory::new();
        let mut pids = Vec::new();
        // Inserted out of chronological order
        for second in [3, 1, 5, 2, 4] {
            pids.push((second, factory.add_resource(resource("Patient", second)).await));
        }
        pids.sort_by_key(|(second, _)| std::cmp::Reverse(*second));
        let expected: Vec<_> = pids.into_iter().map(|(_, pid)| pid).collect();

        let state = State::new(factory.boxed());
        let mut reader = ReverseChronologicalPidReader::new(state, criteria(&["Patient"]), 2, 2);

        let batches = drain(&mut reader).await;
        assert_eq!(
            batches,
            vec![
                expected[0..2].to_vec(),
                expected[2..4].to_vec(),
                expected[4..5].to_vec(),
            ]
        );

        // Stays exhausted
        assert_eq!(reader.next_batch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_match() {
        let factory = MemoryRepositoryFactory::new();
        factory.add_resource(resource("Observation", 1)).await;

        let state = State::new(factory.boxed());
        let mut reader = ReverseChronologicalPidReader::new(state, criteria(&["Patient"]), 1, 10);

        assert_eq!(reader.next_batch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_merge_criteria_without_duplicates() {
        let factory = MemoryRepositoryFactory::new();
        let smith = factory
            .add_resource(resource("Patient", 1).with_search_param("family", "smith"))
            .await;
        let observation = factory.add_resource(resource("Observation", 2)).await;
        let both = factory
            .add_resource(
                resource("Patient", 3)
                    .with_search_param("family", "smith")
                    .with_search_param("given", "john"),
            )
            .await;
        let john = factory
            .add_resource(resource("Patient", 4).with_search_param("given", "john"))
            .await;

        let state = State::new(factory.boxed());
        let mut reader = ReverseChronologicalPidReader::new(
            state,
            criteria(&["Patient?family=smith", "Patient?given=john", "Observation"]),
            1,
            1,
        );

        let batches = drain(&mut reader).await;
        assert_eq!(
            batches,
            vec![vec![john], vec![both], vec![observation], vec![smith]]
        );
    }

    #[tokio::test]
    async fn test_deleting_emitted_rows_does_not_skip() {
        let factory = MemoryRepositoryFactory::new();
        let mut expected = Vec::new();
        for second in 1..=6 {
            expected.push(factory.add_resource(resource("Patient", second)).await);
        }
        expected.reverse();

        let state = State::new(factory.clone().boxed());
        let mut reader = ReverseChronologicalPidReader::new(state, criteria(&["Patient"]), 1, 2);

        let mut seen = Vec::new();
        while let Some(batch) = reader.next_batch().await.unwrap() {
            // Expunge what was just emitted, like the job does
            let mut repo = factory.repository().await;
            for pid in &batch {
                let mut expunge = repo.expunge();
                expunge
                    .execute(DeleteStatement::dependent(DependentTable::Versions, *pid))
                    .await
                    .unwrap();
                expunge
                    .execute(DeleteStatement::resource(*pid))
                    .await
                    .unwrap();
            }
            Box::new(repo).save().await.unwrap();

            seen.extend(batch.into_pids());
        }

        assert_eq!(seen, expected);
        assert_eq!(factory.snapshot().await.resource_count(), 0);
    }

    #[tokio::test]
    async fn test_query_failure_reports_cursor() {
        let factory = MemoryRepositoryFactory::new();
        for second in 1..=3 {
            factory.add_resource(resource("Patient", second)).await;
        }

        let state = State::new(factory.clone().boxed());
        let mut reader = ReverseChronologicalPidReader::new(state, criteria(&["Patient"]), 1, 2);

        // First page holds two rows
        reader.next_batch().await.unwrap().unwrap();
        reader.next_batch().await.unwrap().unwrap();

        factory.fail_next_search();
        assert_matches!(
            reader.next_batch().await,
            Err(ClearJobError::Query { last_cursor: Some(cursor), criterion, .. }) => {
                assert_eq!(criterion.resource_type().as_str(), "Patient");
                assert_eq!(cursor.created_at, Utc.with_ymd_and_hms(2022, 3, 1, 8, 0, 2).unwrap());
            }
        );
    }
}
