// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::cmp::Reverse;

use async_trait::async_trait;
use expunge_data_model::{ResourceRow, SearchCriterion};
use expunge_storage::{Page, PageCursor, Pagination, resource::ResourceSearchRepository};

use crate::{MemoryError, MemoryState, SharedFaults, with_faults};

/// An implementation of [`ResourceSearchRepository`] over an in-memory state
pub struct MemoryResourceSearchRepository<'c> {
    state: &'c MemoryState,
    faults: &'c SharedFaults,
}

impl<'c> MemoryResourceSearchRepository<'c> {
    pub(crate) fn new(state: &'c MemoryState, faults: &'c SharedFaults) -> Self {
        Self { state, faults }
    }
}

#[async_trait]
impl ResourceSearchRepository for MemoryResourceSearchRepository<'_> {
    type Error = MemoryError;

    #[tracing::instrument(
        name = "db.resource_search.search",
        skip_all,
        fields(%criterion, count = pagination.count),
        err,
    )]
    async fn search(
        &mut self,
        criterion: &SearchCriterion,
        pagination: Pagination,
    ) -> Result<Page, Self::Error> {
        with_faults(self.faults, |faults| faults.check_search())?;

        let mut rows: Vec<ResourceRow> = self
            .state
            .resources
            .iter()
            .filter(|(_, resource)| &resource.resource_type == criterion.resource_type())
            .filter(|(_, resource)| {
                criterion
                    .parameters()
                    .iter()
                    .all(|param| resource.search_params.contains(param))
            })
            .map(|(pid, resource)| ResourceRow {
                pid: *pid,
                resource_type: resource.resource_type.clone(),
                created_at: resource.created_at,
            })
            .filter(|row| {
                pagination
                    .before
                    .is_none_or(|before| before.is_before(row))
            })
            .collect();

        rows.sort_by_key(|row| Reverse(PageCursor::of(row)));
        rows.truncate(pagination.count + 1);

        Ok(pagination.process(rows))
    }
}
