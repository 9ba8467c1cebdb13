// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repositories to resolve search criteria

use async_trait::async_trait;
use expunge_data_model::SearchCriterion;

use crate::{Page, Pagination, repository_impl};

/// A [`ResourceSearchRepository`] helps finding the resources matching a
/// [`SearchCriterion`]
#[async_trait]
pub trait ResourceSearchRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Search for resources matching a criterion, newest first
    ///
    /// Returns a page of at most `pagination.count` rows, ordered by creation
    /// time then PID, both descending, with the cursor of the next page if
    /// there are more rows
    ///
    /// # Parameters
    ///
    /// * `criterion`: The criterion the resources must match
    /// * `pagination`: Where to start and how many rows to return
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn search(
        &mut self,
        criterion: &SearchCriterion,
        pagination: Pagination,
    ) -> Result<Page, Self::Error>;
}

repository_impl!(ResourceSearchRepository:
    async fn search(
        &mut self,
        criterion: &SearchCriterion,
        pagination: Pagination,
    ) -> Result<Page, Self::Error>;
);
