// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repositories to permanently remove resources

use async_trait::async_trait;
use expunge_data_model::{DeleteStatement, DependentCount, InboundReference, ResourcePid};

use crate::repository_impl;

/// An [`ExpungeRepository`] inspects the rows depending on resources and
/// executes the [`DeleteStatement`]s removing them
#[async_trait]
pub trait ExpungeRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Count the dependent rows of each resource
    ///
    /// Only non-zero counts are returned, grouped by resource then table.
    ///
    /// # Parameters
    ///
    /// * `pids`: The resources to inspect
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn dependent_counts(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<DependentCount>, Self::Error>;

    /// List references pointing at one of the resources from a resource which
    /// is not itself part of `pids`
    ///
    /// # Parameters
    ///
    /// * `pids`: The resources about to be expunged
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn inbound_references(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<InboundReference>, Self::Error>;

    /// Execute a delete statement
    ///
    /// Returns the number of deleted rows
    ///
    /// # Parameters
    ///
    /// * `statement`: The statement to execute
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails, for example
    /// if the statement violates a constraint
    async fn execute(&mut self, statement: DeleteStatement) -> Result<usize, Self::Error>;
}

repository_impl!(ExpungeRepository:
    async fn dependent_counts(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<DependentCount>, Self::Error>;
    async fn inbound_references(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<InboundReference>, Self::Error>;
    async fn execute(&mut self, statement: DeleteStatement) -> Result<usize, Self::Error>;
);
