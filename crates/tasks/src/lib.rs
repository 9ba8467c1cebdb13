// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! The link-clear and expunge job
//!
//! The job finds the resources matching a set of search criteria, newest
//! first, and for each batch of them:
//!
//! 1. deletes the MDM links pointing at them,
//! 2. generates the statements deleting their dependent rows and the
//!    resources themselves,
//! 3. executes those statements and commits.
//!
//! All three steps of a batch run in a single transaction, so a failing batch
//! leaves the store untouched.

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use expunge_storage::{BoxRepository, BoxRepositoryFactory, RepositoryError, RepositoryFactory};

mod counters;
mod error;
mod job;
mod processor;
mod reader;
mod stages;
mod validation;
mod writer;

pub use self::{
    counters::{JobCounters, JobExecutionContext, StepExecutionContext},
    error::{ClearJobError, ValidationError},
    job::{ClearJob, ClearJobParameters, JobContext, JobReport, JobStatus, StepOutcome},
    processor::CompositeProcessor,
    reader::ReverseChronologicalPidReader,
    stages::{BatchStage, ExpungeOptions, ExpungeStage, LinkDeletionStage},
    validation::validate_criteria,
    writer::StatementWriter,
};

/// What the job components share: access to the store
#[derive(Clone)]
pub struct State {
    repository_factory: Arc<dyn RepositoryFactory + Send + Sync>,
}

impl State {
    /// Create a new [`State`] over a repository factory
    #[must_use]
    pub fn new(repository_factory: BoxRepositoryFactory) -> Self {
        Self {
            repository_factory: Arc::from(repository_factory),
        }
    }

    /// Start a new transaction on the store
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the transaction could not be started
    pub async fn repository(&self) -> Result<BoxRepository, RepositoryError> {
        self.repository_factory.create().await
    }
}
