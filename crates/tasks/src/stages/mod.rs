// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! The per-batch stages run before the statements are written
//!
//! A [`BatchStage`] does its work through the batch transaction and hands the
//! batch on to the next stage. The [`ExpungeStage`] always comes last and
//! turns the batch into delete statements.

use async_trait::async_trait;
use expunge_data_model::Batch;
use expunge_storage::BoxRepository;

use crate::ClearJobError;

mod expunge;
mod link_deletion;

pub use self::{
    expunge::{ExpungeOptions, ExpungeStage},
    link_deletion::LinkDeletionStage,
};

/// A side-effecting stage which passes its batch through
#[async_trait]
pub trait BatchStage: Send + Sync {
    /// A short name for the stage, used in logs
    fn name(&self) -> &'static str;

    /// Process a batch within the batch transaction
    ///
    /// # Errors
    ///
    /// Returns a [`ClearJobError`] if the stage failed, which aborts the
    /// batch
    async fn process(
        &self,
        repo: &mut BoxRepository,
        batch: Batch,
    ) -> Result<Batch, ClearJobError>;
}
