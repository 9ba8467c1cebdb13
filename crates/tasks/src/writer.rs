// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use expunge_data_model::DeleteStatement;
use expunge_storage::{BoxRepository, RepositoryAccess, RepositoryError};
use tracing::{debug, warn};

use crate::ClearJobError;

/// Executes the statements of a batch and commits them
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementWriter;

impl StatementWriter {
    /// Execute every statement in order on the repository, then commit it
    ///
    /// Returns the total number of affected rows. If any statement fails the
    /// repository is rolled back, together with whatever the stages did on
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`ClearJobError::Write`] if a statement or the commit failed
    #[tracing::instrument(
        name = "job.batch.write",
        skip_all,
        fields(batch.statements = statements.len()),
        err,
    )]
    pub async fn write(
        &self,
        mut repo: BoxRepository,
        statements: Vec<DeleteStatement>,
    ) -> Result<u64, ClearJobError> {
        match execute_all(&mut repo, statements).await {
            Ok(affected) => {
                repo.save().await.map_err(ClearJobError::Write)?;
                debug!(affected, "committed batch");
                Ok(affected)
            }

            Err(e) => {
                if let Err(cancel_error) = repo.cancel().await {
                    warn!(
                        error = &cancel_error as &dyn std::error::Error,
                        "Failed to roll back batch"
                    );
                }
                Err(ClearJobError::Write(e))
            }
        }
    }
}

async fn execute_all(
    repo: &mut BoxRepository,
    statements: Vec<DeleteStatement>,
) -> Result<u64, RepositoryError> {
    let mut affected: u64 = 0;
    for statement in statements {
        let rows = repo.expunge().execute(statement).await?;
        affected = affected.saturating_add(u64::try_from(rows).unwrap_or(u64::MAX));
    }
    Ok(affected)
}
