// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use expunge_data_model::{Batch, DeleteStatement, DependentTable, ResourcePid};
use expunge_storage::{BoxRepository, RepositoryAccess};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ClearJobError;

/// Options of the [`ExpungeStage`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpungeOptions {
    /// Fail the batch if a resource owns more rows than this across all its
    /// dependent tables
    pub max_dependents_per_resource: Option<usize>,

    /// Delete the references other resources hold on the expunged resources,
    /// instead of failing the batch
    pub cascade_incoming_references: bool,
}

/// Turns a batch into the statements which permanently delete its resources
///
/// Statements are ordered table by table across the whole batch: every
/// dependent table in [`DependentTable::ALL`] order, then the incoming
/// references when cascading, then the resource rows. A resource of the batch
/// referencing another one therefore loses its outgoing references before any
/// resource row is deleted.
#[derive(Debug, Clone, Default)]
pub struct ExpungeStage {
    options: ExpungeOptions,
}

impl ExpungeStage {
    /// Create an expunge stage with the given options
    #[must_use]
    pub const fn new(options: ExpungeOptions) -> Self {
        Self { options }
    }

    /// The options of this stage
    #[must_use]
    pub const fn options(&self) -> &ExpungeOptions {
        &self.options
    }

    /// Generate the delete statements of a batch
    ///
    /// Nothing is deleted here, the store is only read.
    ///
    /// # Errors
    ///
    /// Returns [`ClearJobError::ExpungeLimitExceeded`] if a resource has too
    /// many dependents, [`ClearJobError::ReferencedByOther`] if a resource is
    /// referenced from outside the batch and references are not cascaded, or
    /// [`ClearJobError::Store`] if the store could not be read.
    #[tracing::instrument(
        name = "job.batch.expunge",
        skip_all,
        fields(batch.size = batch.len()),
        err,
    )]
    pub async fn expand(
        &self,
        repo: &mut BoxRepository,
        batch: &Batch,
    ) -> Result<Vec<DeleteStatement>, ClearJobError> {
        let pids = batch.pids();

        if let Some(limit) = self.options.max_dependents_per_resource {
            let counts = repo
                .expunge()
                .dependent_counts(pids)
                .await
                .map_err(ClearJobError::Store)?;

            for pid in pids {
                let total = counts
                    .iter()
                    .filter(|count| count.pid == *pid)
                    .fold(0_usize, |total, count| total.saturating_add(count.count));

                if total > limit {
                    return Err(ClearJobError::ExpungeLimitExceeded {
                        pid: *pid,
                        count: total,
                        limit,
                    });
                }
            }
        }

        let inbound = repo
            .expunge()
            .inbound_references(pids)
            .await
            .map_err(ClearJobError::Store)?;

        let mut referenced: Vec<ResourcePid> = Vec::new();
        for reference in inbound {
            if !self.options.cascade_incoming_references {
                return Err(ClearJobError::ReferencedByOther {
                    target: reference.target,
                    referrer: reference.source,
                    path: reference.source_path,
                });
            }

            if !referenced.contains(&reference.target) {
                referenced.push(reference.target);
            }
        }

        let mut statements =
            Vec::with_capacity(pids.len() * (DependentTable::ALL.len() + 1) + referenced.len());

        for table in DependentTable::ALL {
            statements.extend(
                pids.iter()
                    .map(|pid| DeleteStatement::dependent(table, *pid)),
            );
        }

        // Keep batch order for the cascaded references
        statements.extend(
            pids.iter()
                .filter(|pid| referenced.contains(pid))
                .map(|pid| DeleteStatement::incoming_references(*pid)),
        );

        statements.extend(pids.iter().map(|pid| DeleteStatement::resource(*pid)));

        debug!(
            statements = statements.len(),
            cascaded = referenced.len(),
            "generated expunge statements"
        );

        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use expunge_data_model::{DeleteTarget, ResourceType};
    use expunge_storage::RepositoryFactory;
    use expunge_storage_memory::{MemoryRepositoryFactory, NewResource};

    use super::*;

    fn patient(second: u32) -> NewResource {
        NewResource::new(
            ResourceType::new("Patient").unwrap(),
            Utc.with_ymd_and_hms(2020, 5, 5, 5, 5, second).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_dependents_before_resource() {
        let factory = MemoryRepositoryFactory::new();
        let pid = factory.add_resource(patient(1)).await;

        let mut repo = factory.create().await.unwrap();
        let statements = ExpungeStage::default()
            .expand(&mut repo, &Batch::new(vec![pid]).unwrap())
            .await
            .unwrap();
        repo.cancel().await.unwrap();

        let expected: Vec<_> = DependentTable::ALL
            .into_iter()
            .map(|table| DeleteStatement::dependent(table, pid))
            .chain(std::iter::once(DeleteStatement::resource(pid)))
            .collect();
        assert_eq!(statements, expected);
    }

    #[tokio::test]
    async fn test_statements_are_table_major() {
        let factory = MemoryRepositoryFactory::new();
        let first = factory.add_resource(patient(1)).await;
        let second = factory.add_resource(patient(2)).await;
        // Inside the batch, so not an issue
        factory.add_reference(first, second, "Patient.link").await;

        let mut repo = factory.create().await.unwrap();
        let statements = ExpungeStage::default()
            .expand(&mut repo, &Batch::new(vec![second, first]).unwrap())
            .await
            .unwrap();
        repo.cancel().await.unwrap();

        assert_eq!(statements.len(), 2 * (DependentTable::ALL.len() + 1));
        assert_eq!(
            &statements[..2],
            &[
                DeleteStatement::dependent(DependentTable::ALL[0], second),
                DeleteStatement::dependent(DependentTable::ALL[0], first),
            ]
        );
        let last_dependent = statements
            .iter()
            .rposition(|statement| matches!(statement.target, DeleteTarget::Dependent(_)))
            .unwrap();
        let first_resource = statements
            .iter()
            .position(|statement| statement.target == DeleteTarget::Resource)
            .unwrap();
        assert!(last_dependent < first_resource);
    }

    #[tokio::test]
    async fn test_limit_exceeded() {
        let factory = MemoryRepositoryFactory::new();
        let small = factory.add_resource(patient(1)).await;
        let big = factory
            .add_resource(patient(2).with_dependents(DependentTable::Versions, 12))
            .await;

        let stage = ExpungeStage::new(ExpungeOptions {
            max_dependents_per_resource: Some(10),
            cascade_incoming_references: false,
        });

        let mut repo = factory.create().await.unwrap();
        stage
            .expand(&mut repo, &Batch::new(vec![small]).unwrap())
            .await
            .unwrap();

        assert_matches!(
            stage
                .expand(&mut repo, &Batch::new(vec![small, big]).unwrap())
                .await,
            Err(ClearJobError::ExpungeLimitExceeded {
                pid,
                count: 12,
                limit: 10,
            }) if pid == big
        );
        repo.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn test_limit_covers_every_dependent_table() {
        let factory = MemoryRepositoryFactory::new();
        let spread = factory
            .add_resource(
                patient(1)
                    .with_dependents(DependentTable::Versions, 6)
                    .with_dependents(DependentTable::Tags, 6),
            )
            .await;

        let stage = ExpungeStage::new(ExpungeOptions {
            max_dependents_per_resource: Some(10),
            cascade_incoming_references: false,
        });

        let mut repo = factory.create().await.unwrap();
        assert_matches!(
            stage
                .expand(&mut repo, &Batch::new(vec![spread]).unwrap())
                .await,
            Err(ClearJobError::ExpungeLimitExceeded {
                pid,
                count: 12,
                limit: 10,
            }) if pid == spread
        );

        // Exactly at the limit is fine
        let at_limit = ExpungeStage::new(ExpungeOptions {
            max_dependents_per_resource: Some(12),
            cascade_incoming_references: false,
        });
        at_limit
            .expand(&mut repo, &Batch::new(vec![spread]).unwrap())
            .await
            .unwrap();
        repo.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn test_referenced_from_outside_the_batch() {
        let factory = MemoryRepositoryFactory::new();
        let target = factory.add_resource(patient(1)).await;
        let referrer = factory.add_resource(patient(2)).await;
        factory
            .add_reference(referrer, target, "Observation.subject")
            .await;

        let mut repo = factory.create().await.unwrap();
        let batch = Batch::new(vec![target]).unwrap();

        assert_matches!(
            ExpungeStage::default().expand(&mut repo, &batch).await,
            Err(ClearJobError::ReferencedByOther { target: t, referrer: r, path })
                if t == target && r == referrer && path == "Observation.subject"
        );

        let cascading = ExpungeStage::new(ExpungeOptions {
            max_dependents_per_resource: None,
            cascade_incoming_references: true,
        });
        let statements = cascading.expand(&mut repo, &batch).await.unwrap();
        repo.cancel().await.unwrap();

        let position = |target: DeleteTarget| {
            statements
                .iter()
                .position(|statement| statement.target == target)
                .unwrap()
        };
        assert!(
            position(DeleteTarget::IncomingReferences) < position(DeleteTarget::Resource)
        );
        assert_eq!(
            statements
                .iter()
                .filter(|statement| statement.target == DeleteTarget::IncomingReferences)
                .count(),
            1
        );
    }
}
