// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use expunge_data_model::Batch;
use expunge_storage::{BoxRepository, RepositoryAccess};
use tracing::debug;

use super::BatchStage;
use crate::ClearJobError;

/// Deletes the MDM links whose golden or source resource is in the batch
///
/// The number of deleted links is logged, not counted: only the rows deleted
/// by the written statements end up in the job counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkDeletionStage;

#[async_trait]
impl BatchStage for LinkDeletionStage {
    fn name(&self) -> &'static str {
        "link_deletion"
    }

    #[tracing::instrument(
        name = "job.batch.delete_links",
        skip_all,
        fields(batch.size = batch.len()),
        err,
    )]
    async fn process(
        &self,
        repo: &mut BoxRepository,
        batch: Batch,
    ) -> Result<Batch, ClearJobError> {
        let count = repo
            .mdm_link()
            .delete_for_resources(batch.pids())
            .await
            .map_err(ClearJobError::Store)?;

        if count == 0 {
            debug!("no MDM links to delete");
        } else {
            debug!(count, "deleted MDM links");
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use expunge_data_model::ResourceType;
    use expunge_storage::RepositoryFactory;
    use expunge_storage_memory::{MemoryRepositoryFactory, NewResource};

    use super::*;

    #[tokio::test]
    async fn test_deletes_links_both_ways() {
        let factory = MemoryRepositoryFactory::new();
        let patient = |second| {
            NewResource::new(
                ResourceType::new("Patient").unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, second).unwrap(),
            )
        };
        let golden = factory.add_resource(patient(1)).await;
        let source = factory.add_resource(patient(2)).await;
        let unrelated_golden = factory.add_resource(patient(3)).await;
        let unrelated = factory.add_resource(patient(4)).await;
        factory.add_mdm_link(golden, source).await;
        factory.add_mdm_link(unrelated_golden, unrelated).await;

        let mut repo = factory.create().await.unwrap();
        let batch = Batch::new(vec![source]).unwrap();
        let batch = LinkDeletionStage.process(&mut repo, batch).await.unwrap();
        assert_eq!(batch.pids(), &[source]);

        // Through the golden resource this time
        let batch = Batch::new(vec![unrelated_golden]).unwrap();
        LinkDeletionStage.process(&mut repo, batch).await.unwrap();
        repo.save().await.unwrap();

        let state = factory.snapshot().await;
        assert_eq!(state.mdm_links_of(golden), 0);
        assert_eq!(state.mdm_links_of(source), 0);
        assert_eq!(state.mdm_links_of(unrelated), 0);
    }

    #[tokio::test]
    async fn test_no_links_is_noop() {
        let factory = MemoryRepositoryFactory::new();
        let pid = factory
            .add_resource(NewResource::new(
                ResourceType::new("Patient").unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            ))
            .await;

        let mut repo = factory.create().await.unwrap();
        let batch = LinkDeletionStage
            .process(&mut repo, Batch::new(vec![pid]).unwrap())
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        repo.cancel().await.unwrap();
    }
}
