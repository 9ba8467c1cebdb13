// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use expunge_data_model::{Batch, DeleteStatement};
use expunge_storage::BoxRepository;
use tracing::debug;

use crate::{BatchStage, ClearJobError, ExpungeOptions, ExpungeStage, LinkDeletionStage};

/// Runs a batch through a chain of stages, then expands it into delete
/// statements
///
/// Every stage gets the batch returned by the previous one. Stages run on the
/// repository of the batch, so their changes are only committed along with
/// the statements.
pub struct CompositeProcessor {
    stages: Vec<Box<dyn BatchStage>>,
    expunge: ExpungeStage,
}

impl std::fmt::Debug for CompositeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProcessor")
            .field(
                "stages",
                &self.stages.iter().map(|stage| stage.name()).collect::<Vec<_>>(),
            )
            .field("expunge", &self.expunge)
            .finish()
    }
}

impl CompositeProcessor {
    /// Create a processor with no stage before the expunge
    #[must_use]
    pub fn new(expunge: ExpungeStage) -> Self {
        Self {
            stages: Vec::new(),
            expunge,
        }
    }

    /// The processor of the link-clear and expunge job: MDM link deletion,
    /// then expunge
    #[must_use]
    pub fn link_and_expunge(options: ExpungeOptions) -> Self {
        Self::new(ExpungeStage::new(options)).with_stage(LinkDeletionStage)
    }

    /// Append a stage to the chain
    #[must_use]
    pub fn with_stage(mut self, stage: impl BatchStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Run the batch through every stage, then generate its delete
    /// statements
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage. The stages after it do
    /// not run.
    pub async fn process(
        &self,
        repo: &mut BoxRepository,
        batch: Batch,
    ) -> Result<Vec<DeleteStatement>, ClearJobError> {
        let mut batch = batch;
        for stage in &self.stages {
            debug!(stage = stage.name(), "running batch stage");
            batch = stage.process(repo, batch).await?;
        }

        self.expunge.expand(repo, &batch).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use expunge_data_model::{DeleteTarget, ResourceType};
    use expunge_storage::RepositoryFactory;
    use expunge_storage_memory::{MemoryRepositoryFactory, NewResource};

    use super::*;

    /// Counts the batches it sees
    struct CountingStage(Arc<AtomicUsize>);

    #[async_trait]
    impl BatchStage for CountingStage {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn process(
            &self,
            _repo: &mut BoxRepository,
            batch: Batch,
        ) -> Result<Batch, ClearJobError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(batch)
        }
    }

    fn patient(second: u32) -> NewResource {
        NewResource::new(
            ResourceType::new("Patient").unwrap(),
            Utc.with_ymd_and_hms(2023, 2, 2, 2, 2, second).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_links_then_statements() {
        let factory = MemoryRepositoryFactory::new();
        let golden = factory.add_resource(patient(1)).await;
        let source = factory.add_resource(patient(2)).await;
        factory.add_mdm_link(golden, source).await;

        let processor = CompositeProcessor::link_and_expunge(ExpungeOptions::default());

        let mut repo = factory.create().await.unwrap();
        let statements = processor
            .process(&mut repo, Batch::new(vec![source]).unwrap())
            .await
            .unwrap();
        repo.save().await.unwrap();

        assert_eq!(
            statements.last(),
            Some(&DeleteStatement::resource(source))
        );
        assert!(
            statements
                .iter()
                .all(|statement| statement.pid == source)
        );
        assert_eq!(factory.snapshot().await.mdm_links_of(source), 0);
    }

    #[tokio::test]
    async fn test_stage_failure_stops_the_chain() {
        let factory = MemoryRepositoryFactory::new();
        let target = factory.add_resource(patient(1)).await;
        let referrer = factory.add_resource(patient(2)).await;
        factory.add_reference(referrer, target, "Encounter.subject").await;

        let seen = Arc::new(AtomicUsize::new(0));
        let processor = CompositeProcessor::new(ExpungeStage::default())
            .with_stage(CountingStage(Arc::clone(&seen)))
            .with_stage(CountingStage(Arc::clone(&seen)));

        let mut repo = factory.create().await.unwrap();
        assert_matches!(
            processor
                .process(&mut repo, Batch::new(vec![target]).unwrap())
                .await,
            Err(ClearJobError::ReferencedByOther { .. })
        );
        repo.cancel().await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expunge_only() {
        let factory = MemoryRepositoryFactory::new();
        let pid = factory.add_resource(patient(1)).await;

        let processor = CompositeProcessor::new(ExpungeStage::default());
        let mut repo = factory.create().await.unwrap();
        let statements = processor
            .process(&mut repo, Batch::new(vec![pid]).unwrap())
            .await
            .unwrap();
        repo.cancel().await.unwrap();

        assert_eq!(
            statements
                .iter()
                .filter(|statement| statement.target == DeleteTarget::Resource)
                .count(),
            1
        );
    }
}
