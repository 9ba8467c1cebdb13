// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! The link-clear and expunge job

use std::time::Duration;

use expunge_config::ClearJobConfig;
use expunge_data_model::{Batch, ResourceType, SearchCriterion};
use expunge_storage::BoxRepositoryFactory;
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};
use tracing::{debug, error, info, warn};

use crate::{
    BatchStage, ClearJobError, CompositeProcessor, ExpungeOptions, JobCounters, JobExecutionContext,
    ReverseChronologicalPidReader, State, StatementWriter, StepExecutionContext,
    ValidationError, validate_criteria,
};


/// The parameters of a link-clear and expunge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearJobParameters {
    criteria: Vec<String>,
    resource_types: Vec<String>,
    chunk_size: usize,
    page_size: usize,
    expunge: ExpungeOptions,
    timeout: Option<Duration>,
}

impl ClearJobParameters {
    /// Parameters for the given search criteria, with the default
    /// configuration for everything else
    #[must_use]
    pub fn new<I, S>(criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(&ClearJobConfig::default(), criteria)
    }

    /// Parameters for the given search criteria, taking everything else from
    /// the `clear_job` configuration section
    #[must_use]
    pub fn from_config<I, S>(config: &ClearJobConfig, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            criteria: criteria.into_iter().map(Into::into).collect(),
            resource_types: config.resource_types.clone(),
            chunk_size: config.chunk_size,
            page_size: config.page_size,
            expunge: ExpungeOptions {
                max_dependents_per_resource: config.expunge.max_dependents_per_resource,
                cascade_incoming_references: config.expunge.cascade_incoming_references,
            },
            timeout: config.timeout(),
        }
    }

    /// Set how many resources are processed in one transaction
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set how many resources a single search page returns
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the resource types criteria may target
    #[must_use]
    pub fn with_resource_types<I, S>(mut self, resource_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_types = resource_types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the options of the expunge stage
    #[must_use]
    pub fn with_expunge_options(mut self, expunge: ExpungeOptions) -> Self {
        self.expunge = expunge;
        self
    }

    /// Stop issuing new batches after this long, unless the [`JobContext`]
    /// has its own timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The raw search criteria
    #[must_use]
    pub fn criteria(&self) -> &[String] {
        &self.criteria
    }

    /// How many resources are processed in one transaction
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// How many resources a single search page returns
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// The options of the expunge stage
    #[must_use]
    pub const fn expunge_options(&self) -> ExpungeOptions {
        self.expunge
    }

    /// The default timeout of the job
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// What the caller controls while a job runs
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    /// Stops the job before its next batch once cancelled
    pub cancellation_token: CancellationToken,

    /// Stop issuing new batches after this long. Takes precedence over the
    /// timeout of the [`ClearJobParameters`].
    pub timeout: Option<Duration>,
}

impl JobContext {
    /// A context driven by the given cancellation token, without timeout
    #[must_use]
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            timeout: None,
        }
    }

    /// Set the timeout of the job
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How a step stopped without failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Every matching resource was processed
    Completed,

    /// The job was cancelled or timed out before the reader was exhausted
    Cancelled,
}

/// The final status of a job run
#[derive(Debug)]
pub enum JobStatus {
    /// Every matching resource was processed
    Completed,

    /// The run stopped between two batches because it was cancelled or timed
    /// out
    Cancelled,

    /// A batch failed and was rolled back. Earlier batches stay committed.
    Failed(ClearJobError),
}

/// The outcome of a job run
#[derive(Debug)]
pub struct JobReport {
    /// How the run ended
    pub status: JobStatus,

    /// The job totals, including every batch committed before a failure
    pub counters: JobCounters,
}

impl JobReport {
    /// Whether every matching resource was processed
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, JobStatus::Completed)
    }

    /// The error which stopped the run, if any
    #[must_use]
    pub fn error(&self) -> Option<&ClearJobError> {
        match &self.status {
            JobStatus::Failed(e) => Some(e),
            JobStatus::Completed | JobStatus::Cancelled => None,
        }
    }
}

/// Clears the MDM links of the resources matching a set of criteria, then
/// expunges them, newest first and one batch per transaction
pub struct ClearJob {
    state: State,
    criteria: Vec<SearchCriterion>,
    chunk_size: usize,
    page_size: usize,
    timeout: Option<Duration>,
    processor: CompositeProcessor,
    writer: StatementWriter,
}

impl std::fmt::Debug for ClearJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClearJob")
            .field("criteria", &self.criteria)
            .field("chunk_size", &self.chunk_size)
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

impl ClearJob {
    /// The name of the only step of the job
    pub const STEP_NAME: &'static str = "clear_links_and_expunge";

    /// Validate the parameters and build the job
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a size is zero, if a criterion is
    /// malformed or targets an unregistered resource type, or if there are no
    /// criteria at all. Nothing is read from the store in that case.
    pub fn new(
        repository_factory: BoxRepositoryFactory,
        parameters: ClearJobParameters,
    ) -> Result<Self, ValidationError> {
        if parameters.chunk_size == 0 {
            return Err(ValidationError::ZeroChunkSize);
        }

        if parameters.page_size == 0 {
            return Err(ValidationError::ZeroPageSize);
        }

        let registered = parameters
            .resource_types
            .iter()
            .map(|resource_type| ResourceType::new(resource_type.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let criteria = validate_criteria(&parameters.criteria, &registered)?;

        Ok(Self {
            state: State::new(repository_factory),
            criteria,
            chunk_size: parameters.chunk_size,
            page_size: parameters.page_size,
            timeout: parameters.timeout,
            processor: CompositeProcessor::link_and_expunge(parameters.expunge),
            writer: StatementWriter,
        })
    }

    /// Run an extra stage on every batch, after the MDM links are deleted
    #[must_use]
    pub fn with_stage(self, stage: impl BatchStage + 'static) -> Self {
        Self {
            processor: self.processor.with_stage(stage),
            ..self
        }
    }

    /// The parsed search criteria
    #[must_use]
    pub fn criteria(&self) -> &[SearchCriterion] {
        &self.criteria
    }

    /// Run the job, and report how it ended
    ///
    /// The counters of the step are promoted into `execution` whether the step
    /// succeeded or not.
    ///
    /// There is no resume entry point. Committed batches are gone from the
    /// search results, so running the job again after a failure or a
    /// cancellation continues with the resources which are left.
    #[tracing::instrument(
        name = "job.clear_links_and_expunge",
        skip_all,
        fields(
            job.criteria = self.criteria.len(),
            job.chunk_size = self.chunk_size,
        ),
    )]
    pub async fn run(&self, context: &JobContext, execution: &mut JobExecutionContext) -> JobReport {
        let cancellation_token = context.cancellation_token.child_token();
        let timeout = context.timeout.or(self.timeout);

        // Dropping the handle stops the timer when the step ends first
        let _timer = timeout.map(|timeout| {
            let token = cancellation_token.clone();
            AbortOnDropHandle::new(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(?timeout, "Job timed out, stopping before the next batch");
                token.cancel();
            }))
        });

        let context = JobContext {
            cancellation_token,
            timeout,
        };

        let mut step = StepExecutionContext::new(Self::STEP_NAME);
        let result = self.run_step(&context, &mut step).await;
        let (resources_processed, entities_deleted) = step.counters().totals();
        execution.promote(step);

        let status = match result {
            Ok(StepOutcome::Completed) => {
                if resources_processed == 0 {
                    debug!("no resources to expunge");
                } else {
                    info!(
                        resources_processed,
                        entities_deleted, "cleared links and expunged resources"
                    );
                }
                JobStatus::Completed
            }

            Ok(StepOutcome::Cancelled) => {
                info!(
                    resources_processed,
                    entities_deleted, "job cancelled before processing every resource"
                );
                JobStatus::Cancelled
            }

            Err(e) => {
                error!(
                    error = &e as &dyn std::error::Error,
                    resources_processed, entities_deleted, "Job failed"
                );
                JobStatus::Failed(e)
            }
        };

        JobReport {
            status,
            counters: execution.counters(),
        }
    }

    /// Run the only step of the job: read batches and process them until the
    /// reader is exhausted or the job is cancelled
    ///
    /// Batches run one after the other. Every committed batch is recorded in
    /// `step` before the next one starts.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing batch. That batch was rolled
    /// back, the ones before it stay committed.
    pub async fn run_step(
        &self,
        context: &JobContext,
        step: &mut StepExecutionContext,
    ) -> Result<StepOutcome, ClearJobError> {
        let mut reader = ReverseChronologicalPidReader::new(
            self.state.clone(),
            self.criteria.clone(),
            self.chunk_size,
            self.page_size,
        );

        while !context.cancellation_token.is_cancelled() {
            // Stop waiting on the store once cancelled
            let next = tokio::select! {
                biased;

                () = context.cancellation_token.cancelled() => break,
                next = reader.next_batch() => next?,
            };

            let Some(batch) = next else {
                return Ok(StepOutcome::Completed);
            };

            let batch_size = batch.len();
            let affected_rows = self.run_batch(batch).await?;
            step.record(batch_size, affected_rows);
        }

        Ok(StepOutcome::Cancelled)
    }

    #[tracing::instrument(
        name = "job.batch",
        skip_all,
        fields(batch.size = batch.len()),
        err,
    )]
    async fn run_batch(&self, batch: Batch) -> Result<u64, ClearJobError> {
        let mut repo = self
            .state
            .repository()
            .await
            .map_err(ClearJobError::Store)?;

        match self.processor.process(&mut repo, batch).await {
            Ok(statements) => self.writer.write(repo, statements).await,

            Err(e) => {
                if let Err(cancel_error) = repo.cancel().await {
                    warn!(
                        error = &cancel_error as &dyn std::error::Error,
                        "Failed to roll back batch"
                    );
                }
                Err(e)
            }
        }
    }
}
