// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Progress counters of a job
//!
//! A step owns a [`StepExecutionContext`] and records into it once per
//! committed batch. When the step ends, successfully or not, its counters are
//! promoted into the [`JobExecutionContext`], where later steps and the final
//! report read them.

use serde::{Deserialize, Serialize};

/// Resources processed and rows deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    /// How many resources went through a committed batch
    pub resources_processed: u64,

    /// How many rows the committed statements deleted
    pub entities_deleted: u64,
}

impl JobCounters {
    /// Record a committed batch
    pub fn record(&mut self, batch_size: usize, affected_rows: u64) {
        let batch_size = u64::try_from(batch_size).unwrap_or(u64::MAX);
        self.resources_processed = self.resources_processed.saturating_add(batch_size);
        self.entities_deleted = self.entities_deleted.saturating_add(affected_rows);
    }

    /// The `(resources processed, entities deleted)` totals
    #[must_use]
    pub const fn totals(&self) -> (u64, u64) {
        (self.resources_processed, self.entities_deleted)
    }

    fn absorb(&mut self, other: Self) {
        self.resources_processed = self
            .resources_processed
            .saturating_add(other.resources_processed);
        self.entities_deleted = self.entities_deleted.saturating_add(other.entities_deleted);
    }
}

/// The counters of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecutionContext {
    step_name: String,
    counters: JobCounters,
}

impl StepExecutionContext {
    /// Start counting for a new step
    #[must_use]
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            counters: JobCounters::default(),
        }
    }

    /// The name of the step
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// The counters of the step so far
    #[must_use]
    pub const fn counters(&self) -> JobCounters {
        self.counters
    }

    /// Record a committed batch
    pub fn record(&mut self, batch_size: usize, affected_rows: u64) {
        self.counters.record(batch_size, affected_rows);
    }
}

/// The counters of a whole job run, carried from one step to the next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecutionContext {
    counters: JobCounters,
    steps: Vec<StepExecutionContext>,
}

impl JobExecutionContext {
    /// Create the context of a new job run
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The totals of all the promoted steps
    #[must_use]
    pub const fn counters(&self) -> JobCounters {
        self.counters
    }

    /// The steps promoted so far, in order
    #[must_use]
    pub fn steps(&self) -> &[StepExecutionContext] {
        &self.steps
    }

    /// Fold the counters of a finished step into the job totals
    pub fn promote(&mut self, step: StepExecutionContext) {
        self.counters.absorb(step.counters);
        self.steps.push(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_are_sums() {
        let mut step = StepExecutionContext::new("clear");
        let batches = [(1, 2), (1, 5), (3, 0), (2, 7)];
        for (size, affected) in batches {
            step.record(size, affected);
        }

        assert_eq!(step.counters().totals(), (7, 14));
    }

    #[test]
    fn test_promote_accumulates_steps() {
        let mut job = JobExecutionContext::new();

        let mut first = StepExecutionContext::new("first");
        first.record(2, 4);
        job.promote(first);

        let mut second = StepExecutionContext::new("second");
        second.record(1, 3);
        job.promote(second);

        assert_eq!(job.counters().totals(), (3, 7));
        let names: Vec<_> = job.steps().iter().map(StepExecutionContext::step_name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_counters_saturate() {
        let mut counters = JobCounters {
            resources_processed: u64::MAX - 1,
            entities_deleted: u64::MAX,
        };
        counters.record(5, 5);

        assert_eq!(counters.totals(), (u64::MAX, u64::MAX));
    }

    #[test]
    fn test_context_survives_serialization() {
        let mut job = JobExecutionContext::new();
        let mut step = StepExecutionContext::new("clear");
        step.record(3, 6);
        job.promote(step);

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["counters"]["resources_processed"], 3);
        assert_eq!(json["counters"]["entities_deleted"], 6);

        let restored: JobExecutionContext = serde_json::from_value(json).unwrap();
        assert_eq!(restored, job);
    }
}
