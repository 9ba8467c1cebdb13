// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use expunge_data_model::{
    InvalidResourceTypeError, ResourcePid, ResourceType, SearchCriterion, SearchCriterionParseError,
};
use expunge_storage::{PageCursor, RepositoryError};
use thiserror::Error;

/// The job parameters were rejected before any batch was read
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No search criteria were given
    #[error("at least one search criterion is required")]
    NoCriteria,

    /// A criterion could not be parsed
    #[error("invalid search criterion {input:?}")]
    InvalidCriterion {
        /// The criterion as it was given
        input: String,

        /// The parse error
        #[source]
        source: SearchCriterionParseError,
    },

    /// A criterion targets a resource type which is not registered
    #[error("search criterion {criterion} targets unknown resource type {resource_type}")]
    UnknownResourceType {
        /// The offending criterion
        criterion: SearchCriterion,

        /// Its resource type
        resource_type: ResourceType,
    },

    /// A registered resource type is not a valid name
    #[error("invalid registered resource type")]
    InvalidRegisteredType(#[from] InvalidResourceTypeError),

    /// The chunk size is zero
    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    /// The page size is zero
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

/// Errors which stop a link-clear and expunge job
#[derive(Debug, Error)]
pub enum ClearJobError {
    /// The job parameters are invalid
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Searching for the next page of resources failed
    ///
    /// `last_cursor` tells how far the search went. There is no need to resume
    /// from it: running the job again is enough, as everything committed so
    /// far no longer matches and the rest is picked up from the newest row.
    #[error("failed to search resources matching {criterion}")]
    Query {
        /// The criterion being searched
        criterion: SearchCriterion,

        /// The cursor of the last page fetched for this criterion, if any
        last_cursor: Option<PageCursor>,

        /// The storage error
        #[source]
        source: RepositoryError,
    },

    /// A resource owns more dependent rows than allowed
    #[error(
        "resource {pid} has {count} dependent rows, more than the limit of {limit}; refusing to expunge"
    )]
    ExpungeLimitExceeded {
        /// The resource
        pid: ResourcePid,

        /// How many rows the resource owns across all dependent tables
        count: usize,

        /// The configured limit
        limit: usize,
    },

    /// A resource is still referenced by a resource outside of the batch
    #[error("resource {target} is still referenced by resource {referrer} through {path}")]
    ReferencedByOther {
        /// The resource about to be expunged
        target: ResourcePid,

        /// The resource referencing it
        referrer: ResourcePid,

        /// Where the reference lives in the referring resource
        path: String,
    },

    /// Executing or committing the statements of a batch failed, and the
    /// batch was rolled back
    #[error("failed to write batch")]
    Write(#[source] RepositoryError),

    /// The store failed while preparing a batch
    #[error("storage error")]
    Store(#[source] RepositoryError),
}
