// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repositories to manage MDM links

use async_trait::async_trait;
use expunge_data_model::ResourcePid;

use crate::repository_impl;

/// A [`MdmLinkRepository`] helps managing the links the MDM subsystem derives
/// between source resources and their golden resource
#[async_trait]
pub trait MdmLinkRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Delete every link whose source or golden resource is one of the given
    /// resources
    ///
    /// Returns the number of deleted links
    ///
    /// # Parameters
    ///
    /// * `pids`: The resources to unlink
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn delete_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error>;

    /// Count the links whose source or golden resource is one of the given
    /// resources
    ///
    /// # Parameters
    ///
    /// * `pids`: The resources to look for
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn count_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error>;
}

repository_impl!(MdmLinkRepository:
    async fn delete_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error>;
    async fn count_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error>;
);
