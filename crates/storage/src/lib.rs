// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Interactions with the storage backend
//!
//! This crate provides a set of traits that can be implemented to interact with
//! the storage backend. Those traits are called repositories and are grouped by
//! the type of data they manage:
//!
//!   - [`ResourceSearchRepository`] resolves search criteria to pages of
//!     resources, newest first
//!   - [`MdmLinkRepository`] manages the MDM links derived from resources
//!   - [`ExpungeRepository`] inspects the rows depending on a resource and
//!     executes [`DeleteStatement`]s
//!
//! Each of those repositories can be accessed via the [`RepositoryAccess`]
//! trait. This trait can be wrapped in a [`BoxRepository`] to allow using it
//! without caring about the underlying storage backend, and without carrying
//! around the generic type parameter.
//!
//! A repository instance is a transaction: nothing it does is visible to other
//! repositories until [`RepositoryTransaction::save`] is called, and
//! [`RepositoryTransaction::cancel`] throws everything away.
//!
//! [`ResourceSearchRepository`]: crate::resource::ResourceSearchRepository
//! [`MdmLinkRepository`]: crate::mdm_link::MdmLinkRepository
//! [`ExpungeRepository`]: crate::expunge::ExpungeRepository
//! [`DeleteStatement`]: expunge_data_model::DeleteStatement

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod pagination;
pub(crate) mod repository;
mod utils;

pub mod expunge;
pub mod mdm_link;
pub mod resource;

pub use self::{
    pagination::{Page, PageCursor, Pagination},
    repository::{
        BoxRepository, BoxRepositoryFactory, Repository, RepositoryAccess, RepositoryError,
        RepositoryFactory, RepositoryTransaction,
    },
    utils::MapErr,
};
