// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An implementation of the storage traits for a PostgreSQL database
//!
//! This backend uses [`sqlx`] to interact with the database. Most queries are
//! built dynamically with [`sea_query`], as the number of search parameters
//! and the size of batches vary from call to call.
//!
//! # Migrations
//!
//! Migrations live in the `migrations` directory and are embedded in the
//! binary. Run them with [`MIGRATOR`] before using the repositories.

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

use sqlx::migrate::Migrator;
use thiserror::Error;

pub mod expunge;
mod filter;
pub(crate) mod iden;
pub mod mdm_link;
pub(crate) mod pagination;
pub(crate) mod repository;
pub mod resource;
pub(crate) mod tracing;

pub use self::repository::{PgRepository, PgRepositoryFactory};

/// Embedded migrations, allowing them to run on startup
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Generic error when interacting with the database
#[derive(Debug, Error)]
#[error(transparent)]
pub enum DatabaseError {
    /// An error which came from the database itself
    Driver {
        /// The underlying error from the database driver
        #[from]
        source: sqlx::Error,
    },

    /// An error which occurred while converting the data from the database
    Inconsistency(#[from] DatabaseInconsistencyError),
}

/// An error which occurs when the database returned data which does not make
/// sense
#[derive(Debug, Error)]
#[error("Database inconsistency on table {table} column {column} row {row}")]
pub struct DatabaseInconsistencyError {
    table: &'static str,
    column: &'static str,
    row: i64,

    #[source]
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl DatabaseInconsistencyError {
    /// Create a new [`DatabaseInconsistencyError`] for the given row
    #[must_use]
    pub(crate) fn on(table: &'static str, column: &'static str, row: i64) -> Self {
        Self {
            table,
            column,
            row,
            source: "invalid value".into(),
        }
    }

    /// Attach a source error to this [`DatabaseInconsistencyError`]
    #[must_use]
    pub(crate) fn source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Box::new(source);
        self
    }
}
