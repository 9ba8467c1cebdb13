// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An in-memory implementation of the storage traits
//!
//! Each repository is a transaction: it holds the store lock for its whole
//! lifetime and works on a private copy of the state, which replaces the
//! shared state on [`RepositoryTransaction::save`]. Transactions are therefore
//! fully serialized.
//!
//! Faults can be injected to exercise failure paths: see
//! [`MemoryRepositoryFactory::fail_execute_after`],
//! [`MemoryRepositoryFactory::fail_next_search`] and
//! [`MemoryRepositoryFactory::fail_next_save`].

#![allow(clippy::module_name_repetitions)]

use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use expunge_data_model::ResourcePid;
use expunge_storage::{
    BoxRepository, BoxRepositoryFactory, Repository, RepositoryAccess, RepositoryError,
    RepositoryFactory, RepositoryTransaction, expunge::ExpungeRepository,
    mdm_link::MdmLinkRepository, resource::ResourceSearchRepository,
};
use futures_util::{FutureExt, future::BoxFuture};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

mod expunge;
mod mdm_link;
mod resource;
mod state;

pub use self::state::{MemoryState, NewResource};
use self::{
    expunge::MemoryExpungeRepository, mdm_link::MemoryMdmLinkRepository,
    resource::MemoryResourceSearchRepository, state::{StoredMdmLink, StoredReference},
};

/// Errors returned by the in-memory store
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A failure injected through the factory
    #[error("injected {0} failure")]
    Injected(&'static str),

    /// A delete would have left rows pointing at a missing resource
    #[error("cannot delete resource {pid}: {reason}")]
    ConstraintViolation {
        /// The resource being deleted
        pid: ResourcePid,
        /// What still depends on it
        reason: String,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Faults {
    execute_budget: Option<usize>,
    search: bool,
    save: bool,
}

impl Faults {
    pub(crate) fn check_execute(&mut self) -> Result<(), MemoryError> {
        match self.execute_budget.as_mut() {
            Some(0) => {
                self.execute_budget = None;
                Err(MemoryError::Injected("execute"))
            }
            Some(budget) => {
                *budget -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub(crate) fn check_search(&mut self) -> Result<(), MemoryError> {
        if std::mem::take(&mut self.search) {
            Err(MemoryError::Injected("search"))
        } else {
            Ok(())
        }
    }

    fn check_save(&mut self) -> Result<(), MemoryError> {
        if std::mem::take(&mut self.save) {
            Err(MemoryError::Injected("save"))
        } else {
            Ok(())
        }
    }
}

pub(crate) type SharedFaults = Arc<std::sync::Mutex<Faults>>;

pub(crate) fn with_faults<T>(faults: &SharedFaults, f: impl FnOnce(&mut Faults) -> T) -> T {
    let mut faults = faults.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut faults)
}

/// An implementation of the [`RepositoryFactory`] trait backed by a shared
/// in-memory state
#[derive(Clone, Default)]
pub struct MemoryRepositoryFactory {
    state: Arc<Mutex<MemoryState>>,
    faults: SharedFaults,
}

impl MemoryRepositoryFactory {
    /// Create a factory over an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Box the factory
    #[must_use]
    pub fn boxed(self) -> BoxRepositoryFactory {
        Box::new(self)
    }

    /// Start a transaction on the store
    pub async fn repository(&self) -> MemoryRepository {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        MemoryRepository {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        }
    }

    /// Get a copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Store a new resource, returning its PID
    ///
    /// PIDs are allocated in insertion order, independently of `created_at`.
    pub async fn add_resource(&self, resource: NewResource) -> ResourcePid {
        self.state.lock().await.insert(resource)
    }

    /// Record that `source` references `target` through `source_path`
    pub async fn add_reference(
        &self,
        source: ResourcePid,
        target: ResourcePid,
        source_path: impl Into<String>,
    ) {
        self.state.lock().await.references.push(StoredReference {
            source,
            target,
            source_path: source_path.into(),
        });
    }

    /// Link a source resource to its golden resource
    pub async fn add_mdm_link(&self, golden: ResourcePid, source: ResourcePid) {
        self.state
            .lock()
            .await
            .mdm_links
            .push(StoredMdmLink { golden, source });
    }

    /// Let `count` more statements execute, then fail the next one
    pub fn fail_execute_after(&self, count: usize) {
        with_faults(&self.faults, |faults| faults.execute_budget = Some(count));
    }

    /// Fail the next search
    pub fn fail_next_search(&self) {
        with_faults(&self.faults, |faults| faults.search = true);
    }

    /// Fail the next commit
    pub fn fail_next_save(&self) {
        with_faults(&self.faults, |faults| faults.save = true);
    }
}

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        Ok(self.repository().await.boxed())
    }
}

/// An implementation of the [`Repository`] trait backed by a private copy of
/// the in-memory state
pub struct MemoryRepository {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: SharedFaults,
}

impl Repository<MemoryError> for MemoryRepository {}

impl RepositoryTransaction for MemoryRepository {
    type Error = MemoryError;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        let Self {
            mut guard,
            working,
            faults,
        } = *self;

        async move {
            with_faults(&faults, Faults::check_save)?;
            *guard = working;
            tracing::debug!("Committed in-memory transaction");
            Ok(())
        }
        .boxed()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        // Dropping the working copy is all it takes
        drop(self);
        async { Ok(()) }.boxed()
    }
}

impl RepositoryAccess for MemoryRepository {
    type Error = MemoryError;

    fn resource_search<'c>(
        &'c mut self,
    ) -> Box<dyn ResourceSearchRepository<Error = Self::Error> + 'c> {
        Box::new(MemoryResourceSearchRepository::new(
            &self.working,
            &self.faults,
        ))
    }

    fn mdm_link<'c>(&'c mut self) -> Box<dyn MdmLinkRepository<Error = Self::Error> + 'c> {
        Box::new(MemoryMdmLinkRepository::new(&mut self.working))
    }

    fn expunge<'c>(&'c mut self) -> Box<dyn ExpungeRepository<Error = Self::Error> + 'c> {
        Box::new(MemoryExpungeRepository::new(
            &mut self.working,
            &self.faults,
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use expunge_data_model::{DeleteStatement, DependentTable, ResourceType, SearchCriterion};
    use expunge_storage::Pagination;

    use super::*;

    fn patient(second: u32) -> NewResource {
        NewResource::new(
            ResourceType::new("Patient").unwrap(),
            Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, second).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_cancel_discards_changes() {
        let factory = MemoryRepositoryFactory::new();
        let pid = factory.add_resource(patient(1)).await;

        let mut repo = factory.create().await.unwrap();
        repo.expunge()
            .execute(DeleteStatement::dependent(DependentTable::Versions, pid))
            .await
            .unwrap();
        repo.expunge()
            .execute(DeleteStatement::resource(pid))
            .await
            .unwrap();
        repo.cancel().await.unwrap();

        assert!(factory.snapshot().await.contains(pid));

        let mut repo = factory.create().await.unwrap();
        repo.expunge()
            .execute(DeleteStatement::dependent(DependentTable::Versions, pid))
            .await
            .unwrap();
        repo.expunge()
            .execute(DeleteStatement::resource(pid))
            .await
            .unwrap();
        repo.save().await.unwrap();

        assert!(!factory.snapshot().await.contains(pid));
    }

    #[tokio::test]
    async fn test_resource_delete_enforces_constraints() {
        let factory = MemoryRepositoryFactory::new();
        let pid = factory.add_resource(patient(1)).await;
        let other = factory.add_resource(patient(2)).await;
        factory.add_reference(other, pid, "Patient.link").await;

        let mut repo = factory.repository().await;

        // Still has its version
        assert_matches!(
            repo.expunge().execute(DeleteStatement::resource(pid)).await,
            Err(MemoryError::ConstraintViolation { .. })
        );

        repo.expunge()
            .execute(DeleteStatement::dependent(DependentTable::Versions, pid))
            .await
            .unwrap();

        // Still referenced by the other patient
        assert_matches!(
            repo.expunge().execute(DeleteStatement::resource(pid)).await,
            Err(MemoryError::ConstraintViolation { .. })
        );

        let removed = repo
            .expunge()
            .execute(DeleteStatement::incoming_references(pid))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            repo.expunge()
                .execute(DeleteStatement::resource(pid))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_search_pages_newest_first() {
        let factory = MemoryRepositoryFactory::new();
        let oldest = factory
            .add_resource(patient(1).with_search_param("family", "smith"))
            .await;
        let middle = factory
            .add_resource(patient(2).with_search_param("family", "smith"))
            .await;
        factory
            .add_resource(patient(3).with_search_param("family", "jones"))
            .await;
        let newest = factory
            .add_resource(patient(4).with_search_param("family", "smith"))
            .await;

        let criterion = SearchCriterion::parse("Patient?family=smith").unwrap();
        let mut repo = factory.repository().await;

        let page = repo
            .resource_search()
            .search(&criterion, Pagination::first(2))
            .await
            .unwrap();
        let pids: Vec<_> = page.rows.iter().map(|row| row.pid).collect();
        assert_eq!(pids, vec![newest, middle]);
        let next = page.next.unwrap();

        let page = repo
            .resource_search()
            .search(&criterion, Pagination::first(2).before(next))
            .await
            .unwrap();
        let pids: Vec<_> = page.rows.iter().map(|row| row.pid).collect();
        assert_eq!(pids, vec![oldest]);
        assert_eq!(page.next, None);
    }

    #[tokio::test]
    async fn test_injected_faults_fire_once() {
        let factory = MemoryRepositoryFactory::new();
        let pid = factory.add_resource(patient(1)).await;
        let criterion = SearchCriterion::parse("Patient").unwrap();

        factory.fail_next_search();
        let mut repo = factory.repository().await;
        assert_matches!(
            repo.resource_search()
                .search(&criterion, Pagination::first(10))
                .await,
            Err(MemoryError::Injected("search"))
        );
        repo.resource_search()
            .search(&criterion, Pagination::first(10))
            .await
            .unwrap();

        factory.fail_execute_after(1);
        let mut expunge = repo.expunge();
        expunge
            .execute(DeleteStatement::dependent(DependentTable::Tags, pid))
            .await
            .unwrap();
        assert_matches!(
            expunge
                .execute(DeleteStatement::dependent(DependentTable::Tags, pid))
                .await,
            Err(MemoryError::Injected("execute"))
        );
        expunge
            .execute(DeleteStatement::dependent(DependentTable::Tags, pid))
            .await
            .unwrap();
    }
}
