// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use expunge_data_model::{
    DeleteStatement, DeleteTarget, DependentCount, DependentTable, InboundReference, ResourcePid,
};
use expunge_storage::expunge::ExpungeRepository;

use crate::{MemoryError, MemoryState, SharedFaults, with_faults};

/// An implementation of [`ExpungeRepository`] over an in-memory state
pub struct MemoryExpungeRepository<'c> {
    state: &'c mut MemoryState,
    faults: &'c SharedFaults,
}

impl<'c> MemoryExpungeRepository<'c> {
    pub(crate) fn new(state: &'c mut MemoryState, faults: &'c SharedFaults) -> Self {
        Self { state, faults }
    }

    fn delete_dependent(&mut self, table: DependentTable, pid: ResourcePid) -> Result<usize, MemoryError> {
        if table == DependentTable::Versions
            && self.state.dependent_count(pid, DependentTable::HistoryTags) > 0
        {
            return Err(MemoryError::ConstraintViolation {
                pid,
                reason: "history tags still reference its versions".to_owned(),
            });
        }

        let count = self.state.dependent_count(pid, table);

        if table == DependentTable::OutgoingReferences {
            self.state
                .references
                .retain(|reference| reference.source != pid);
        }

        if let Some(resource) = self.state.resources.get_mut(&pid) {
            if table == DependentTable::StringIndex {
                resource.search_params.clear();
            }
            resource.dependents.remove(&table);
        }

        Ok(count)
    }

    fn delete_resource(&mut self, pid: ResourcePid) -> Result<usize, MemoryError> {
        if !self.state.contains(pid) {
            return Ok(0);
        }

        if let Some(table) = DependentTable::ALL
            .into_iter()
            .find(|table| self.state.dependent_count(pid, *table) > 0)
        {
            return Err(MemoryError::ConstraintViolation {
                pid,
                reason: format!("it still has rows in {table}"),
            });
        }

        if self.state.incoming_references_of(pid) > 0 {
            return Err(MemoryError::ConstraintViolation {
                pid,
                reason: "other resources still reference it".to_owned(),
            });
        }

        if self.state.mdm_links_of(pid) > 0 {
            return Err(MemoryError::ConstraintViolation {
                pid,
                reason: "MDM links still reference it".to_owned(),
            });
        }

        self.state.resources.remove(&pid);
        Ok(1)
    }
}

#[async_trait]
impl ExpungeRepository for MemoryExpungeRepository<'_> {
    type Error = MemoryError;

    async fn dependent_counts(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<DependentCount>, Self::Error> {
        let counts = pids
            .iter()
            .flat_map(|pid| {
                DependentTable::ALL.into_iter().map(|table| DependentCount {
                    pid: *pid,
                    table,
                    count: self.state.dependent_count(*pid, table),
                })
            })
            .filter(|count| count.count > 0)
            .collect();

        Ok(counts)
    }

    async fn inbound_references(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<InboundReference>, Self::Error> {
        let references = self
            .state
            .references
            .iter()
            .filter(|reference| pids.contains(&reference.target) && !pids.contains(&reference.source))
            .map(|reference| InboundReference {
                source: reference.source,
                target: reference.target,
                source_path: reference.source_path.clone(),
            })
            .collect();

        Ok(references)
    }

    #[tracing::instrument(
        name = "db.expunge.execute",
        skip_all,
        fields(%statement),
        err,
    )]
    async fn execute(&mut self, statement: DeleteStatement) -> Result<usize, Self::Error> {
        with_faults(self.faults, |faults| faults.check_execute())?;

        match statement.target {
            DeleteTarget::Dependent(table) => self.delete_dependent(table, statement.pid),
            DeleteTarget::IncomingReferences => {
                let before = self.state.references.len();
                self.state
                    .references
                    .retain(|reference| reference.target != statement.pid);
                Ok(before - self.state.references.len())
            }
            DeleteTarget::Resource => self.delete_resource(statement.pid),
        }
    }
}
