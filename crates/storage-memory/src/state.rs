// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use expunge_data_model::{DependentTable, ResourcePid, ResourceType};

/// A resource to seed into a [`MemoryState`]
#[derive(Debug, Clone)]
pub struct NewResource {
    resource_type: ResourceType,
    created_at: DateTime<Utc>,
    search_params: Vec<(String, String)>,
    dependents: HashMap<DependentTable, usize>,
}

impl NewResource {
    /// A resource with a single version and nothing else attached to it
    #[must_use]
    pub fn new(resource_type: ResourceType, created_at: DateTime<Utc>) -> Self {
        Self {
            resource_type,
            created_at,
            search_params: Vec::new(),
            dependents: HashMap::from([(DependentTable::Versions, 1)]),
        }
    }

    /// Index a string search parameter for this resource
    #[must_use]
    pub fn with_search_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.search_params.push((name.into(), value.into()));
        self
    }

    /// Attach `count` opaque rows of a dependent table to this resource
    ///
    /// String index rows and outgoing references are better seeded through
    /// [`Self::with_search_param`] and
    /// [`MemoryRepositoryFactory::add_reference`], as those are what searches
    /// and integrity checks look at.
    ///
    /// [`MemoryRepositoryFactory::add_reference`]: crate::MemoryRepositoryFactory::add_reference
    #[must_use]
    pub fn with_dependents(mut self, table: DependentTable, count: usize) -> Self {
        self.dependents.insert(table, count);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredResource {
    pub resource_type: ResourceType,
    pub created_at: DateTime<Utc>,
    pub search_params: Vec<(String, String)>,
    pub dependents: HashMap<DependentTable, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredReference {
    pub source: ResourcePid,
    pub target: ResourcePid,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredMdmLink {
    pub golden: ResourcePid,
    pub source: ResourcePid,
}

/// The content of an in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub(crate) resources: BTreeMap<ResourcePid, StoredResource>,
    pub(crate) references: Vec<StoredReference>,
    pub(crate) mdm_links: Vec<StoredMdmLink>,
    next_pid: i64,
}

impl MemoryState {
    pub(crate) fn insert(&mut self, resource: NewResource) -> ResourcePid {
        self.next_pid += 1;
        let pid = ResourcePid::new(self.next_pid);
        self.resources.insert(
            pid,
            StoredResource {
                resource_type: resource.resource_type,
                created_at: resource.created_at,
                search_params: resource.search_params,
                dependents: resource.dependents,
            },
        );
        pid
    }

    /// Whether the resource row exists
    #[must_use]
    pub fn contains(&self, pid: ResourcePid) -> bool {
        self.resources.contains_key(&pid)
    }

    /// How many resources are stored
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// How many MDM links reference the resource, as source or golden resource
    #[must_use]
    pub fn mdm_links_of(&self, pid: ResourcePid) -> usize {
        self.mdm_links
            .iter()
            .filter(|link| link.golden == pid || link.source == pid)
            .count()
    }

    /// How many rows of a dependent table the resource owns
    #[must_use]
    pub fn dependent_count(&self, pid: ResourcePid, table: DependentTable) -> usize {
        let Some(resource) = self.resources.get(&pid) else {
            return 0;
        };

        let derived = match table {
            DependentTable::StringIndex => resource.search_params.len(),
            DependentTable::OutgoingReferences => self
                .references
                .iter()
                .filter(|reference| reference.source == pid)
                .count(),
            _ => 0,
        };

        derived + resource.dependents.get(&table).copied().unwrap_or_default()
    }

    /// How many references point at the resource
    #[must_use]
    pub fn incoming_references_of(&self, pid: ResourcePid) -> usize {
        self.references
            .iter()
            .filter(|reference| reference.target == pid)
            .count()
    }
}
