// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::ops::Deref;

use crate::ResourcePid;

/// An ordered group of resources processed and committed together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pids: Vec<ResourcePid>,
}

impl Batch {
    /// Wrap a list of PIDs in a batch, returning `None` if the list is empty
    #[must_use]
    pub fn new(pids: Vec<ResourcePid>) -> Option<Self> {
        if pids.is_empty() {
            None
        } else {
            Some(Self { pids })
        }
    }

    #[must_use]
    pub fn pids(&self) -> &[ResourcePid] {
        &self.pids
    }

    #[must_use]
    pub fn into_pids(self) -> Vec<ResourcePid> {
        self.pids
    }
}

impl Deref for Batch {
    type Target = [ResourcePid];

    fn deref(&self) -> &Self::Target {
        &self.pids
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a ResourcePid;
    type IntoIter = std::slice::Iter<'a, ResourcePid>;

    fn into_iter(self) -> Self::IntoIter {
        self.pids.iter()
    }
}
