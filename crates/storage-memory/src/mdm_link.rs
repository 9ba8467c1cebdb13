// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use expunge_data_model::ResourcePid;
use expunge_storage::mdm_link::MdmLinkRepository;

use crate::{MemoryError, MemoryState};

/// An implementation of [`MdmLinkRepository`] over an in-memory state
pub struct MemoryMdmLinkRepository<'c> {
    state: &'c mut MemoryState,
}

impl<'c> MemoryMdmLinkRepository<'c> {
    pub(crate) fn new(state: &'c mut MemoryState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl MdmLinkRepository for MemoryMdmLinkRepository<'_> {
    type Error = MemoryError;

    async fn delete_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error> {
        let before = self.state.mdm_links.len();
        self.state
            .mdm_links
            .retain(|link| !pids.contains(&link.golden) && !pids.contains(&link.source));
        Ok(before - self.state.mdm_links.len())
    }

    async fn count_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error> {
        Ok(self
            .state
            .mdm_links
            .iter()
            .filter(|link| pids.contains(&link.golden) || pids.contains(&link.source))
            .count())
    }
}
