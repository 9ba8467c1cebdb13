// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Data types shared by the storage layer and the clear/expunge pipeline

#![allow(clippy::module_name_repetitions)]

mod batch;
mod resource;
mod search;
mod statement;

pub use self::{
    batch::Batch,
    resource::{InvalidResourceTypeError, ResourcePid, ResourceRow, ResourceType},
    search::{SearchCriterion, SearchCriterionParseError},
    statement::{DeleteStatement, DeleteTarget, DependentCount, DependentTable, InboundReference},
};
