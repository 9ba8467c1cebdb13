// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ResourcePid;

/// Rows owned by a resource which must go before the resource itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentTable {
    /// Indexed string search parameters
    StringIndex,

    /// Indexed token search parameters
    TokenIndex,

    /// Indexed date search parameters
    DateIndex,

    /// References from this resource to other resources
    OutgoingReferences,

    /// Tags attached to historical versions
    HistoryTags,

    /// Tags attached to the current version
    Tags,

    /// Historical versions of the resource
    Versions,
}

impl DependentTable {
    /// Every dependent table, in deletion order.
    ///
    /// History tags reference versions, so they come first.
    pub const ALL: [Self; 7] = [
        Self::StringIndex,
        Self::TokenIndex,
        Self::DateIndex,
        Self::OutgoingReferences,
        Self::HistoryTags,
        Self::Tags,
        Self::Versions,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StringIndex => "string_index",
            Self::TokenIndex => "token_index",
            Self::DateIndex => "date_index",
            Self::OutgoingReferences => "outgoing_references",
            Self::HistoryTags => "history_tags",
            Self::Tags => "tags",
            Self::Versions => "versions",
        }
    }
}

impl fmt::Display for DependentTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a [`DeleteStatement`] removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteTarget {
    /// Rows of a dependent table owned by the resource
    Dependent(DependentTable),

    /// References from other resources pointing at the resource
    IncomingReferences,

    /// The resource row itself
    Resource,
}

impl fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependent(table) => table.fmt(f),
            Self::IncomingReferences => f.write_str("incoming_references"),
            Self::Resource => f.write_str("resource"),
        }
    }
}

/// A fully-bound delete of the rows of `target` owned by `pid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub target: DeleteTarget,
    pub pid: ResourcePid,
}

impl DeleteStatement {
    #[must_use]
    pub const fn dependent(table: DependentTable, pid: ResourcePid) -> Self {
        Self {
            target: DeleteTarget::Dependent(table),
            pid,
        }
    }

    #[must_use]
    pub const fn incoming_references(pid: ResourcePid) -> Self {
        Self {
            target: DeleteTarget::IncomingReferences,
            pid,
        }
    }

    #[must_use]
    pub const fn resource(pid: ResourcePid) -> Self {
        Self {
            target: DeleteTarget::Resource,
            pid,
        }
    }
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete {} of {}", self.target, self.pid)
    }
}

/// How many rows of a dependent table a resource owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependentCount {
    pub pid: ResourcePid,
    pub table: DependentTable,
    pub count: usize,
}

/// A reference from one resource to another, found through the `source_path`
/// element of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReference {
    pub source: ResourcePid,
    pub target: ResourcePid,
    pub source_path: String,
}
