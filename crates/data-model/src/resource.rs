// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The storage identifier of a resource row
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResourcePid(i64);

impl ResourcePid {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ResourcePid {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ResourcePid> for i64 {
    fn from(value: ResourcePid) -> Self {
        value.0
    }
}

impl fmt::Display for ResourcePid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid resource type {0:?}")]
pub struct InvalidResourceTypeError(String);

/// The name of a resource type, like `Patient` or `Observation`
///
/// A valid name starts with an ASCII letter and only contains ASCII
/// alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceType(String);

impl ResourceType {
    /// Validate and wrap a resource type name
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, does not start with a letter or
    /// contains non-alphanumeric characters
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidResourceTypeError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric());

        if valid {
            Ok(Self(name))
        } else {
            Err(InvalidResourceTypeError(name))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ResourceType {
    type Err = InvalidResourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceType {
    type Error = InvalidResourceTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resource as returned by a search: enough to order and identify it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow {
    pub pid: ResourcePid,
    pub resource_type: ResourceType,
    pub created_at: DateTime<Utc>,
}
