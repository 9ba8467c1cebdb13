// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::{InvalidResourceTypeError, ResourceType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchCriterionParseError {
    #[error(transparent)]
    InvalidResourceType(#[from] InvalidResourceTypeError),

    #[error("missing parameter name in {0:?}")]
    MissingParameterName(String),

    #[error("missing value for parameter {0:?}")]
    MissingParameterValue(String),

    #[error("invalid percent-encoding in {0:?}")]
    InvalidEncoding(String),
}

/// A search over one resource type, in its `Type?name=value&...` form
///
/// A resource matches when it has the criterion's type and, for every
/// parameter, an indexed string search parameter with that exact name and
/// value. A criterion without parameters matches every resource of its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchCriterion {
    resource_type: ResourceType,
    parameters: Vec<(String, String)>,
}

impl SearchCriterion {
    #[must_use]
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            parameters: Vec::new(),
        }
    }

    /// Add a `name=value` parameter to the criterion
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Parse a criterion from its textual form
    ///
    /// # Errors
    ///
    /// Returns an error if the resource type is invalid or a parameter is
    /// malformed
    pub fn parse(input: &str) -> Result<Self, SearchCriterionParseError> {
        let input = input.trim();
        let (resource_type, query) = input.split_once('?').unwrap_or((input, ""));
        let mut criterion = Self::new(ResourceType::new(resource_type)?);

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| SearchCriterionParseError::MissingParameterValue(pair.to_owned()))?;

            if name.is_empty() {
                return Err(SearchCriterionParseError::MissingParameterName(
                    pair.to_owned(),
                ));
            }

            let name = decode(name)?;
            let value = decode(value)?;
            criterion.parameters.push((name, value));
        }

        Ok(criterion)
    }

    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    #[must_use]
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }
}

fn decode(raw: &str) -> Result<String, SearchCriterionParseError> {
    // `+` is a space in query strings, urlencoding only handles `%XX`
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| SearchCriterionParseError::InvalidEncoding(raw.clone()))
}

impl FromStr for SearchCriterion {
    type Err = SearchCriterionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SearchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource_type)?;

        for (index, (name, value)) in self.parameters.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(
                f,
                "{separator}{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )?;
        }

        Ok(())
    }
}
