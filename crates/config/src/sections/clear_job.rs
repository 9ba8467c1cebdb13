// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};
use serde_with::serde_as;

use crate::ConfigurationSection;

const fn default_chunk_size() -> usize {
    1
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_default_chunk_size(value: &usize) -> bool {
    *value == default_chunk_size()
}

const fn default_page_size() -> usize {
    100
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_default_page_size(value: &usize) -> bool {
    *value == default_page_size()
}

fn default_resource_types() -> Vec<String> {
    [
        "Patient",
        "Practitioner",
        "Organization",
        "Encounter",
        "Observation",
        "Condition",
        "Procedure",
        "MedicationRequest",
    ]
    .into_iter()
    .map(ToOwned::to_owned)
    .collect()
}

/// Options of the expunge stage
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ExpungeConfig {
    /// Refuse to expunge a resource which owns more than this many rows in
    /// total across its dependent tables. Unlimited if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub max_dependents_per_resource: Option<usize>,

    /// Also delete the references other resources hold on the expunged
    /// resources. When disabled, a batch containing a resource still
    /// referenced from outside the batch fails.
    #[serde(default)]
    pub cascade_incoming_references: bool,
}

/// Configuration of the link-clear and expunge job
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ClearJobConfig {
    /// How many resources are processed in one transaction. Defaults to 1.
    #[schemars(range(min = 1))]
    #[serde(
        default = "default_chunk_size",
        skip_serializing_if = "is_default_chunk_size"
    )]
    pub chunk_size: usize,

    /// How many resources a single search page returns. Defaults to 100.
    #[schemars(range(min = 1))]
    #[serde(
        default = "default_page_size",
        skip_serializing_if = "is_default_page_size"
    )]
    pub page_size: usize,

    /// Stop issuing new batches after this many seconds
    #[schemars(with = "Option<u64>", range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<serde_with::DurationSeconds<i64>>")]
    pub timeout: Option<Duration>,

    /// The resource types search criteria may target
    #[serde(default = "default_resource_types")]
    pub resource_types: Vec<String>,

    /// Options of the expunge stage
    #[serde(default)]
    pub expunge: ExpungeConfig,
}

impl Default for ClearJobConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            page_size: default_page_size(),
            timeout: None,
            resource_types: default_resource_types(),
            expunge: ExpungeConfig::default(),
        }
    }
}

impl ConfigurationSection for ClearJobConfig {
    const PATH: Option<&'static str> = Some("clear_job");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let path = Self::PATH.unwrap_or_default();
        let metadata = figment.find_metadata(path);

        let error_on_field = |message: &str, field: &'static str| {
            let mut error = figment::error::Error::custom(message);
            error.metadata = metadata.cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![path.to_owned(), field.to_owned()];
            error
        };

        if self.chunk_size == 0 {
            return Err(error_on_field("`chunk_size` must be at least 1", "chunk_size").into());
        }

        if self.page_size == 0 {
            return Err(error_on_field("`page_size` must be at least 1", "page_size").into());
        }

        if self.timeout.is_some_and(|timeout| timeout <= Duration::zero()) {
            return Err(error_on_field(
                "`timeout` must be a positive number of seconds",
                "timeout",
            )
            .into());
        }

        if self.resource_types.is_empty() {
            return Err(error_on_field(
                "at least one resource type must be registered",
                "resource_types",
            )
            .into());
        }

        if self.expunge.max_dependents_per_resource == Some(0) {
            return Err(error_on_field(
                "`max_dependents_per_resource` must be at least 1",
                "expunge",
            )
            .into());
        }

        Ok(())
    }
}

impl ClearJobConfig {
    /// The timeout as a standard library duration, if one is set
    #[must_use]
    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout.and_then(|timeout| timeout.to_std().ok())
    }
}
