// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Checks run on the job parameters before the first batch

use expunge_data_model::{ResourceType, SearchCriterion};

use crate::ValidationError;

/// Parse search criteria, and check they only target registered resource
/// types
///
/// # Errors
///
/// Returns a [`ValidationError`] if the list is empty, if a criterion is
/// malformed, or if it targets a resource type not in `registered`
pub fn validate_criteria<S: AsRef<str>>(
    raw: &[S],
    registered: &[ResourceType],
) -> Result<Vec<SearchCriterion>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::NoCriteria);
    }

    raw.iter()
        .map(|input| {
            let input = input.as_ref();
            let criterion = SearchCriterion::parse(input).map_err(|source| {
                ValidationError::InvalidCriterion {
                    input: input.to_owned(),
                    source,
                }
            })?;

            if !registered.contains(criterion.resource_type()) {
                return Err(ValidationError::UnknownResourceType {
                    resource_type: criterion.resource_type().clone(),
                    criterion,
                });
            }

            Ok(criterion)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use expunge_data_model::SearchCriterionParseError;

    use super::*;

    fn registered() -> Vec<ResourceType> {
        vec![
            ResourceType::new("Patient").unwrap(),
            ResourceType::new("Observation").unwrap(),
        ]
    }

    #[test]
    fn test_valid_criteria() {
        let criteria =
            validate_criteria(&["Patient?family=Smith", "Observation"], &registered()).unwrap();

        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].resource_type().as_str(), "Patient");
        assert_eq!(
            criteria[0].parameters(),
            &[("family".to_owned(), "Smith".to_owned())]
        );
        assert!(criteria[1].parameters().is_empty());
    }

    #[test]
    fn test_empty_criteria() {
        let raw: [&str; 0] = [];
        assert_eq!(
            validate_criteria(&raw, &registered()),
            Err(ValidationError::NoCriteria)
        );
    }

    #[test]
    fn test_unknown_resource_type() {
        assert_matches!(
            validate_criteria(&["Patient", "Encounter?status=finished"], &registered()),
            Err(ValidationError::UnknownResourceType { resource_type, .. }) if resource_type.as_str() == "Encounter"
        );
    }

    #[test]
    fn test_malformed_criterion() {
        assert_matches!(
            validate_criteria(&["Patient?=Smith"], &registered()),
            Err(ValidationError::InvalidCriterion {
                source: SearchCriterionParseError::MissingParameterName(_),
                ..
            })
        );

        assert_matches!(
            validate_criteria(&["?family=Smith"], &registered()),
            Err(ValidationError::InvalidCriterion { .. })
        );
    }
}
