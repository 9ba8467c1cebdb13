// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use expunge_data_model::SearchCriterion;
use sea_query::{Condition, Expr, Query};

use crate::iden::{Resources, StringIndex};

/// A filter which can be applied to a query
pub(crate) trait Filter {
    /// Generate a condition for the filter
    fn generate_condition(&self) -> impl sea_query::IntoCondition;
}

pub(crate) trait StatementExt {
    /// Apply the filter to the query
    fn apply_filter<F: Filter>(&mut self, filter: F) -> &mut Self;
}

impl StatementExt for sea_query::SelectStatement {
    fn apply_filter<F: Filter>(&mut self, filter: F) -> &mut Self {
        let condition = filter.generate_condition();
        self.cond_where(condition)
    }
}

/// Resources of the criterion type, with one indexed string value per
/// parameter
impl Filter for &SearchCriterion {
    fn generate_condition(&self) -> impl sea_query::IntoCondition {
        let base = Condition::all().add(
            Expr::col((Resources::Table, Resources::ResType)).eq(self.resource_type().as_str()),
        );

        self.parameters()
            .iter()
            .fold(base, |condition, (name, value)| {
                let indexed = Query::select()
                    .expr(Expr::val(1))
                    .from(StringIndex::Table)
                    .and_where(
                        Expr::col((StringIndex::Table, StringIndex::ResId))
                            .equals((Resources::Table, Resources::ResId)),
                    )
                    .and_where(Expr::col((StringIndex::Table, StringIndex::SpName)).eq(name.as_str()))
                    .and_where(
                        Expr::col((StringIndex::Table, StringIndex::SpValue)).eq(value.as_str()),
                    )
                    .take();

                condition.add(Expr::exists(indexed))
            })
    }
}

#[cfg(test)]
mod tests {
    use sea_query::PostgresQueryBuilder;

    use super::*;

    #[test]
    fn test_criterion_condition() {
        let criterion = SearchCriterion::parse("Patient?family=Smith").unwrap();
        let sql = Query::select()
            .column((Resources::Table, Resources::ResId))
            .from(Resources::Table)
            .apply_filter(&criterion)
            .to_string(PostgresQueryBuilder);

        assert!(
            sql.starts_with(
                r#"SELECT "hfj_resource"."res_id" FROM "hfj_resource" WHERE "hfj_resource"."res_type" = 'Patient' AND EXISTS"#
            ),
            "{sql}"
        );
        assert!(
            sql.contains(r#""hfj_spidx_string"."res_id" = "hfj_resource"."res_id""#),
            "{sql}"
        );
        assert!(
            sql.contains(r#""hfj_spidx_string"."sp_value" = 'Smith'"#),
            "{sql}"
        );
    }

    #[test]
    fn test_type_only_condition() {
        let criterion = SearchCriterion::parse("Observation").unwrap();
        let sql = Query::select()
            .column((Resources::Table, Resources::ResId))
            .from(Resources::Table)
            .apply_filter(&criterion)
            .to_string(PostgresQueryBuilder);

        assert_eq!(
            sql,
            r#"SELECT "hfj_resource"."res_id" FROM "hfj_resource" WHERE "hfj_resource"."res_type" = 'Observation'"#
        );
    }
}
