// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Keyset pagination over the reverse-chronological resource ordering

use expunge_storage::Pagination;
use sea_query::{Condition, Expr, IntoColumnRef, Order};

/// An extension trait to the [`sea_query::SelectStatement`], to add keyset
/// pagination to a query
pub trait QueryBuilderExt {
    /// Order the rows newest first, and only select the ones after the
    /// pagination cursor
    ///
    /// One more row than requested is fetched, so that
    /// [`Pagination::process`] can tell whether there is a next page.
    fn generate_pagination<C: IntoColumnRef, I: IntoColumnRef>(
        &mut self,
        created_at: C,
        id: I,
        pagination: Pagination,
    ) -> &mut Self;
}

impl QueryBuilderExt for sea_query::SelectStatement {
    fn generate_pagination<C: IntoColumnRef, I: IntoColumnRef>(
        &mut self,
        created_at: C,
        id: I,
        pagination: Pagination,
    ) -> &mut Self {
        let created_at = created_at.into_column_ref();
        let id = id.into_column_ref();

        // (created_at, id) < (cursor.created_at, cursor.pid)
        if let Some(before) = pagination.before {
            self.cond_where(
                Condition::any()
                    .add(Expr::col(created_at.clone()).lt(before.created_at))
                    .add(
                        Expr::col(created_at.clone())
                            .eq(before.created_at)
                            .and(Expr::col(id.clone()).lt(before.pid.get())),
                    ),
            );
        }

        self.order_by(created_at, Order::Desc)
            .order_by(id, Order::Desc)
            .limit((pagination.count + 1) as u64);

        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use expunge_data_model::ResourcePid;
    use expunge_storage::PageCursor;
    use sea_query::{PostgresQueryBuilder, Query};

    use super::*;
    use crate::iden::Resources;

    #[test]
    fn test_first_page() {
        let sql = Query::select()
            .column(Resources::ResId)
            .from(Resources::Table)
            .generate_pagination(Resources::ResPublished, Resources::ResId, Pagination::first(10))
            .to_string(PostgresQueryBuilder);

        assert_eq!(
            sql,
            r#"SELECT "res_id" FROM "hfj_resource" ORDER BY "res_published" DESC, "res_id" DESC LIMIT 11"#
        );
    }

    #[test]
    fn test_next_page() {
        let cursor = PageCursor {
            created_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            pid: ResourcePid::new(42),
        };

        let sql = Query::select()
            .column(Resources::ResId)
            .from(Resources::Table)
            .generate_pagination(
                Resources::ResPublished,
                Resources::ResId,
                Pagination::first(2).before(cursor),
            )
            .to_string(PostgresQueryBuilder);

        assert!(sql.contains(r#""res_id" < 42"#), "{sql}");
        assert!(sql.ends_with("LIMIT 3"), "{sql}");
    }
}
