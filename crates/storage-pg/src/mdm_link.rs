// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the
//! [`MdmLinkRepository`]

use async_trait::async_trait;
use expunge_data_model::ResourcePid;
use expunge_storage::mdm_link::MdmLinkRepository;
use sea_query::{Condition, Expr, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgConnection;

use crate::{DatabaseError, DatabaseInconsistencyError, iden::MdmLinks, tracing::ExecuteExt};

/// An implementation of [`MdmLinkRepository`] for a PostgreSQL connection
pub struct PgMdmLinkRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgMdmLinkRepository<'c> {
    /// Create a new [`PgMdmLinkRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

/// Links where either end is one of the resources
fn touching(pids: &[ResourcePid]) -> Condition {
    let ids: Vec<i64> = pids.iter().map(|pid| pid.get()).collect();
    Condition::any()
        .add(Expr::col((MdmLinks::Table, MdmLinks::GoldenResourcePid)).is_in(ids.clone()))
        .add(Expr::col((MdmLinks::Table, MdmLinks::TargetPid)).is_in(ids))
}

#[async_trait]
impl MdmLinkRepository for PgMdmLinkRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.mdm_link.delete_for_resources",
        skip_all,
        fields(
            db.query.text,
            resources.count = pids.len(),
        ),
        err,
    )]
    async fn delete_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error> {
        if pids.is_empty() {
            return Ok(0);
        }

        let (sql, arguments) = Query::delete()
            .from_table(MdmLinks::Table)
            .cond_where(touching(pids))
            .build_sqlx(PostgresQueryBuilder);

        let res = sqlx::query_with(&sql, arguments)
            .traced()
            .execute(&mut *self.conn)
            .await?;

        Ok(usize::try_from(res.rows_affected()).unwrap_or(usize::MAX))
    }

    #[tracing::instrument(
        name = "db.mdm_link.count_for_resources",
        skip_all,
        fields(
            db.query.text,
            resources.count = pids.len(),
        ),
        err,
    )]
    async fn count_for_resources(&mut self, pids: &[ResourcePid]) -> Result<usize, Self::Error> {
        if pids.is_empty() {
            return Ok(0);
        }

        let (sql, arguments) = Query::select()
            .expr(Expr::col((MdmLinks::Table, MdmLinks::TargetPid)).count())
            .from(MdmLinks::Table)
            .cond_where(touching(pids))
            .build_sqlx(PostgresQueryBuilder);

        let count: i64 = sqlx::query_scalar_with(&sql, arguments)
            .traced()
            .fetch_one(&mut *self.conn)
            .await?;

        let count = usize::try_from(count)
            .map_err(|e| DatabaseInconsistencyError::on("mpi_link", "count", count).source(e))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_statement() {
        let sql = Query::delete()
            .from_table(MdmLinks::Table)
            .cond_where(touching(&[ResourcePid::new(1), ResourcePid::new(2)]))
            .to_string(PostgresQueryBuilder);

        assert_eq!(
            sql,
            r#"DELETE FROM "mpi_link" WHERE "mpi_link"."golden_resource_pid" IN (1, 2) OR "mpi_link"."target_pid" IN (1, 2)"#
        );
    }
}
