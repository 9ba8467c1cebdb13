// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the
//! [`ExpungeRepository`]

use async_trait::async_trait;
use expunge_data_model::{
    DeleteStatement, DeleteTarget, DependentCount, DependentTable, InboundReference, ResourcePid,
};
use expunge_storage::expunge::ExpungeRepository;
use sea_query::{DynIden, Expr, IntoIden, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgConnection;

use crate::{
    DatabaseError, DatabaseInconsistencyError,
    iden::{
        DateIndex, HistoryTags, ResourceLinks, ResourceTags, ResourceVersions, Resources,
        StringIndex, TokenIndex,
    },
    tracing::ExecuteExt,
};

/// An implementation of [`ExpungeRepository`] for a PostgreSQL connection
pub struct PgExpungeRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgExpungeRepository<'c> {
    /// Create a new [`PgExpungeRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

mod priv_ {
    // The enum_def macro generates a public enum, which we don't want, because it
    // triggers the missing docs warning
    #![allow(missing_docs)]

    use sea_query::enum_def;

    #[derive(Debug, Clone, sqlx::FromRow)]
    #[enum_def]
    pub(super) struct DependentCountLookup {
        pub(super) res_id: i64,
        pub(super) count: i64,
    }

    #[derive(Debug, Clone, sqlx::FromRow)]
    #[enum_def]
    pub(super) struct InboundReferenceLookup {
        pub(super) src_resource_id: i64,
        pub(super) target_resource_id: i64,
        pub(super) src_path: String,
    }
}

use priv_::{
    DependentCountLookup, DependentCountLookupIden, InboundReferenceLookup,
    InboundReferenceLookupIden,
};

/// The table a dependent lives in, and the column pointing at its resource
fn dependent_columns(table: DependentTable) -> (DynIden, DynIden) {
    match table {
        DependentTable::StringIndex => (StringIndex::Table.into_iden(), StringIndex::ResId.into_iden()),
        DependentTable::TokenIndex => (TokenIndex::Table.into_iden(), TokenIndex::ResId.into_iden()),
        DependentTable::DateIndex => (DateIndex::Table.into_iden(), DateIndex::ResId.into_iden()),
        DependentTable::OutgoingReferences => (
            ResourceLinks::Table.into_iden(),
            ResourceLinks::SrcResourceId.into_iden(),
        ),
        DependentTable::HistoryTags => (HistoryTags::Table.into_iden(), HistoryTags::ResId.into_iden()),
        DependentTable::Tags => (ResourceTags::Table.into_iden(), ResourceTags::ResId.into_iden()),
        DependentTable::Versions => (
            ResourceVersions::Table.into_iden(),
            ResourceVersions::ResId.into_iden(),
        ),
    }
}

/// Build the SQL statement deleting the rows a [`DeleteStatement`] targets
fn delete_statement(statement: &DeleteStatement) -> sea_query::DeleteStatement {
    let (table, column) = match statement.target {
        DeleteTarget::Dependent(table) => dependent_columns(table),
        DeleteTarget::IncomingReferences => (
            ResourceLinks::Table.into_iden(),
            ResourceLinks::TargetResourceId.into_iden(),
        ),
        DeleteTarget::Resource => (Resources::Table.into_iden(), Resources::ResId.into_iden()),
    };

    Query::delete()
        .from_table(table)
        .and_where(Expr::col(column).eq(statement.pid.get()))
        .to_owned()
}

fn to_count(row: i64, count: i64, table: DependentTable) -> Result<usize, DatabaseError> {
    let count = usize::try_from(count)
        .map_err(|e| DatabaseInconsistencyError::on(table.as_str(), "count", row).source(e))?;
    Ok(count)
}

#[async_trait]
impl ExpungeRepository for PgExpungeRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.expunge.dependent_counts",
        skip_all,
        fields(
            db.query.text,
            resources.count = pids.len(),
        ),
        err,
    )]
    async fn dependent_counts(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<DependentCount>, Self::Error> {
        if pids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = pids.iter().map(|pid| pid.get()).collect();
        let mut counts = Vec::new();

        for table in DependentTable::ALL {
            let (table_iden, column) = dependent_columns(table);
            let (sql, arguments) = Query::select()
                .expr_as(
                    Expr::col((table_iden.clone(), column.clone())),
                    DependentCountLookupIden::ResId,
                )
                .expr_as(
                    Expr::col((table_iden.clone(), column.clone())).count(),
                    DependentCountLookupIden::Count,
                )
                .from(table_iden.clone())
                .and_where(Expr::col((table_iden.clone(), column.clone())).is_in(ids.clone()))
                .group_by_col((table_iden, column))
                .build_sqlx(PostgresQueryBuilder);

            let rows: Vec<DependentCountLookup> = sqlx::query_as_with(&sql, arguments)
                .traced()
                .fetch_all(&mut *self.conn)
                .await?;

            for row in rows {
                counts.push(DependentCount {
                    pid: row.res_id.into(),
                    table,
                    count: to_count(row.res_id, row.count, table)?,
                });
            }
        }

        // Stable, so tables stay in deletion order for each resource
        counts.sort_by_key(|count| count.pid);
        Ok(counts)
    }

    #[tracing::instrument(
        name = "db.expunge.inbound_references",
        skip_all,
        fields(
            db.query.text,
            resources.count = pids.len(),
        ),
        err,
    )]
    async fn inbound_references(
        &mut self,
        pids: &[ResourcePid],
    ) -> Result<Vec<InboundReference>, Self::Error> {
        if pids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = pids.iter().map(|pid| pid.get()).collect();
        let (sql, arguments) = Query::select()
            .expr_as(
                Expr::col((ResourceLinks::Table, ResourceLinks::SrcResourceId)),
                InboundReferenceLookupIden::SrcResourceId,
            )
            .expr_as(
                Expr::col((ResourceLinks::Table, ResourceLinks::TargetResourceId)),
                InboundReferenceLookupIden::TargetResourceId,
            )
            .expr_as(
                Expr::col((ResourceLinks::Table, ResourceLinks::SrcPath)),
                InboundReferenceLookupIden::SrcPath,
            )
            .from(ResourceLinks::Table)
            .and_where(
                Expr::col((ResourceLinks::Table, ResourceLinks::TargetResourceId))
                    .is_in(ids.clone()),
            )
            .and_where(
                Expr::col((ResourceLinks::Table, ResourceLinks::SrcResourceId)).is_not_in(ids),
            )
            .order_by(
                (ResourceLinks::Table, ResourceLinks::TargetResourceId),
                Order::Asc,
            )
            .order_by((ResourceLinks::Table, ResourceLinks::SrcResourceId), Order::Asc)
            .build_sqlx(PostgresQueryBuilder);

        let rows: Vec<InboundReferenceLookup> = sqlx::query_as_with(&sql, arguments)
            .traced()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| InboundReference {
                source: row.src_resource_id.into(),
                target: row.target_resource_id.into(),
                source_path: row.src_path,
            })
            .collect())
    }

    #[tracing::instrument(
        name = "db.expunge.execute",
        skip_all,
        fields(
            db.query.text,
            %statement,
        ),
        err,
    )]
    async fn execute(&mut self, statement: DeleteStatement) -> Result<usize, Self::Error> {
        let (sql, arguments) = delete_statement(&statement).build_sqlx(PostgresQueryBuilder);

        let res = sqlx::query_with(&sql, arguments)
            .traced()
            .execute(&mut *self.conn)
            .await?;

        Ok(usize::try_from(res.rows_affected()).unwrap_or(usize::MAX))
    }
}
