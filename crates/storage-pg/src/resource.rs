// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the
//! [`ResourceSearchRepository`]

use async_trait::async_trait;
use expunge_data_model::{ResourceRow, ResourceType, SearchCriterion};
use expunge_storage::{Page, Pagination, resource::ResourceSearchRepository};
use sea_query::{Expr, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgConnection;

use crate::{
    DatabaseError, DatabaseInconsistencyError,
    filter::StatementExt,
    iden::Resources,
    pagination::QueryBuilderExt,
    tracing::ExecuteExt,
};

/// An implementation of [`ResourceSearchRepository`] for a PostgreSQL
/// connection
pub struct PgResourceSearchRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgResourceSearchRepository<'c> {
    /// Create a new [`PgResourceSearchRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

mod priv_ {
    // The enum_def macro generates a public enum, which we don't want, because it
    // triggers the missing docs warning
    #![allow(missing_docs)]

    use chrono::{DateTime, Utc};
    use sea_query::enum_def;

    #[derive(Debug, Clone, sqlx::FromRow)]
    #[enum_def]
    pub(super) struct ResourceLookup {
        pub(super) res_id: i64,
        pub(super) res_type: String,
        pub(super) res_published: DateTime<Utc>,
    }
}

use priv_::{ResourceLookup, ResourceLookupIden};

impl TryFrom<ResourceLookup> for ResourceRow {
    type Error = DatabaseInconsistencyError;

    fn try_from(value: ResourceLookup) -> Result<Self, Self::Error> {
        let resource_type = ResourceType::new(value.res_type).map_err(|e| {
            DatabaseInconsistencyError::on("hfj_resource", "res_type", value.res_id).source(e)
        })?;

        Ok(ResourceRow {
            pid: value.res_id.into(),
            resource_type,
            created_at: value.res_published,
        })
    }
}

#[async_trait]
impl ResourceSearchRepository for PgResourceSearchRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.resource_search.search",
        skip_all,
        fields(
            db.query.text,
            %criterion,
        ),
        err,
    )]
    async fn search(
        &mut self,
        criterion: &SearchCriterion,
        pagination: Pagination,
    ) -> Result<Page, Self::Error> {
        let (sql, arguments) = Query::select()
            .expr_as(
                Expr::col((Resources::Table, Resources::ResId)),
                ResourceLookupIden::ResId,
            )
            .expr_as(
                Expr::col((Resources::Table, Resources::ResType)),
                ResourceLookupIden::ResType,
            )
            .expr_as(
                Expr::col((Resources::Table, Resources::ResPublished)),
                ResourceLookupIden::ResPublished,
            )
            .from(Resources::Table)
            .apply_filter(criterion)
            .generate_pagination(
                (Resources::Table, Resources::ResPublished),
                (Resources::Table, Resources::ResId),
                pagination,
            )
            .build_sqlx(PostgresQueryBuilder);

        let edges: Vec<ResourceLookup> = sqlx::query_as_with(&sql, arguments)
            .traced()
            .fetch_all(&mut *self.conn)
            .await?;

        let rows = edges
            .into_iter()
            .map(ResourceRow::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pagination.process(rows))
    }
}
