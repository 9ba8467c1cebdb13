// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Table and column identifiers used by [`sea_query`]

#[derive(sea_query::Iden)]
#[iden = "hfj_resource"]
pub enum Resources {
    Table,
    ResId,
    ResType,
    ResPublished,
}

#[derive(sea_query::Iden)]
#[iden = "hfj_res_ver"]
pub enum ResourceVersions {
    Table,
    ResId,
}

#[derive(sea_query::Iden)]
#[iden = "hfj_history_tag"]
pub enum HistoryTags {
    Table,
    ResId,
}

#[derive(sea_query::Iden)]
#[iden = "hfj_res_tag"]
pub enum ResourceTags {
    Table,
    ResId,
}

#[derive(sea_query::Iden)]
#[iden = "hfj_res_link"]
pub enum ResourceLinks {
    Table,
    SrcResourceId,
    TargetResourceId,
    SrcPath,
}

#[derive(sea_query::Iden)]
#[iden = "hfj_spidx_string"]
pub enum StringIndex {
    Table,
    ResId,
    SpName,
    SpValue,
}

#[derive(sea_query::Iden)]
#[iden = "hfj_spidx_token"]
pub enum TokenIndex {
    Table,
    ResId,
}

#[derive(sea_query::Iden)]
#[iden = "hfj_spidx_date"]
pub enum DateIndex {
    Table,
    ResId,
}

#[derive(sea_query::Iden)]
#[iden = "mpi_link"]
pub enum MdmLinks {
    Table,
    GoldenResourcePid,
    TargetPid,
}
