// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::m20260101_000001_create_audits::Audits;
use sea_orm_migration::prelude::*;

/// 比较结果与迁移任务表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ComparisonResults::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ComparisonResults::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ComparisonResults::AuditId).uuid().not_null())
                    .col(ColumnDef::new(ComparisonResults::EntityType).string().not_null())
                    .col(ColumnDef::new(ComparisonResults::EntityProperty).string().not_null())
                    .col(ColumnDef::new(ComparisonResults::CanonicalValue).text().not_null())
                    .col(ColumnDef::new(ComparisonResults::ProductValues).json().not_null())
                    .col(
                        ColumnDef::new(ComparisonResults::DivergenceScore)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ComparisonResults::Classification)
                            .string()
                            .not_null()
                            .default("unclassified"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comparison_results_audit")
                            .from(ComparisonResults::Table, ComparisonResults::AuditId)
                            .to(Audits::Table, Audits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comparison_results_audit")
                    .table(ComparisonResults::Table)
                    .col(ComparisonResults::AuditId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MigrationTasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MigrationTasks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(MigrationTasks::AuditId).uuid().not_null())
                    .col(ColumnDef::new(MigrationTasks::Title).string().not_null())
                    .col(ColumnDef::new(MigrationTasks::Description).text().not_null())
                    .col(ColumnDef::new(MigrationTasks::EntityType).string().not_null())
                    .col(ColumnDef::new(MigrationTasks::EntityIds).json().not_null())
                    .col(ColumnDef::new(MigrationTasks::SourceProduct).string().not_null())
                    .col(ColumnDef::new(MigrationTasks::Classification).string().not_null())
                    .col(ColumnDef::new(MigrationTasks::EffortEstimate).string().not_null())
                    .col(ColumnDef::new(MigrationTasks::Priority).string().not_null())
                    .col(ColumnDef::new(MigrationTasks::Phase).integer().not_null())
                    .col(
                        ColumnDef::new(MigrationTasks::Status)
                            .string()
                            .not_null()
                            .default("todo"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_migration_tasks_audit")
                            .from(MigrationTasks::Table, MigrationTasks::AuditId)
                            .to(Audits::Table, Audits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_migration_tasks_audit_phase")
                    .table(MigrationTasks::Table)
                    .col(MigrationTasks::AuditId)
                    .col(MigrationTasks::Phase)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MigrationTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ComparisonResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ComparisonResults {
    Table,
    Id,
    AuditId,
    EntityType,
    EntityProperty,
    CanonicalValue,
    ProductValues,
    DivergenceScore,
    Classification,
}

#[derive(DeriveIden)]
enum MigrationTasks {
    Table,
    Id,
    AuditId,
    Title,
    Description,
    EntityType,
    EntityIds,
    SourceProduct,
    Classification,
    EffortEstimate,
    Priority,
    Phase,
    Status,
}
