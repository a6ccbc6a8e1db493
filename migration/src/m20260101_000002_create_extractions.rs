// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::m20260101_000001_create_audits::{Audits, CrawledPages};
use sea_orm_migration::prelude::*;

/// 提取结果表迁移（令牌、组件、模式）
///
/// 每张表都带有自增的 `seq` 主键，用于保留写入顺序；
/// 比较器依赖该顺序决定并列时的“首次出现”。
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExtractedTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExtractedTokens::Seq)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExtractedTokens::Id).uuid().not_null().unique_key())
                    .col(ColumnDef::new(ExtractedTokens::AuditId).uuid().not_null())
                    .col(ColumnDef::new(ExtractedTokens::CrawledPageId).uuid().null())
                    .col(ColumnDef::new(ExtractedTokens::SourceProduct).string().not_null())
                    .col(ColumnDef::new(ExtractedTokens::Layer).string().not_null())
                    .col(ColumnDef::new(ExtractedTokens::Property).string().not_null())
                    .col(ColumnDef::new(ExtractedTokens::ComputedValue).text().not_null())
                    .col(ColumnDef::new(ExtractedTokens::RawValue).text().null())
                    .col(ColumnDef::new(ExtractedTokens::CssVariable).string().null())
                    .col(ColumnDef::new(ExtractedTokens::Selector).string().not_null())
                    .col(
                        ColumnDef::new(ExtractedTokens::Frequency)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ExtractedTokens::Classification)
                            .string()
                            .not_null()
                            .default("unclassified"),
                    )
                    .col(
                        ColumnDef::new(ExtractedTokens::ClassificationConfidence)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ExtractedTokens::ClassificationOverridden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extracted_tokens_audit")
                            .from(ExtractedTokens::Table, ExtractedTokens::AuditId)
                            .to(Audits::Table, Audits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extracted_tokens_page")
                            .from(ExtractedTokens::Table, ExtractedTokens::CrawledPageId)
                            .to(CrawledPages::Table, CrawledPages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tokens_audit_layer_property")
                    .table(ExtractedTokens::Table)
                    .col(ExtractedTokens::AuditId)
                    .col(ExtractedTokens::Layer)
                    .col(ExtractedTokens::Property)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExtractedComponents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExtractedComponents::Seq)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExtractedComponents::Id).uuid().not_null().unique_key())
                    .col(ColumnDef::new(ExtractedComponents::AuditId).uuid().not_null())
                    .col(ColumnDef::new(ExtractedComponents::SourceProduct).string().not_null())
                    .col(ColumnDef::new(ExtractedComponents::Name).string().not_null())
                    .col(ColumnDef::new(ExtractedComponents::Selector).string().not_null())
                    .col(ColumnDef::new(ExtractedComponents::Variants).json().not_null())
                    .col(ColumnDef::new(ExtractedComponents::States).json().not_null())
                    .col(ColumnDef::new(ExtractedComponents::HtmlSnapshot).text().null())
                    .col(
                        ColumnDef::new(ExtractedComponents::Frequency)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ExtractedComponents::Classification)
                            .string()
                            .not_null()
                            .default("unclassified"),
                    )
                    .col(
                        ColumnDef::new(ExtractedComponents::ClassificationConfidence)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ExtractedComponents::ClassificationOverridden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extracted_components_audit")
                            .from(ExtractedComponents::Table, ExtractedComponents::AuditId)
                            .to(Audits::Table, Audits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExtractedPatterns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExtractedPatterns::Seq)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExtractedPatterns::Id).uuid().not_null().unique_key())
                    .col(ColumnDef::new(ExtractedPatterns::AuditId).uuid().not_null())
                    .col(ColumnDef::new(ExtractedPatterns::SourceProduct).string().not_null())
                    .col(ColumnDef::new(ExtractedPatterns::Category).string().not_null())
                    .col(ColumnDef::new(ExtractedPatterns::Name).string().not_null())
                    .col(ColumnDef::new(ExtractedPatterns::ComponentSelectors).json().not_null())
                    .col(
                        ColumnDef::new(ExtractedPatterns::Frequency)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ExtractedPatterns::Classification)
                            .string()
                            .not_null()
                            .default("unclassified"),
                    )
                    .col(
                        ColumnDef::new(ExtractedPatterns::ClassificationConfidence)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ExtractedPatterns::ClassificationOverridden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extracted_patterns_audit")
                            .from(ExtractedPatterns::Table, ExtractedPatterns::AuditId)
                            .to(Audits::Table, Audits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExtractedPatterns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExtractedComponents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExtractedTokens::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ExtractedTokens {
    Table,
    Seq,
    Id,
    AuditId,
    CrawledPageId,
    SourceProduct,
    Layer,
    Property,
    ComputedValue,
    RawValue,
    CssVariable,
    Selector,
    Frequency,
    Classification,
    ClassificationConfidence,
    ClassificationOverridden,
}

#[derive(DeriveIden)]
enum ExtractedComponents {
    Table,
    Seq,
    Id,
    AuditId,
    SourceProduct,
    Name,
    Selector,
    Variants,
    States,
    HtmlSnapshot,
    Frequency,
    Classification,
    ClassificationConfidence,
    ClassificationOverridden,
}

#[derive(DeriveIden)]
enum ExtractedPatterns {
    Table,
    Seq,
    Id,
    AuditId,
    SourceProduct,
    Category,
    Name,
    ComponentSelectors,
    Frequency,
    Classification,
    ClassificationConfidence,
    ClassificationOverridden,
}
