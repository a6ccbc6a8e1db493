// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 审计与爬取作业表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    /// 应用数据库迁移
    ///
    /// # 参数
    ///
    /// * `manager` - 数据库模式管理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 迁移成功
    /// * `Err(DbErr)` - 迁移失败
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Create audits table (No dependencies)
        manager
            .create_table(
                Table::create()
                    .table(Audits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Audits::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Audits::Name).string().not_null())
                    .col(ColumnDef::new(Audits::ParentSystemUrl).string().null())
                    .col(ColumnDef::new(Audits::ProductUrls).json().not_null())
                    .col(
                        ColumnDef::new(Audits::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Audits::Config).json().not_null())
                    .col(
                        ColumnDef::new(Audits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Audits::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 2. Create crawl_jobs table (Depends on Audits)
        manager
            .create_table(
                Table::create()
                    .table(CrawlJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CrawlJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CrawlJobs::AuditId).uuid().not_null())
                    .col(ColumnDef::new(CrawlJobs::Url).string().not_null())
                    .col(
                        ColumnDef::new(CrawlJobs::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(CrawlJobs::StartedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(CrawlJobs::CompletedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(CrawlJobs::Error).text().null())
                    .col(
                        ColumnDef::new(CrawlJobs::PageCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlJobs::Progress)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crawl_jobs_audit")
                            .from(CrawlJobs::Table, CrawlJobs::AuditId)
                            .to(Audits::Table, Audits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_jobs_audit")
                    .table(CrawlJobs::Table)
                    .col(CrawlJobs::AuditId)
                    .to_owned(),
            )
            .await?;

        // 3. Create crawled_pages table (Depends on CrawlJobs and Audits)
        manager
            .create_table(
                Table::create()
                    .table(CrawledPages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CrawledPages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CrawledPages::CrawlJobId).uuid().not_null())
                    .col(ColumnDef::new(CrawledPages::AuditId).uuid().not_null())
                    .col(ColumnDef::new(CrawledPages::Url).string().not_null())
                    .col(ColumnDef::new(CrawledPages::Title).string().not_null())
                    .col(
                        ColumnDef::new(CrawledPages::CrawledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crawled_pages_job")
                            .from(CrawledPages::Table, CrawledPages::CrawlJobId)
                            .to(CrawlJobs::Table, CrawlJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crawled_pages_audit")
                            .from(CrawledPages::Table, CrawledPages::AuditId)
                            .to(Audits::Table, Audits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    /// 回滚数据库迁移
    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawledPages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CrawlJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Audits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Audits {
    Table,
    Id,
    Name,
    ParentSystemUrl,
    ProductUrls,
    Status,
    Config,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CrawlJobs {
    Table,
    Id,
    AuditId,
    Url,
    Status,
    StartedAt,
    CompletedAt,
    Error,
    PageCount,
    Progress,
}

#[derive(DeriveIden)]
pub(crate) enum CrawledPages {
    Table,
    Id,
    CrawlJobId,
    AuditId,
    Url,
    Title,
    CrawledAt,
}
