// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的SeaORM实现
pub mod audit_repo_impl;
pub mod comparison_repo_impl;
pub mod crawl_job_repo_impl;
pub mod extraction_repo_impl;
pub mod migration_task_repo_impl;

use crate::domain::repositories::RepositorySet;
use crate::utils::errors::RepositoryError;
use sea_orm::DatabaseConnection;
use std::str::FromStr;
use std::sync::Arc;

/// 解析以字符串存储的枚举列
pub(crate) fn parse_column<T: FromStr>(value: &str, column: &str) -> Result<T, RepositoryError> {
    value
        .parse::<T>()
        .map_err(|_| RepositoryError::InvalidData(format!("invalid {}: {}", column, value)))
}

/// 基于同一个连接构建全部仓库
pub fn build_repository_set(
    db: Arc<DatabaseConnection>,
    insert_batch_size: usize,
) -> RepositorySet {
    RepositorySet {
        audits: Arc::new(audit_repo_impl::AuditRepositoryImpl::new(Arc::clone(&db))),
        crawl_jobs: Arc::new(crawl_job_repo_impl::CrawlJobRepositoryImpl::new(Arc::clone(&db))),
        extractions: Arc::new(extraction_repo_impl::ExtractionRepositoryImpl::new(
            Arc::clone(&db),
            insert_batch_size,
        )),
        comparisons: Arc::new(comparison_repo_impl::ComparisonRepositoryImpl::new(
            Arc::clone(&db),
            insert_batch_size,
        )),
        tasks: Arc::new(migration_task_repo_impl::MigrationTaskRepositoryImpl::new(
            db,
            insert_batch_size,
        )),
    }
}
