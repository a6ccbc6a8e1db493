// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::{CrawlJob, CrawledPage};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 爬取作业仓库特质
///
/// 作业只会被终结一次：`mark_completed` 或 `mark_failed`
#[async_trait]
pub trait CrawlJobRepository: Send + Sync {
    /// 创建作业
    async fn create(&self, job: &CrawlJob) -> Result<CrawlJob, RepositoryError>;

    /// 标记作业完成，进度置为1
    async fn mark_completed(&self, id: Uuid, page_count: i32) -> Result<(), RepositoryError>;

    /// 标记作业失败并记录错误信息
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), RepositoryError>;

    /// 按审计查找作业，按开始时间排序
    async fn find_by_audit(&self, audit_id: Uuid) -> Result<Vec<CrawlJob>, RepositoryError>;

    /// 记录一个已爬取页面
    async fn create_page(&self, page: &CrawledPage) -> Result<CrawledPage, RepositoryError>;
}
