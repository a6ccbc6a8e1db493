// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::crawl_job::{CrawlJob, CrawlJobStatus, CrawledPage};
use crate::domain::repositories::crawl_job_repository::CrawlJobRepository;
use crate::infrastructure::database::entities::{
    crawl_job as crawl_job_entity, crawled_page as crawled_page_entity,
};
use crate::infrastructure::repositories::parse_column;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{sea_query::Expr, *};
use std::sync::Arc;
use uuid::Uuid;

/// 爬取作业仓库实现
pub struct CrawlJobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl CrawlJobRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn to_domain(m: crawl_job_entity::Model) -> Result<CrawlJob, RepositoryError> {
        Ok(CrawlJob {
            id: m.id,
            audit_id: m.audit_id,
            url: m.url,
            status: parse_column(&m.status, "crawl job status")?,
            started_at: m.started_at.map(Into::into),
            completed_at: m.completed_at.map(Into::into),
            error: m.error,
            page_count: m.page_count,
            progress: m.progress,
        })
    }

    /// 作业只会被终结一次：只更新仍处于 running 的作业
    async fn finish(
        &self,
        id: Uuid,
        status: CrawlJobStatus,
        page_count: Option<i32>,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut update = crawl_job_entity::Entity::update_many()
            .col_expr(crawl_job_entity::Column::Status, Expr::value(status.to_string()))
            .col_expr(
                crawl_job_entity::Column::CompletedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(Utc::now().into())),
            )
            .col_expr(crawl_job_entity::Column::Progress, Expr::value(1.0_f64));
        if let Some(count) = page_count {
            update = update.col_expr(crawl_job_entity::Column::PageCount, Expr::value(count));
        }
        if let Some(message) = error {
            update = update.col_expr(
                crawl_job_entity::Column::Error,
                Expr::value(Some(message.to_string())),
            );
        }

        let result = update
            .filter(crawl_job_entity::Column::Id.eq(id))
            .filter(crawl_job_entity::Column::Status.eq(CrawlJobStatus::Running.to_string()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CrawlJobRepository for CrawlJobRepositoryImpl {
    async fn create(&self, job: &CrawlJob) -> Result<CrawlJob, RepositoryError> {
        let model = crawl_job_entity::ActiveModel {
            id: Set(job.id),
            audit_id: Set(job.audit_id),
            url: Set(job.url.clone()),
            status: Set(job.status.to_string()),
            started_at: Set(job.started_at.map(Into::into)),
            completed_at: Set(job.completed_at.map(Into::into)),
            error: Set(job.error.clone()),
            page_count: Set(job.page_count),
            progress: Set(job.progress),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(job.clone())
    }

    async fn mark_completed(&self, id: Uuid, page_count: i32) -> Result<(), RepositoryError> {
        self.finish(id, CrawlJobStatus::Complete, Some(page_count), None)
            .await
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), RepositoryError> {
        self.finish(id, CrawlJobStatus::Error, None, Some(error)).await
    }

    async fn find_by_audit(&self, audit_id: Uuid) -> Result<Vec<CrawlJob>, RepositoryError> {
        crawl_job_entity::Entity::find()
            .filter(crawl_job_entity::Column::AuditId.eq(audit_id))
            .order_by_asc(crawl_job_entity::Column::StartedAt)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Self::to_domain)
            .collect()
    }

    async fn create_page(&self, page: &CrawledPage) -> Result<CrawledPage, RepositoryError> {
        let model = crawled_page_entity::ActiveModel {
            id: Set(page.id),
            crawl_job_id: Set(page.crawl_job_id),
            audit_id: Set(page.audit_id),
            url: Set(page.url.clone()),
            title: Set(page.title.clone()),
            crawled_at: Set(page.crawled_at.into()),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(page.clone())
    }
}
