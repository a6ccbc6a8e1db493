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

use crate::{
    application::dto::audit_request::{
        CreateAuditRequest, OverrideClassificationRequest, UpdateAuditRequest,
    },
    config::settings::Settings,
    domain::{
        models::{
            audit::{Audit, AuditStatus},
            comparison::MatrixRow,
            crawl_job::CrawlJob,
            migration_task::{MigrationTask, MigrationTaskStatus},
            progress::ProgressEvent,
            token::TokenSummary,
        },
        repositories::RepositorySet,
        services::{
            classifier::ClassifierService, comparator::ComparatorService,
            roadmap::RoadmapService,
        },
    },
    engines::traits::BrowserProvider,
    utils::errors::{PipelineError, PreconditionError},
    workers::{
        progress::ProgressSubscription, registry::RunRegistry, CrawlOrchestrator,
    },
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// 审计流水线控制面
///
/// 审计管理、运行的启动与停止、进度订阅、人工覆盖分类以及路线图和各读模型。
/// 多个审计的运行互相独立，由进程级注册表保证同一审计只有一个运行。
pub struct AuditPipeline {
    repos: RepositorySet,
    registry: Arc<RunRegistry>,
    orchestrator: Arc<CrawlOrchestrator>,
    comparator: Arc<ComparatorService>,
    classifier: Arc<ClassifierService>,
    roadmap: RoadmapService,
    progress_capacity: usize,
}

impl AuditPipeline {
    pub fn new(
        repos: RepositorySet,
        browser: Arc<dyn BrowserProvider>,
        settings: &Settings,
    ) -> Self {
        let comparator = Arc::new(ComparatorService::new(repos.clone()));
        let classifier = Arc::new(ClassifierService::new(
            Arc::clone(&repos.comparisons),
            Arc::clone(&repos.extractions),
            settings.classification.clone(),
        ));
        let orchestrator = Arc::new(CrawlOrchestrator::new(
            repos.clone(),
            browser,
            Arc::clone(&comparator),
            Arc::clone(&classifier),
            &settings.crawl,
            Duration::from_secs(settings.browser.navigation_timeout_secs),
        ));
        let roadmap = RoadmapService::new(
            Arc::clone(&repos.comparisons),
            Arc::clone(&repos.extractions),
            Arc::clone(&repos.tasks),
        );

        Self {
            repos,
            registry: Arc::new(RunRegistry::new()),
            orchestrator,
            comparator,
            classifier,
            roadmap,
            progress_capacity: settings.crawl.progress_capacity,
        }
    }

    pub async fn create_audit(&self, dto: CreateAuditRequest) -> Result<Audit, PipelineError> {
        dto.validate()
            .map_err(|e| PipelineError::Validation(e.to_string()))?;

        let audit = Audit::new(
            dto.name.trim().to_string(),
            dto.product_urls.iter().map(|u| u.trim().to_string()).collect(),
            dto.parent_system_url.map(|u| u.trim().to_string()),
            dto.config.unwrap_or_default(),
        );
        let created = self.repos.audits.create(&audit).await?;
        info!(audit_id = %created.id, products = created.product_urls.len(), "Audit created");
        Ok(created)
    }

    /// 编辑审计并重置为 draft；运行中的审计不可编辑
    pub async fn update_audit(
        &self,
        audit_id: Uuid,
        dto: UpdateAuditRequest,
    ) -> Result<Audit, PipelineError> {
        dto.validate()
            .map_err(|e| PipelineError::Validation(e.to_string()))?;
        if self.registry.is_running(audit_id) {
            return Err(PreconditionError::AlreadyRunning.into());
        }

        let mut audit = self.get_audit(audit_id).await?;
        if dto.is_empty() {
            return Ok(audit);
        }
        if let Some(name) = dto.name {
            audit.name = name.trim().to_string();
        }
        if let Some(urls) = dto.product_urls {
            audit.product_urls = urls.iter().map(|u| u.trim().to_string()).collect();
        }
        if let Some(parent) = dto.parent_system_url {
            let parent = parent.trim();
            audit.parent_system_url = (!parent.is_empty()).then(|| parent.to_string());
        }
        if let Some(config) = dto.config {
            audit.config = config;
        }
        audit.status = AuditStatus::Draft;
        audit.updated_at = Utc::now();

        Ok(self.repos.audits.update(&audit).await?)
    }

    pub async fn get_audit(&self, audit_id: Uuid) -> Result<Audit, PipelineError> {
        self.repos
            .audits
            .find_by_id(audit_id)
            .await?
            .ok_or_else(|| PreconditionError::AuditNotFound(audit_id).into())
    }

    pub async fn list_audits(&self) -> Result<Vec<Audit>, PipelineError> {
        Ok(self.repos.audits.list().await?)
    }

    pub async fn delete_audit(&self, audit_id: Uuid) -> Result<(), PipelineError> {
        if self.registry.is_running(audit_id) {
            return Err(PreconditionError::AlreadyRunning.into());
        }
        Ok(self.repos.audits.delete(audit_id).await?)
    }

    /// 启动一次运行；前置条件不满足时不做任何状态变更
    #[instrument(skip(self))]
    pub async fn start(&self, audit_id: Uuid) -> Result<(), PipelineError> {
        let audit = self.get_audit(audit_id).await?;
        if !audit.status.is_startable() {
            return Err(PreconditionError::InvalidStatus(audit.status).into());
        }
        if audit.product_urls.is_empty() {
            return Err(PreconditionError::NoProductUrls.into());
        }

        let handle = self
            .registry
            .try_register(audit_id, self.progress_capacity)?;

        let orchestrator = Arc::clone(&self.orchestrator);
        let registry = Arc::clone(&self.registry);
        let run_handle = Arc::clone(&handle);
        let task = tokio::spawn(async move {
            orchestrator.run(audit, Arc::clone(&run_handle)).await;
            registry.remove(&run_handle);
        });
        handle.attach_task(task);

        info!("Audit run started");
        Ok(())
    }

    /// 停止运行中的审计，等待其发出终止事件后返回
    #[instrument(skip(self))]
    pub async fn stop(&self, audit_id: Uuid) -> Result<(), PipelineError> {
        let handle = self
            .registry
            .get(audit_id)
            .ok_or(PreconditionError::NotRunning)?;

        handle.request_stop();
        if let Some(task) = handle.take_task() {
            if let Err(e) = task.await {
                warn!(error = %e, "Audit run task ended abnormally");
                self.registry.remove(&handle);
            }
        }
        Ok(())
    }

    pub fn is_running(&self, audit_id: Uuid) -> bool {
        self.registry.is_running(audit_id)
    }

    /// 订阅进度
    ///
    /// 运行中：只收到订阅之后的事件，直到终止事件；否则：一个状态快照
    pub async fn subscribe(&self, audit_id: Uuid) -> Result<ProgressSubscription, PipelineError> {
        if let Some(handle) = self.registry.get(audit_id) {
            let receiver = handle.progress.subscribe();
            if !handle.progress.is_closed() {
                return Ok(ProgressSubscription::live(receiver));
            }
        }

        let audit = self.get_audit(audit_id).await?;
        Ok(ProgressSubscription::snapshot(ProgressEvent::snapshot(
            audit_id,
            audit.status,
        )))
    }

    pub async fn override_classification(
        &self,
        dto: OverrideClassificationRequest,
    ) -> Result<u64, PipelineError> {
        dto.validate()
            .map_err(|e| PipelineError::Validation(e.to_string()))?;
        Ok(self
            .classifier
            .override_classification(&dto.token_ids, dto.classification)
            .await?)
    }

    pub async fn generate_roadmap(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<MigrationTask>, PipelineError> {
        self.get_audit(audit_id).await?;
        Ok(self.roadmap.generate(audit_id).await?)
    }

    pub async fn get_roadmap(&self, audit_id: Uuid) -> Result<Vec<MigrationTask>, PipelineError> {
        Ok(self.roadmap.get_roadmap(audit_id).await?)
    }

    pub async fn update_task_status(
        &self,
        task_id: Uuid,
        status: MigrationTaskStatus,
    ) -> Result<(), PipelineError> {
        Ok(self.roadmap.update_task_status(task_id, status).await?)
    }

    pub async fn comparison_matrix(&self, audit_id: Uuid) -> Result<Vec<MatrixRow>, PipelineError> {
        Ok(self.comparator.comparison_matrix(audit_id).await?)
    }

    pub async fn token_summary(&self, audit_id: Uuid) -> Result<TokenSummary, PipelineError> {
        let tokens = self.repos.extractions.find_tokens_by_audit(audit_id).await?;
        Ok(TokenSummary::from_tokens(&tokens))
    }

    pub async fn crawl_jobs(&self, audit_id: Uuid) -> Result<Vec<CrawlJob>, PipelineError> {
        Ok(self.repos.crawl_jobs.find_by_audit(audit_id).await?)
    }
}
