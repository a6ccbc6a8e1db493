// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 仓库接口定义了数据持久化的抽象契约，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 审计仓库（audit_repository）
/// - 爬取作业仓库（crawl_job_repository）：作业与已爬取页面
/// - 提取结果仓库（extraction_repository）：令牌、组件、模式及其分类
/// - 比较结果仓库（comparison_repository）
/// - 迁移任务仓库（migration_task_repository）
pub mod audit_repository;
pub mod comparison_repository;
pub mod crawl_job_repository;
pub mod extraction_repository;
pub mod migration_task_repository;

use std::sync::Arc;

/// 流水线使用的全部仓库
#[derive(Clone)]
pub struct RepositorySet {
    pub audits: Arc<dyn audit_repository::AuditRepository>,
    pub crawl_jobs: Arc<dyn crawl_job_repository::CrawlJobRepository>,
    pub extractions: Arc<dyn extraction_repository::ExtractionRepository>,
    pub comparisons: Arc<dyn comparison_repository::ComparisonRepository>,
    pub tasks: Arc<dyn migration_task_repository::MigrationTaskRepository>,
}
