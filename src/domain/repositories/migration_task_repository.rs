// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::migration_task::{MigrationTask, MigrationTaskStatus};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 迁移任务仓库特质
#[async_trait]
pub trait MigrationTaskRepository: Send + Sync {
    /// 在一个事务中删除该审计的全部任务并写入新任务
    async fn replace_for_audit(
        &self,
        audit_id: Uuid,
        tasks: &[MigrationTask],
    ) -> Result<(), RepositoryError>;

    /// 按阶段、优先级排序返回
    async fn find_by_audit(&self, audit_id: Uuid) -> Result<Vec<MigrationTask>, RepositoryError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: MigrationTaskStatus,
    ) -> Result<(), RepositoryError>;
}
