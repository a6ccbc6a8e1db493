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

use crate::domain::models::migration_task::{MigrationTask, MigrationTaskStatus};
use crate::domain::repositories::migration_task_repository::MigrationTaskRepository;
use crate::infrastructure::database::entities::migration_task as task_entity;
use crate::infrastructure::repositories::parse_column;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use sea_orm::{sea_query::Expr, *};
use std::sync::Arc;
use uuid::Uuid;

/// 迁移任务仓库实现
pub struct MigrationTaskRepositoryImpl {
    db: Arc<DatabaseConnection>,
    batch_size: usize,
}

impl MigrationTaskRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
        }
    }

    fn to_domain(m: task_entity::Model) -> Result<MigrationTask, RepositoryError> {
        Ok(MigrationTask {
            id: m.id,
            audit_id: m.audit_id,
            title: m.title,
            description: m.description,
            entity_type: parse_column(&m.entity_type, "entity type")?,
            entity_ids: serde_json::from_value(m.entity_ids)?,
            source_product: m.source_product,
            classification: parse_column(&m.classification, "classification")?,
            effort_estimate: parse_column(&m.effort_estimate, "effort estimate")?,
            priority: parse_column(&m.priority, "priority")?,
            phase: m.phase,
            status: parse_column(&m.status, "task status")?,
        })
    }

    fn to_active_model(t: &MigrationTask) -> Result<task_entity::ActiveModel, RepositoryError> {
        Ok(task_entity::ActiveModel {
            id: Set(t.id),
            audit_id: Set(t.audit_id),
            title: Set(t.title.clone()),
            description: Set(t.description.clone()),
            entity_type: Set(t.entity_type.to_string()),
            entity_ids: Set(serde_json::to_value(&t.entity_ids)?),
            source_product: Set(t.source_product.clone()),
            classification: Set(t.classification.to_string()),
            effort_estimate: Set(t.effort_estimate.to_string()),
            priority: Set(t.priority.to_string()),
            phase: Set(t.phase),
            status: Set(t.status.to_string()),
        })
    }
}

#[async_trait]
impl MigrationTaskRepository for MigrationTaskRepositoryImpl {
    async fn replace_for_audit(
        &self,
        audit_id: Uuid,
        tasks: &[MigrationTask],
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        task_entity::Entity::delete_many()
            .filter(task_entity::Column::AuditId.eq(audit_id))
            .exec(&txn)
            .await?;

        for chunk in tasks.chunks(self.batch_size) {
            let models = chunk
                .iter()
                .map(Self::to_active_model)
                .collect::<Result<Vec<_>, _>>()?;
            task_entity::Entity::insert_many(models).exec(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// 按阶段、再按优先级（critical 在前）排序
    async fn find_by_audit(&self, audit_id: Uuid) -> Result<Vec<MigrationTask>, RepositoryError> {
        let mut tasks = task_entity::Entity::find()
            .filter(task_entity::Column::AuditId.eq(audit_id))
            .order_by_asc(task_entity::Column::Phase)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Self::to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        // 优先级以字符串存储，不能在SQL中排序
        tasks.sort_by_key(|t| (t.phase, t.priority));
        Ok(tasks)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: MigrationTaskStatus,
    ) -> Result<(), RepositoryError> {
        let result = task_entity::Entity::update_many()
            .col_expr(task_entity::Column::Status, Expr::value(status.to_string()))
            .filter(task_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
