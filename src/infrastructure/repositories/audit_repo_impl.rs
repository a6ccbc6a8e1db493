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

use crate::domain::models::audit::{Audit, AuditStatus};
use crate::domain::repositories::audit_repository::AuditRepository;
use crate::infrastructure::database::entities::audit as audit_entity;
use crate::infrastructure::repositories::parse_column;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{sea_query::Expr, *};
use std::sync::Arc;
use uuid::Uuid;

/// 审计仓库实现
pub struct AuditRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl AuditRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn to_domain(m: audit_entity::Model) -> Result<Audit, RepositoryError> {
        Ok(Audit {
            id: m.id,
            name: m.name,
            parent_system_url: m.parent_system_url,
            product_urls: serde_json::from_value(m.product_urls)?,
            status: parse_column(&m.status, "audit status")?,
            config: serde_json::from_value(m.config)?,
            created_at: m.created_at.into(),
            updated_at: m.updated_at.into(),
        })
    }
}

#[async_trait]
impl AuditRepository for AuditRepositoryImpl {
    async fn create(&self, audit: &Audit) -> Result<Audit, RepositoryError> {
        let model = audit_entity::ActiveModel {
            id: Set(audit.id),
            name: Set(audit.name.clone()),
            parent_system_url: Set(audit.parent_system_url.clone()),
            product_urls: Set(serde_json::to_value(&audit.product_urls)?),
            status: Set(audit.status.to_string()),
            config: Set(serde_json::to_value(&audit.config)?),
            created_at: Set(audit.created_at.into()),
            updated_at: Set(audit.updated_at.into()),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(audit.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Audit>, RepositoryError> {
        audit_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Self::to_domain)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<Audit>, RepositoryError> {
        audit_entity::Entity::find()
            .order_by_desc(audit_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Self::to_domain)
            .collect()
    }

    async fn update(&self, audit: &Audit) -> Result<Audit, RepositoryError> {
        let mut model: audit_entity::ActiveModel = audit_entity::Entity::find_by_id(audit.id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        model.name = Set(audit.name.clone());
        model.parent_system_url = Set(audit.parent_system_url.clone());
        model.product_urls = Set(serde_json::to_value(&audit.product_urls)?);
        model.status = Set(audit.status.to_string());
        model.config = Set(serde_json::to_value(&audit.config)?);
        model.updated_at = Set(audit.updated_at.into());

        let updated = model.update(self.db.as_ref()).await?;
        Self::to_domain(updated)
    }

    async fn update_status(&self, id: Uuid, status: AuditStatus) -> Result<(), RepositoryError> {
        let result = audit_entity::Entity::update_many()
            .col_expr(audit_entity::Column::Status, Expr::value(status.to_string()))
            .col_expr(
                audit_entity::Column::UpdatedAt,
                Expr::value::<DateTime<FixedOffset>>(Utc::now().into()),
            )
            .filter(audit_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        audit_entity::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
