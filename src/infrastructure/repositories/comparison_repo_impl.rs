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

use crate::domain::models::comparison::ComparisonResult;
use crate::domain::models::token::Classification;
use crate::domain::repositories::comparison_repository::ComparisonRepository;
use crate::infrastructure::database::entities::comparison_result as comparison_entity;
use crate::infrastructure::repositories::parse_column;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use sea_orm::{sea_query::Expr, *};
use std::sync::Arc;
use uuid::Uuid;

/// 比较结果仓库实现
pub struct ComparisonRepositoryImpl {
    db: Arc<DatabaseConnection>,
    batch_size: usize,
}

impl ComparisonRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
        }
    }

    fn to_domain(m: comparison_entity::Model) -> Result<ComparisonResult, RepositoryError> {
        Ok(ComparisonResult {
            id: m.id,
            audit_id: m.audit_id,
            entity_type: parse_column(&m.entity_type, "entity type")?,
            entity_property: m.entity_property,
            canonical_value: m.canonical_value,
            product_values: serde_json::from_value(m.product_values)?,
            divergence_score: m.divergence_score,
            classification: parse_column(&m.classification, "classification")?,
        })
    }

    fn to_active_model(
        r: &ComparisonResult,
    ) -> Result<comparison_entity::ActiveModel, RepositoryError> {
        Ok(comparison_entity::ActiveModel {
            id: Set(r.id),
            audit_id: Set(r.audit_id),
            entity_type: Set(r.entity_type.to_string()),
            entity_property: Set(r.entity_property.clone()),
            canonical_value: Set(r.canonical_value.clone()),
            product_values: Set(serde_json::to_value(&r.product_values)?),
            divergence_score: Set(r.divergence_score),
            classification: Set(r.classification.to_string()),
        })
    }
}

#[async_trait]
impl ComparisonRepository for ComparisonRepositoryImpl {
    async fn replace_for_audit(
        &self,
        audit_id: Uuid,
        results: &[ComparisonResult],
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        comparison_entity::Entity::delete_many()
            .filter(comparison_entity::Column::AuditId.eq(audit_id))
            .exec(&txn)
            .await?;

        for chunk in results.chunks(self.batch_size) {
            let models = chunk
                .iter()
                .map(Self::to_active_model)
                .collect::<Result<Vec<_>, _>>()?;
            comparison_entity::Entity::insert_many(models).exec(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn find_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ComparisonResult>, RepositoryError> {
        comparison_entity::Entity::find()
            .filter(comparison_entity::Column::AuditId.eq(audit_id))
            .order_by_asc(comparison_entity::Column::EntityType)
            .order_by_asc(comparison_entity::Column::EntityProperty)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Self::to_domain)
            .collect()
    }

    async fn update_classification(
        &self,
        id: Uuid,
        classification: Classification,
    ) -> Result<(), RepositoryError> {
        let result = comparison_entity::Entity::update_many()
            .col_expr(
                comparison_entity::Column::Classification,
                Expr::value(classification.to_string()),
            )
            .filter(comparison_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
