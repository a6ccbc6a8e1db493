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

use crate::domain::models::token::{
    Classification, ExtractedComponent, ExtractedPattern, ExtractedToken, TokenLayer,
};
use crate::domain::repositories::extraction_repository::ExtractionRepository;
use crate::infrastructure::database::entities::{
    extracted_component as component_entity, extracted_pattern as pattern_entity,
    extracted_token as token_entity,
};
use crate::infrastructure::repositories::parse_column;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use sea_orm::{sea_query::Expr, *};
use std::sync::Arc;
use uuid::Uuid;

/// 提取结果仓库实现
///
/// 批量写入按 `batch_size` 分块，在同一事务中提交
pub struct ExtractionRepositoryImpl {
    db: Arc<DatabaseConnection>,
    batch_size: usize,
}

impl ExtractionRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
        }
    }

    fn token_to_domain(m: token_entity::Model) -> Result<ExtractedToken, RepositoryError> {
        Ok(ExtractedToken {
            id: m.id,
            audit_id: m.audit_id,
            crawled_page_id: m.crawled_page_id,
            source_product: m.source_product,
            layer: parse_column(&m.layer, "token layer")?,
            property: m.property,
            computed_value: m.computed_value,
            raw_value: m.raw_value,
            css_variable: m.css_variable,
            selector: m.selector,
            frequency: m.frequency,
            classification: parse_column(&m.classification, "classification")?,
            classification_confidence: m.classification_confidence,
            classification_overridden: m.classification_overridden,
        })
    }

    fn component_to_domain(
        m: component_entity::Model,
    ) -> Result<ExtractedComponent, RepositoryError> {
        Ok(ExtractedComponent {
            id: m.id,
            audit_id: m.audit_id,
            source_product: m.source_product,
            name: m.name,
            selector: m.selector,
            variants: serde_json::from_value(m.variants)?,
            states: serde_json::from_value(m.states)?,
            html_snapshot: m.html_snapshot,
            frequency: m.frequency,
            classification: parse_column(&m.classification, "classification")?,
            classification_confidence: m.classification_confidence,
            classification_overridden: m.classification_overridden,
        })
    }

    fn pattern_to_domain(m: pattern_entity::Model) -> Result<ExtractedPattern, RepositoryError> {
        Ok(ExtractedPattern {
            id: m.id,
            audit_id: m.audit_id,
            source_product: m.source_product,
            category: m.category,
            name: m.name,
            component_selectors: serde_json::from_value(m.component_selectors)?,
            frequency: m.frequency,
            classification: parse_column(&m.classification, "classification")?,
            classification_confidence: m.classification_confidence,
            classification_overridden: m.classification_overridden,
        })
    }
}

#[async_trait]
impl ExtractionRepository for ExtractionRepositoryImpl {
    async fn insert_tokens(&self, tokens: &[ExtractedToken]) -> Result<usize, RepositoryError> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        for chunk in tokens.chunks(self.batch_size) {
            let models = chunk.iter().map(|t| token_entity::ActiveModel {
                seq: NotSet,
                id: Set(t.id),
                audit_id: Set(t.audit_id),
                crawled_page_id: Set(t.crawled_page_id),
                source_product: Set(t.source_product.clone()),
                layer: Set(t.layer.to_string()),
                property: Set(t.property.clone()),
                computed_value: Set(t.computed_value.clone()),
                raw_value: Set(t.raw_value.clone()),
                css_variable: Set(t.css_variable.clone()),
                selector: Set(t.selector.clone()),
                frequency: Set(t.frequency),
                classification: Set(t.classification.to_string()),
                classification_confidence: Set(t.classification_confidence),
                classification_overridden: Set(t.classification_overridden),
            });
            token_entity::Entity::insert_many(models).exec(&txn).await?;
        }
        txn.commit().await?;

        Ok(tokens.len())
    }

    async fn insert_components(
        &self,
        components: &[ExtractedComponent],
    ) -> Result<usize, RepositoryError> {
        if components.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        for chunk in components.chunks(self.batch_size) {
            let mut models = Vec::with_capacity(chunk.len());
            for c in chunk {
                models.push(component_entity::ActiveModel {
                    seq: NotSet,
                    id: Set(c.id),
                    audit_id: Set(c.audit_id),
                    source_product: Set(c.source_product.clone()),
                    name: Set(c.name.clone()),
                    selector: Set(c.selector.clone()),
                    variants: Set(serde_json::to_value(&c.variants)?),
                    states: Set(serde_json::to_value(&c.states)?),
                    html_snapshot: Set(c.html_snapshot.clone()),
                    frequency: Set(c.frequency),
                    classification: Set(c.classification.to_string()),
                    classification_confidence: Set(c.classification_confidence),
                    classification_overridden: Set(c.classification_overridden),
                });
            }
            component_entity::Entity::insert_many(models).exec(&txn).await?;
        }
        txn.commit().await?;

        Ok(components.len())
    }

    async fn insert_patterns(
        &self,
        patterns: &[ExtractedPattern],
    ) -> Result<usize, RepositoryError> {
        if patterns.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        for chunk in patterns.chunks(self.batch_size) {
            let mut models = Vec::with_capacity(chunk.len());
            for p in chunk {
                models.push(pattern_entity::ActiveModel {
                    seq: NotSet,
                    id: Set(p.id),
                    audit_id: Set(p.audit_id),
                    source_product: Set(p.source_product.clone()),
                    category: Set(p.category.clone()),
                    name: Set(p.name.clone()),
                    component_selectors: Set(serde_json::to_value(&p.component_selectors)?),
                    frequency: Set(p.frequency),
                    classification: Set(p.classification.to_string()),
                    classification_confidence: Set(p.classification_confidence),
                    classification_overridden: Set(p.classification_overridden),
                });
            }
            pattern_entity::Entity::insert_many(models).exec(&txn).await?;
        }
        txn.commit().await?;

        Ok(patterns.len())
    }

    async fn find_tokens_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedToken>, RepositoryError> {
        token_entity::Entity::find()
            .filter(token_entity::Column::AuditId.eq(audit_id))
            .order_by_asc(token_entity::Column::Seq)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Self::token_to_domain)
            .collect()
    }

    async fn find_components_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedComponent>, RepositoryError> {
        component_entity::Entity::find()
            .filter(component_entity::Column::AuditId.eq(audit_id))
            .order_by_asc(component_entity::Column::Seq)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Self::component_to_domain)
            .collect()
    }

    async fn find_patterns_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedPattern>, RepositoryError> {
        pattern_entity::Entity::find()
            .filter(pattern_entity::Column::AuditId.eq(audit_id))
            .order_by_asc(pattern_entity::Column::Seq)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Self::pattern_to_domain)
            .collect()
    }

    async fn apply_token_classification(
        &self,
        audit_id: Uuid,
        layer: TokenLayer,
        property: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError> {
        let result = token_entity::Entity::update_many()
            .col_expr(
                token_entity::Column::Classification,
                Expr::value(classification.to_string()),
            )
            .col_expr(
                token_entity::Column::ClassificationConfidence,
                Expr::value(confidence),
            )
            .filter(token_entity::Column::AuditId.eq(audit_id))
            .filter(token_entity::Column::Layer.eq(layer.as_str()))
            .filter(token_entity::Column::Property.eq(property))
            .filter(token_entity::Column::ClassificationOverridden.eq(false))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn override_token_classification(
        &self,
        token_ids: &[Uuid],
        classification: Classification,
    ) -> Result<u64, RepositoryError> {
        if token_ids.is_empty() {
            return Ok(0);
        }

        let result = token_entity::Entity::update_many()
            .col_expr(
                token_entity::Column::Classification,
                Expr::value(classification.to_string()),
            )
            .col_expr(
                token_entity::Column::ClassificationConfidence,
                Expr::value(1.0_f64),
            )
            .col_expr(
                token_entity::Column::ClassificationOverridden,
                Expr::value(true),
            )
            .filter(token_entity::Column::Id.is_in(token_ids.to_vec()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn apply_component_classification(
        &self,
        audit_id: Uuid,
        name: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError> {
        let result = component_entity::Entity::update_many()
            .col_expr(
                component_entity::Column::Classification,
                Expr::value(classification.to_string()),
            )
            .col_expr(
                component_entity::Column::ClassificationConfidence,
                Expr::value(confidence),
            )
            .filter(component_entity::Column::AuditId.eq(audit_id))
            .filter(component_entity::Column::Name.eq(name))
            .filter(component_entity::Column::ClassificationOverridden.eq(false))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn apply_pattern_classification(
        &self,
        audit_id: Uuid,
        category: &str,
        name: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError> {
        let result = pattern_entity::Entity::update_many()
            .col_expr(
                pattern_entity::Column::Classification,
                Expr::value(classification.to_string()),
            )
            .col_expr(
                pattern_entity::Column::ClassificationConfidence,
                Expr::value(confidence),
            )
            .filter(pattern_entity::Column::AuditId.eq(audit_id))
            .filter(pattern_entity::Column::Category.eq(category))
            .filter(pattern_entity::Column::Name.eq(name))
            .filter(pattern_entity::Column::ClassificationOverridden.eq(false))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
