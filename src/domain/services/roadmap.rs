// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::comparison::{ComparisonResult, EntityType};
use crate::domain::models::migration_task::{
    Effort, MigrationTask, MigrationTaskStatus, Priority,
};
use crate::domain::models::token::{Classification, ExtractedToken, TokenLayer};
use crate::domain::repositories::comparison_repository::ComparisonRepository;
use crate::domain::repositories::extraction_repository::ExtractionRepository;
use crate::domain::repositories::migration_task_repository::MigrationTaskRepository;
use crate::utils::errors::RepositoryError;
use crate::utils::url_utils::product_label;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// 根据已分类的比较结果和令牌生成迁移任务
///
/// 每个已分类的令牌比较结果，按来源产品各生成一个任务：
/// - inherit：阶段1，工作量 xs，优先级由总频次决定
/// - adapt：阶段2，频次大于20为 md 否则 sm，优先级 high
/// - extend：阶段3，频次大于20为 lg 否则 md，优先级 medium
pub fn plan_tasks(
    audit_id: Uuid,
    results: &[ComparisonResult],
    tokens: &[ExtractedToken],
) -> Vec<MigrationTask> {
    // (layer, property) → 来源产品 → 令牌，产品保持首次出现顺序
    let mut by_group: IndexMap<(TokenLayer, String), IndexMap<&str, Vec<&ExtractedToken>>> =
        IndexMap::new();
    for token in tokens {
        by_group
            .entry((token.layer, token.property.clone()))
            .or_default()
            .entry(token.source_product.as_str())
            .or_default()
            .push(token);
    }

    let mut tasks = Vec::new();
    for result in results {
        if result.classification == Classification::Unclassified {
            continue;
        }
        let EntityType::Token(layer) = result.entity_type else {
            continue;
        };
        let Some(products) = by_group.get(&(layer, result.entity_property.clone())) else {
            continue;
        };

        let property = &result.entity_property;
        let canonical = &result.canonical_value;
        let divergence = result.divergence_score;

        for (product, product_tokens) in products {
            let product = *product;
            let total_frequency: i64 = product_tokens.iter().map(|t| i64::from(t.frequency)).sum();
            let entity_ids: Vec<Uuid> = product_tokens.iter().map(|t| t.id).collect();
            let affects = format!(
                "Affects {} token instance(s) across {}.",
                entity_ids.len(),
                product
            );

            let (phase, effort, priority, title, description) = match result.classification {
                Classification::Inherit => (
                    1,
                    Effort::Xs,
                    Priority::from_frequency(total_frequency),
                    format!("Adopt {} {} from design system", layer, property),
                    format!(
                        "Replace current {} {} value with the canonical design system value \"{}\". \
                         This is a direct adoption with no modifications needed. {}",
                        layer, property, canonical, affects
                    ),
                ),
                Classification::Adapt => (
                    2,
                    if total_frequency > 20 { Effort::Md } else { Effort::Sm },
                    Priority::High,
                    format!("Adapt {} {} for {}", layer, property, product_label(product)),
                    format!(
                        "Modify the {} {} value to align with the design system canonical value \"{}\" \
                         while accounting for product-specific density or context. \
                         Current divergence score: {:.3}. {}",
                        layer, property, canonical, divergence, affects
                    ),
                ),
                Classification::Extend => (
                    3,
                    if total_frequency > 20 { Effort::Lg } else { Effort::Md },
                    Priority::Medium,
                    format!(
                        "Extend design system with {} {} for {}",
                        layer,
                        property,
                        product_label(product)
                    ),
                    format!(
                        "Create a new design system token for {} {}. \
                         The current product value diverges significantly from the canonical value \"{}\" \
                         (divergence: {:.3}). \
                         Evaluate whether this represents a legitimate product need or should be consolidated. {}",
                        layer, property, canonical, divergence, affects
                    ),
                ),
                Classification::Unclassified => continue,
            };

            tasks.push(MigrationTask {
                id: Uuid::new_v4(),
                audit_id,
                title,
                description,
                entity_type: result.entity_type,
                entity_ids,
                source_product: product.to_string(),
                classification: result.classification,
                effort_estimate: effort,
                priority,
                phase,
                status: MigrationTaskStatus::Todo,
            });
        }
    }

    tasks
}

/// 路线图服务
pub struct RoadmapService {
    comparisons: Arc<dyn ComparisonRepository>,
    extractions: Arc<dyn ExtractionRepository>,
    tasks: Arc<dyn MigrationTaskRepository>,
}

impl RoadmapService {
    pub fn new(
        comparisons: Arc<dyn ComparisonRepository>,
        extractions: Arc<dyn ExtractionRepository>,
        tasks: Arc<dyn MigrationTaskRepository>,
    ) -> Self {
        Self {
            comparisons,
            extractions,
            tasks,
        }
    }

    /// 重新生成审计的路线图，整体替换旧任务
    #[instrument(skip(self))]
    pub async fn generate(&self, audit_id: Uuid) -> Result<Vec<MigrationTask>, RepositoryError> {
        let results = self.comparisons.find_by_audit(audit_id).await?;
        let tokens = self.extractions.find_tokens_by_audit(audit_id).await?;

        let tasks = plan_tasks(audit_id, &results, &tokens);
        self.tasks.replace_for_audit(audit_id, &tasks).await?;

        info!(audit_id = %audit_id, tasks = tasks.len(), "Roadmap generated");
        Ok(tasks)
    }

    pub async fn get_roadmap(&self, audit_id: Uuid) -> Result<Vec<MigrationTask>, RepositoryError> {
        self.tasks.find_by_audit(audit_id).await
    }

    pub async fn update_task_status(
        &self,
        task_id: Uuid,
        status: MigrationTaskStatus,
    ) -> Result<(), RepositoryError> {
        self.tasks.update_status(task_id, status).await
    }
}
