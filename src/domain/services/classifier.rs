// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::{ClassificationSettings, LayerThresholds};
use crate::domain::models::comparison::EntityType;
use crate::domain::models::token::Classification;
use crate::domain::repositories::comparison_repository::ComparisonRepository;
use crate::domain::repositories::extraction_repository::ExtractionRepository;
use crate::utils::errors::RepositoryError;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 组件与模式使用的固定阈值：0 → inherit，≤0.5 → adapt，其余 → extend
pub const ENTITY_THRESHOLDS: LayerThresholds = LayerThresholds::new(0.0, 0.5);

/// 根据偏离度和阈值得出分类与置信度
///
/// - `d ≤ inherit_max`：inherit，越接近边界置信度越低
/// - `d ≤ adapt_max`：adapt，同上
/// - 其余：extend，偏离越大置信度越高
pub fn classify_divergence(thresholds: LayerThresholds, divergence: f64) -> (Classification, f64) {
    let LayerThresholds {
        inherit_max,
        adapt_max,
    } = thresholds;

    if divergence <= inherit_max {
        let confidence = if inherit_max == 0.0 {
            1.0
        } else {
            1.0 - divergence / inherit_max
        };
        return (Classification::Inherit, confidence);
    }

    if divergence <= adapt_max {
        let range = adapt_max - inherit_max;
        let confidence = if range == 0.0 {
            1.0
        } else {
            1.0 - (divergence - inherit_max) / range
        };
        return (Classification::Adapt, confidence);
    }

    let range = 1.0 - adapt_max;
    let confidence = if range == 0.0 {
        1.0
    } else {
        ((divergence - adapt_max) / range).min(1.0)
    };
    (Classification::Extend, confidence)
}

/// 组件/模式的分类
pub fn classify_entity_divergence(divergence: f64) -> (Classification, f64) {
    classify_divergence(ENTITY_THRESHOLDS, divergence)
}

/// 分类服务
///
/// 为比较结果赋予分类，并把分类传播到同组中未被人工覆盖的令牌、组件和模式
pub struct ClassifierService {
    comparisons: Arc<dyn ComparisonRepository>,
    extractions: Arc<dyn ExtractionRepository>,
    thresholds: ClassificationSettings,
}

impl ClassifierService {
    pub fn new(
        comparisons: Arc<dyn ComparisonRepository>,
        extractions: Arc<dyn ExtractionRepository>,
        thresholds: ClassificationSettings,
    ) -> Self {
        Self {
            comparisons,
            extractions,
            thresholds,
        }
    }

    /// 对审计的全部比较结果分类
    ///
    /// 返回被分类的比较结果数
    #[instrument(skip(self))]
    pub async fn classify_audit(&self, audit_id: Uuid) -> Result<usize, RepositoryError> {
        let results = self.comparisons.find_by_audit(audit_id).await?;

        for result in &results {
            let (classification, confidence) = match result.entity_type {
                EntityType::Token(layer) => {
                    classify_divergence(self.thresholds.for_layer(layer), result.divergence_score)
                }
                EntityType::Component | EntityType::Pattern => {
                    classify_entity_divergence(result.divergence_score)
                }
            };

            self.comparisons
                .update_classification(result.id, classification)
                .await?;

            let updated = match result.entity_type {
                EntityType::Token(layer) => {
                    self.extractions
                        .apply_token_classification(
                            audit_id,
                            layer,
                            &result.entity_property,
                            classification,
                            confidence,
                        )
                        .await?
                }
                EntityType::Component => {
                    self.extractions
                        .apply_component_classification(
                            audit_id,
                            &result.entity_property,
                            classification,
                            confidence,
                        )
                        .await?
                }
                EntityType::Pattern => {
                    let (category, name) = result
                        .entity_property
                        .split_once("::")
                        .unwrap_or(("", result.entity_property.as_str()));
                    self.extractions
                        .apply_pattern_classification(
                            audit_id,
                            category,
                            name,
                            classification,
                            confidence,
                        )
                        .await?
                }
            };

            debug!(
                entity_type = %result.entity_type,
                property = %result.entity_property,
                %classification,
                confidence,
                updated,
                "Classified comparison result"
            );
        }

        info!(audit_id = %audit_id, results = results.len(), "Classification finished");
        Ok(results.len())
    }

    /// 人工覆盖令牌分类
    ///
    /// 空列表不做任何事
    #[instrument(skip(self, token_ids), fields(count = token_ids.len()))]
    pub async fn override_classification(
        &self,
        token_ids: &[Uuid],
        classification: Classification,
    ) -> Result<u64, RepositoryError> {
        if token_ids.is_empty() {
            return Ok(0);
        }
        self.extractions
            .override_token_classification(token_ids, classification)
            .await
    }
}
