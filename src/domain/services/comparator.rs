// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::audit::AuditStatus;
use crate::domain::models::comparison::{ComparisonResult, EntityType, MatrixCell, MatrixRow};
use crate::domain::models::crawl_job::CrawlJobStatus;
use crate::domain::models::token::{
    Classification, ExtractedComponent, ExtractedPattern, ExtractedToken, TokenLayer,
};
use crate::domain::repositories::RepositorySet;
use crate::domain::services::similarity::{exact_distance, token_distance};
use crate::utils::errors::RepositoryError;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// 某个取值在各产品中的频次
#[derive(Default)]
struct ValueEntry {
    per_product: IndexMap<String, i64>,
    total: i64,
}

/// 对一组令牌进行跨产品比较
///
/// 按 `layer::property` 分组后：
/// 1. 每个产品的代表值是它贡献频次最高的取值（并列取先出现者）
/// 2. 规范值优先取父级系统的代表值，否则取总频次最高的取值（并列取先出现者）
/// 3. 存储的偏离度是各产品偏离度中的最大值
pub fn compare_tokens(
    audit_id: Uuid,
    tokens: &[ExtractedToken],
    parent_url: Option<&str>,
) -> Vec<ComparisonResult> {
    // (layer, property) → 取值 → 频次，均保持首次出现顺序
    let mut groups: IndexMap<(TokenLayer, String), IndexMap<String, ValueEntry>> =
        IndexMap::new();

    for token in tokens {
        let entry = groups
            .entry((token.layer, token.property.clone()))
            .or_default()
            .entry(token.computed_value.clone())
            .or_default();
        *entry
            .per_product
            .entry(token.source_product.clone())
            .or_default() += i64::from(token.frequency);
        entry.total += i64::from(token.frequency);
    }

    let mut results = Vec::with_capacity(groups.len());
    for ((layer, property), values) in &groups {
        // 产品 → (代表值, 频次)，保持产品的首次出现顺序
        let mut representative: IndexMap<&str, (&str, i64)> = IndexMap::new();
        for (value, entry) in values {
            for (product, freq) in &entry.per_product {
                let current = representative
                    .entry(product.as_str())
                    .or_insert((value.as_str(), *freq));
                if *freq > current.1 {
                    *current = (value.as_str(), *freq);
                }
            }
        }

        let parent_value = parent_url
            .and_then(|url| representative.get(url))
            .map(|(value, _)| value.to_string());

        let canonical = match parent_value {
            Some(value) => value,
            None => {
                let mut canonical = values.keys().next().cloned().unwrap_or_default();
                let mut max_freq = 0;
                for (value, entry) in values {
                    if entry.total > max_freq {
                        max_freq = entry.total;
                        canonical = value.clone();
                    }
                }
                canonical
            }
        };

        let mut product_values = BTreeMap::new();
        let mut max_divergence: f64 = 0.0;
        for (product, (value, _)) in &representative {
            let divergence = token_distance(*layer, property, &canonical, value);
            max_divergence = max_divergence.max(divergence);
            product_values.insert(product.to_string(), value.to_string());
        }

        results.push(ComparisonResult {
            id: Uuid::new_v4(),
            audit_id,
            entity_type: EntityType::Token(*layer),
            entity_property: property.clone(),
            canonical_value: canonical,
            product_values,
            divergence_score: max_divergence.clamp(0.0, 1.0),
            classification: Classification::Unclassified,
        });
    }

    results
}

/// 按实体键对组件或模式做存在性比较
///
/// 产品值是该产品中的频次；规范值取父级系统的频次，否则取最大频次。
/// 偏离度是缺少该实体的已爬取产品所占比例。
fn compare_presence<'a>(
    audit_id: Uuid,
    entity_type: EntityType,
    records: impl Iterator<Item = (String, &'a str, i32)>,
    products: &[String],
    parent_url: Option<&str>,
) -> Vec<ComparisonResult> {
    let mut groups: IndexMap<String, IndexMap<&str, i64>> = IndexMap::new();
    for (key, product, frequency) in records {
        *groups.entry(key).or_default().entry(product).or_default() += i64::from(frequency);
    }

    groups
        .iter()
        .map(|(key, per_product)| {
            let canonical = parent_url
                .and_then(|url| per_product.get(url))
                .copied()
                .or_else(|| per_product.values().copied().max())
                .unwrap_or(0);

            let present = products
                .iter()
                .filter(|p| per_product.contains_key(p.as_str()))
                .count();
            let divergence = if products.is_empty() {
                0.0
            } else {
                (products.len() - present) as f64 / products.len() as f64
            };

            ComparisonResult {
                id: Uuid::new_v4(),
                audit_id,
                entity_type,
                entity_property: key.clone(),
                canonical_value: canonical.to_string(),
                product_values: per_product
                    .iter()
                    .map(|(p, f)| (p.to_string(), f.to_string()))
                    .collect(),
                divergence_score: divergence.clamp(0.0, 1.0),
                classification: Classification::Unclassified,
            }
        })
        .collect()
}

pub fn compare_components(
    audit_id: Uuid,
    components: &[ExtractedComponent],
    products: &[String],
    parent_url: Option<&str>,
) -> Vec<ComparisonResult> {
    compare_presence(
        audit_id,
        EntityType::Component,
        components
            .iter()
            .map(|c| (c.name.clone(), c.source_product.as_str(), c.frequency)),
        products,
        parent_url,
    )
}

pub fn compare_patterns(
    audit_id: Uuid,
    patterns: &[ExtractedPattern],
    products: &[String],
    parent_url: Option<&str>,
) -> Vec<ComparisonResult> {
    compare_presence(
        audit_id,
        EntityType::Pattern,
        patterns
            .iter()
            .map(|p| (p.key(), p.source_product.as_str(), p.frequency)),
        products,
        parent_url,
    )
}

/// 将比较结果展开为矩阵行，重新计算每个产品的偏离度
pub fn matrix_rows(results: &[ComparisonResult]) -> Vec<MatrixRow> {
    results
        .iter()
        .map(|result| {
            let products = result
                .product_values
                .iter()
                .map(|(product, value)| {
                    let divergence = match result.entity_type.layer() {
                        Some(layer) => token_distance(
                            layer,
                            &result.entity_property,
                            &result.canonical_value,
                            value,
                        ),
                        None => exact_distance(&result.canonical_value, value),
                    };
                    (
                        product.clone(),
                        MatrixCell {
                            value: value.clone(),
                            divergence,
                            classification: result.classification,
                        },
                    )
                })
                .collect();

            MatrixRow {
                layer: result.entity_type.to_string(),
                property: result.entity_property.clone(),
                canonical_value: result.canonical_value.clone(),
                products,
                max_divergence: result.divergence_score,
            }
        })
        .collect()
}

/// 比较服务
pub struct ComparatorService {
    repos: RepositorySet,
}

impl ComparatorService {
    pub fn new(repos: RepositorySet) -> Self {
        Self { repos }
    }

    /// 重新生成审计的全部比较结果，并把审计标记为 complete
    ///
    /// 返回生成的比较结果数
    #[instrument(skip(self))]
    pub async fn run(&self, audit_id: Uuid) -> Result<usize, RepositoryError> {
        let audit = self
            .repos
            .audits
            .find_by_id(audit_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let parent_url = audit.normalized_parent_url();

        let tokens = self.repos.extractions.find_tokens_by_audit(audit_id).await?;
        let components = self
            .repos
            .extractions
            .find_components_by_audit(audit_id)
            .await?;
        let patterns = self.repos.extractions.find_patterns_by_audit(audit_id).await?;

        let crawled_products: Vec<String> = self
            .repos
            .crawl_jobs
            .find_by_audit(audit_id)
            .await?
            .into_iter()
            .filter(|job| job.status == CrawlJobStatus::Complete)
            .map(|job| job.url)
            .collect();

        let mut results = compare_tokens(audit_id, &tokens, parent_url.as_deref());
        results.extend(compare_components(
            audit_id,
            &components,
            &crawled_products,
            parent_url.as_deref(),
        ));
        results.extend(compare_patterns(
            audit_id,
            &patterns,
            &crawled_products,
            parent_url.as_deref(),
        ));

        self.repos
            .comparisons
            .replace_for_audit(audit_id, &results)
            .await?;
        self.repos
            .audits
            .update_status(audit_id, AuditStatus::Complete)
            .await?;

        info!(
            audit_id = %audit_id,
            tokens = tokens.len(),
            results = results.len(),
            "Comparison finished"
        );
        Ok(results.len())
    }

    /// 比较矩阵读模型
    pub async fn comparison_matrix(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<MatrixRow>, RepositoryError> {
        let results = self.repos.comparisons.find_by_audit(audit_id).await?;
        Ok(matrix_rows(&results))
    }
}
