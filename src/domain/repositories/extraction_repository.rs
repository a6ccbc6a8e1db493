// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::token::{
    Classification, ExtractedComponent, ExtractedPattern, ExtractedToken, TokenLayer,
};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 提取结果仓库特质
///
/// 批量写入由实现内部分块，调用方一次传入整页结果；空切片不做任何事。
/// 读取按写入顺序返回。
#[async_trait]
pub trait ExtractionRepository: Send + Sync {
    /// 批量写入令牌，返回写入条数
    async fn insert_tokens(&self, tokens: &[ExtractedToken]) -> Result<usize, RepositoryError>;

    /// 批量写入组件
    async fn insert_components(
        &self,
        components: &[ExtractedComponent],
    ) -> Result<usize, RepositoryError>;

    /// 批量写入模式
    async fn insert_patterns(&self, patterns: &[ExtractedPattern])
        -> Result<usize, RepositoryError>;

    async fn find_tokens_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedToken>, RepositoryError>;

    async fn find_components_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedComponent>, RepositoryError>;

    async fn find_patterns_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedPattern>, RepositoryError>;

    /// 为 (layer, property) 下所有未被人工覆盖的令牌写入分类
    ///
    /// 返回被更新的行数
    async fn apply_token_classification(
        &self,
        audit_id: Uuid,
        layer: TokenLayer,
        property: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError>;

    /// 人工覆盖令牌分类：置信度为1，并永久设置覆盖标记
    async fn override_token_classification(
        &self,
        token_ids: &[Uuid],
        classification: Classification,
    ) -> Result<u64, RepositoryError>;

    /// 为指定名称下所有未被覆盖的组件写入分类
    async fn apply_component_classification(
        &self,
        audit_id: Uuid,
        name: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError>;

    /// 为 (category, name) 下所有未被覆盖的模式写入分类
    async fn apply_pattern_classification(
        &self,
        audit_id: Uuid,
        category: &str,
        name: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError>;
}
