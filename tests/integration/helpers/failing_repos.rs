// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use design_auditor::domain::models::comparison::ComparisonResult;
use design_auditor::domain::models::token::{
    Classification, ExtractedComponent, ExtractedPattern, ExtractedToken, TokenLayer,
};
use design_auditor::domain::repositories::comparison_repository::ComparisonRepository;
use design_auditor::domain::repositories::extraction_repository::ExtractionRepository;
use design_auditor::utils::errors::RepositoryError;
use sea_orm::DbErr;
use std::sync::Arc;
use uuid::Uuid;

fn write_failure(what: &str) -> RepositoryError {
    RepositoryError::Database(DbErr::Custom(format!("disk I/O error while writing {}", what)))
}

/// 注入的写入故障
#[derive(Clone)]
pub enum ExtractionFault {
    /// 写入该产品的令牌时失败
    InsertTokensFor(String),
    /// 写入令牌分类时失败
    ApplyTokenClassification,
}

/// 在真实仓库之上按规则注入写入失败
pub struct FailingExtractions {
    inner: Arc<dyn ExtractionRepository>,
    fault: ExtractionFault,
}

impl FailingExtractions {
    pub fn wrap(inner: Arc<dyn ExtractionRepository>, fault: ExtractionFault) -> Arc<Self> {
        Arc::new(Self { inner, fault })
    }
}

#[async_trait]
impl ExtractionRepository for FailingExtractions {
    async fn insert_tokens(&self, tokens: &[ExtractedToken]) -> Result<usize, RepositoryError> {
        if let ExtractionFault::InsertTokensFor(ref product) = self.fault {
            if tokens.iter().any(|t| &t.source_product == product) {
                return Err(write_failure("tokens"));
            }
        }
        self.inner.insert_tokens(tokens).await
    }

    async fn insert_components(
        &self,
        components: &[ExtractedComponent],
    ) -> Result<usize, RepositoryError> {
        self.inner.insert_components(components).await
    }

    async fn insert_patterns(
        &self,
        patterns: &[ExtractedPattern],
    ) -> Result<usize, RepositoryError> {
        self.inner.insert_patterns(patterns).await
    }

    async fn find_tokens_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedToken>, RepositoryError> {
        self.inner.find_tokens_by_audit(audit_id).await
    }

    async fn find_components_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedComponent>, RepositoryError> {
        self.inner.find_components_by_audit(audit_id).await
    }

    async fn find_patterns_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ExtractedPattern>, RepositoryError> {
        self.inner.find_patterns_by_audit(audit_id).await
    }

    async fn apply_token_classification(
        &self,
        audit_id: Uuid,
        layer: TokenLayer,
        property: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError> {
        if let ExtractionFault::ApplyTokenClassification = self.fault {
            return Err(write_failure("token classification"));
        }
        self.inner
            .apply_token_classification(audit_id, layer, property, classification, confidence)
            .await
    }

    async fn override_token_classification(
        &self,
        token_ids: &[Uuid],
        classification: Classification,
    ) -> Result<u64, RepositoryError> {
        self.inner
            .override_token_classification(token_ids, classification)
            .await
    }

    async fn apply_component_classification(
        &self,
        audit_id: Uuid,
        name: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError> {
        self.inner
            .apply_component_classification(audit_id, name, classification, confidence)
            .await
    }

    async fn apply_pattern_classification(
        &self,
        audit_id: Uuid,
        category: &str,
        name: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<u64, RepositoryError> {
        self.inner
            .apply_pattern_classification(audit_id, category, name, classification, confidence)
            .await
    }
}

/// 比较结果无法写入
pub struct FailingComparisons {
    inner: Arc<dyn ComparisonRepository>,
}

impl FailingComparisons {
    pub fn wrap(inner: Arc<dyn ComparisonRepository>) -> Arc<Self> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl ComparisonRepository for FailingComparisons {
    async fn replace_for_audit(
        &self,
        _audit_id: Uuid,
        _results: &[ComparisonResult],
    ) -> Result<(), RepositoryError> {
        Err(write_failure("comparison results"))
    }

    async fn find_by_audit(
        &self,
        audit_id: Uuid,
    ) -> Result<Vec<ComparisonResult>, RepositoryError> {
        self.inner.find_by_audit(audit_id).await
    }

    async fn update_classification(
        &self,
        id: Uuid,
        classification: Classification,
    ) -> Result<(), RepositoryError> {
        self.inner.update_classification(id, classification).await
    }
}
