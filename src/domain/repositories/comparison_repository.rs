// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::comparison::ComparisonResult;
use crate::domain::models::token::Classification;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 比较结果仓库特质
#[async_trait]
pub trait ComparisonRepository: Send + Sync {
    /// 在一个事务中删除该审计的旧结果并写入新结果
    async fn replace_for_audit(
        &self,
        audit_id: Uuid,
        results: &[ComparisonResult],
    ) -> Result<(), RepositoryError>;

    async fn find_by_audit(&self, audit_id: Uuid)
        -> Result<Vec<ComparisonResult>, RepositoryError>;

    async fn update_classification(
        &self,
        id: Uuid,
        classification: Classification,
    ) -> Result<(), RepositoryError>;
}
