// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::audit::{Audit, AuditStatus};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 审计仓库特质
///
/// 定义审计数据访问接口，提供CRUD操作和状态管理功能。
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// 创建审计
    async fn create(&self, audit: &Audit) -> Result<Audit, RepositoryError>;

    /// 根据ID查找审计
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Audit))` - 找到审计
    /// * `Ok(None)` - 未找到
    /// * `Err(RepositoryError)` - 查询失败
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Audit>, RepositoryError>;

    /// 列出所有审计，按创建时间倒序
    async fn list(&self) -> Result<Vec<Audit>, RepositoryError>;

    /// 更新审计的名称、URL、配置和状态
    async fn update(&self, audit: &Audit) -> Result<Audit, RepositoryError>;

    /// 更新审计状态
    ///
    /// 审计不存在时返回 `RepositoryError::NotFound`
    async fn update_status(&self, id: Uuid, status: AuditStatus) -> Result<(), RepositoryError>;

    /// 删除审计，关联数据级联删除
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
