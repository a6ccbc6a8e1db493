// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::audit::AuditStatus;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// 记录未找到
    #[error("Record not found")]
    NotFound,

    /// 存储的数据无法解析（非法枚举值、损坏的JSON列等）
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::InvalidData(err.to_string())
    }
}

/// 启动前置条件错误
///
/// 在任何状态变更之前被拒绝的启动请求
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Audit not found: {0}")]
    AuditNotFound(Uuid),

    #[error("Cannot start crawl while audit is \"{0}\"")]
    InvalidStatus(AuditStatus),

    #[error("No product URLs configured")]
    NoProductUrls,

    #[error("A crawl is already running for this audit")]
    AlreadyRunning,

    #[error("No crawl is running for this audit")]
    NotRunning,
}

/// 流水线错误类型
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 前置条件不满足
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// 致命错误，整个运行终止
    #[error("Fatal run error: {0}")]
    Fatal(String),

    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 请求校验失败
    #[error("Validation failed: {0}")]
    Validation(String),
}
