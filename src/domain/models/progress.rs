// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::audit::AuditStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 进度事件名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressEventKind {
    Start,
    Progress,
    PageComplete,
    JobComplete,
    Error,
    Complete,
    /// 没有运行中的任务时返回的合成快照
    Status,
}

impl fmt::Display for ProgressEventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ProgressEventKind::Start => "start",
            ProgressEventKind::Progress => "progress",
            ProgressEventKind::PageComplete => "page-complete",
            ProgressEventKind::JobComplete => "job-complete",
            ProgressEventKind::Error => "error",
            ProgressEventKind::Complete => "complete",
            ProgressEventKind::Status => "status",
        };
        f.write_str(name)
    }
}

/// 一次运行发出的进度事件
///
/// `terminal` 为真的事件之后，该运行不再发出任何事件。
/// 单个URL失败的 error 事件不是终止事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub kind: ProgressEventKind,
    pub terminal: bool,
    pub audit_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 已处理URL的比例，0..=1
    pub progress: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AuditStatus>,
}

impl ProgressEvent {
    pub fn new(
        kind: ProgressEventKind,
        audit_id: Uuid,
        progress: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            terminal: matches!(kind, ProgressEventKind::Complete | ProgressEventKind::Status),
            audit_id,
            job_id: None,
            url: None,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            timestamp: Utc::now(),
            status: None,
        }
    }

    pub fn with_job(mut self, job_id: Uuid, url: impl Into<String>) -> Self {
        self.job_id = Some(job_id);
        self.url = Some(url.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: AuditStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// 将事件标记为运行的最后一个事件
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// 没有运行时的状态快照
    pub fn snapshot(audit_id: Uuid, status: AuditStatus) -> Self {
        let progress = match status {
            AuditStatus::Complete | AuditStatus::Crawled => 1.0,
            _ => 0.0,
        };
        Self::new(ProgressEventKind::Status, audit_id, progress, format!("Audit is {}", status))
            .with_status(status)
    }
}
