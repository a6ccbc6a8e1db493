// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 爬取作业
///
/// 一次运行中每个尝试的URL对应一个作业。创建时即为 running，
/// 随后恰好被终结一次（complete 或 error），运行期间不会被删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub url: String,
    pub status: CrawlJobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub page_count: i32,
    /// 作业进度，0..=1
    pub progress: f64,
}

impl CrawlJob {
    /// 创建一个处于 running 状态的作业
    pub fn start(audit_id: Uuid, url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            audit_id,
            url,
            status: CrawlJobStatus::Running,
            started_at: Some(Utc::now()),
            completed_at: None,
            error: None,
            page_count: 0,
            progress: 0.0,
        }
    }
}

/// 爬取作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlJobStatus {
    #[default]
    Pending,
    Running,
    Complete,
    Error,
}

impl fmt::Display for CrawlJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlJobStatus::Pending => write!(f, "pending"),
            CrawlJobStatus::Running => write!(f, "running"),
            CrawlJobStatus::Complete => write!(f, "complete"),
            CrawlJobStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for CrawlJobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CrawlJobStatus::Pending),
            "running" => Ok(CrawlJobStatus::Running),
            "complete" => Ok(CrawlJobStatus::Complete),
            "error" => Ok(CrawlJobStatus::Error),
            _ => Err(()),
        }
    }
}

/// 已爬取页面记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    pub id: Uuid,
    pub crawl_job_id: Uuid,
    pub audit_id: Uuid,
    pub url: String,
    /// 页面标题；页面没有标题时为URL
    pub title: String,
    pub crawled_at: DateTime<Utc>,
}

impl CrawledPage {
    pub fn new(job: &CrawlJob, title: Option<String>) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| job.url.clone());
        Self {
            id: Uuid::new_v4(),
            crawl_job_id: job.id,
            audit_id: job.audit_id,
            url: job.url.clone(),
            title,
            crawled_at: Utc::now(),
        }
    }
}
