// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::token::TokenLayer;
use crate::utils::url_utils::ensure_scheme;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 单个审计允许的产品URL上限
pub const MAX_PRODUCT_URLS: usize = 6;

/// 审计实体
///
/// 一次设计系统审计：若干产品站点与可选的父级设计系统站点。
/// `status` 是决定哪些操作合法的唯一依据，只由编排器和用户编辑修改
/// （用户编辑会把它重置为 `draft`）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    /// 审计唯一标识符
    pub id: Uuid,
    /// 显示名称
    pub name: String,
    /// 父级设计系统URL（可选）
    pub parent_system_url: Option<String>,
    /// 产品URL列表，有序，最多6个
    pub product_urls: Vec<String>,
    /// 当前状态
    pub status: AuditStatus,
    /// 爬取配置
    pub config: AuditConfig,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    pub fn new(
        name: String,
        product_urls: Vec<String>,
        parent_system_url: Option<String>,
        config: AuditConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            parent_system_url,
            product_urls,
            status: AuditStatus::Draft,
            config,
            created_at: now,
            updated_at: now,
        }
    }

    /// 有序的爬取列表：父级系统在前，随后是各产品，全部补全协议
    pub fn crawl_targets(&self) -> Vec<String> {
        self.parent_system_url
            .iter()
            .chain(self.product_urls.iter())
            .map(|url| ensure_scheme(url))
            .collect()
    }

    /// 补全协议后的父级系统URL，与令牌的 `source_product` 同一形式
    pub fn normalized_parent_url(&self) -> Option<String> {
        self.parent_system_url.as_deref().map(ensure_scheme)
    }
}

/// 审计状态
///
/// draft → crawling → analyzing → complete；任意阶段都可能进入 error。
/// 被停止的运行停在 crawled。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    #[default]
    Draft,
    Crawling,
    Crawled,
    Analyzing,
    Complete,
    Error,
}

impl AuditStatus {
    /// 是否允许从该状态启动新的爬取
    pub fn is_startable(&self) -> bool {
        matches!(
            self,
            AuditStatus::Draft | AuditStatus::Crawled | AuditStatus::Error | AuditStatus::Complete
        )
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuditStatus::Draft => write!(f, "draft"),
            AuditStatus::Crawling => write!(f, "crawling"),
            AuditStatus::Crawled => write!(f, "crawled"),
            AuditStatus::Analyzing => write!(f, "analyzing"),
            AuditStatus::Complete => write!(f, "complete"),
            AuditStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for AuditStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AuditStatus::Draft),
            "crawling" => Ok(AuditStatus::Crawling),
            "crawled" => Ok(AuditStatus::Crawled),
            "analyzing" => Ok(AuditStatus::Analyzing),
            "complete" => Ok(AuditStatus::Complete),
            "error" => Ok(AuditStatus::Error),
            _ => Err(()),
        }
    }
}

/// 审计配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// 每个产品最多爬取的页面数
    pub max_pages_per_product: u32,
    /// 视口宽度列表；当前只使用第一个
    pub viewports: Vec<u32>,
    /// 启用的令牌层级
    pub extract_layers: Vec<TokenLayer>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_pages_per_product: 50,
            viewports: vec![1440],
            extract_layers: TokenLayer::ALL.to_vec(),
        }
    }
}

impl AuditConfig {
    pub fn is_layer_enabled(&self, layer: TokenLayer) -> bool {
        self.extract_layers.contains(&layer)
    }

    pub fn primary_viewport(&self) -> u32 {
        self.viewports.first().copied().unwrap_or(1440)
    }
}
