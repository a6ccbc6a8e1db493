// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::token::TokenLayer;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、浏览器、爬取、分类阈值、指标和日志等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 爬取配置
    pub crawl: CrawlSettings,
    /// 分类阈值配置
    #[serde(default)]
    pub classification: ClassificationSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub log: LogSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程CDP地址；设置后连接已有浏览器而不是本地启动
    pub remote_url: Option<String>,
    /// 页面导航超时（秒）
    pub navigation_timeout_secs: u64,
    /// CDP请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否无头模式
    pub headless: bool,
    /// 额外的启动参数
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// 爬取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 批量写入的分块大小
    pub insert_batch_size: usize,
    /// 每页最多扫描的可见元素数
    pub max_elements_per_page: usize,
    /// 进度广播通道容量
    pub progress_capacity: usize,
    /// 视口高度
    pub default_viewport_height: u32,
}

/// 单个层级的分类阈值
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LayerThresholds {
    pub inherit_max: f64,
    pub adapt_max: f64,
}

impl LayerThresholds {
    pub const fn new(inherit_max: f64, adapt_max: f64) -> Self {
        Self {
            inherit_max,
            adapt_max,
        }
    }
}

/// 分类阈值配置
///
/// 每个令牌层级一组 `(inherit_max, adapt_max)`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    pub color: LayerThresholds,
    pub typography: LayerThresholds,
    pub spacing: LayerThresholds,
    pub elevation: LayerThresholds,
    pub border: LayerThresholds,
    pub motion: LayerThresholds,
    pub opacity: LayerThresholds,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            color: LayerThresholds::new(0.02, 0.15),
            typography: LayerThresholds::new(0.0, 0.25),
            spacing: LayerThresholds::new(0.05, 0.30),
            elevation: LayerThresholds::new(0.0, 0.20),
            border: LayerThresholds::new(0.05, 0.30),
            motion: LayerThresholds::new(0.05, 0.30),
            opacity: LayerThresholds::new(0.02, 0.15),
        }
    }
}

impl ClassificationSettings {
    pub fn for_layer(&self, layer: TokenLayer) -> LayerThresholds {
        match layer {
            TokenLayer::Color => self.color,
            TokenLayer::Typography => self.typography,
            TokenLayer::Spacing => self.spacing,
            TokenLayer::Elevation => self.elevation,
            TokenLayer::Border => self.border,
            TokenLayer::Motion => self.motion,
            TokenLayer::Opacity => self.opacity,
        }
    }
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用Prometheus导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

/// 日志配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSettings {
    /// 是否输出JSON格式日志
    pub json: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}` 和
    /// `AUDITOR__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("AUDITOR").separator("__"));

        builder.build()?.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Default DB pool settings
            .set_default("database.url", "sqlite://auditor.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Browser
            .set_default("browser.navigation_timeout_secs", 30)?
            .set_default("browser.request_timeout_secs", 30)?
            .set_default("browser.headless", true)?
            // Crawl
            .set_default("crawl.insert_batch_size", 100)?
            .set_default("crawl.max_elements_per_page", 5000)?
            .set_default("crawl.progress_capacity", 256)?
            .set_default("crawl.default_viewport_height", 900)?
            // Observability
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .set_default("log.json", false)
    }
}
