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

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 无法获取浏览器（对整个运行是致命的）
    #[error("Browser connection failed: {0}")]
    Connection(String),
    /// 导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 页面脚本执行失败
    #[error("Script evaluation failed: {0}")]
    Script(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// 视口尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// 浏览器提供者
///
/// 本地启动还是远程连接由实现决定
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    /// 获取一个浏览器会话，运行期间由单个编排器独占
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, EngineError>;
}

/// 浏览器会话
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 打开一个隔离的浏览上下文，并应用视口
    async fn open_context(&self, viewport: Viewport) -> Result<Box<dyn PageContext>, EngineError>;

    /// 释放浏览器
    ///
    /// 本地启动的浏览器被关闭；远程连接只清理本会话创建的上下文并断开
    async fn close(&self) -> Result<(), EngineError>;
}

/// 隔离上下文中的单个页面
#[async_trait]
pub trait PageContext: Send + Sync {
    /// 导航并等待网络静默
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), EngineError>;

    /// 页面标题
    async fn title(&self) -> Result<Option<String>, EngineError>;

    /// 在页面中执行脚本，返回可JSON序列化的结果
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, EngineError>;

    /// 关闭页面及其上下文
    async fn close(&self) -> Result<(), EngineError>;
}
