// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::traits::{BrowserProvider, BrowserSession, EngineError, PageContext, Viewport};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 浏览器的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// 本次运行启动的Chrome进程
    Launched,
    /// 外部管理的远程Chrome，可能同时服务其他审计
    Connected,
}

impl SessionOrigin {
    /// 释放会话时是否发送 `Browser.close`
    pub fn shuts_down_browser(self) -> bool {
        matches!(self, SessionOrigin::Launched)
    }
}

/// 基于chromiumoxide的浏览器提供者
///
/// 配置了 `remote_url` 时连接远程Chrome，否则本地启动
pub struct ChromiumProvider {
    settings: BrowserSettings,
}

impl ChromiumProvider {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    pub fn origin(&self) -> SessionOrigin {
        if self.settings.remote_url.is_some() {
            SessionOrigin::Connected
        } else {
            SessionOrigin::Launched
        }
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, EngineError> {
        let (browser, mut handler) = if let Some(ref url) = self.settings.remote_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url).await.map_err(|e| {
                EngineError::Connection(format!("Failed to connect to remote Chrome: {}", e))
            })?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(Duration::from_secs(self.settings.request_timeout_secs))
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage");
            if !self.settings.headless {
                builder = builder.with_head();
            }
            for arg in &self.settings.extra_args {
                builder = builder.arg(arg.as_str());
            }
            let config = builder.build().map_err(EngineError::Connection)?;

            Browser::launch(config)
                .await
                .map_err(|e| EngineError::Connection(e.to_string()))?
        };

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            origin: self.origin(),
            browser: Arc::new(Mutex::new(browser)),
            contexts: Arc::new(parking_lot::Mutex::new(Vec::new())),
            handler_task: parking_lot::Mutex::new(Some(handler_task)),
        }))
    }
}

/// 单次运行使用的浏览器会话
pub struct ChromiumSession {
    origin: SessionOrigin,
    browser: Arc<Mutex<Browser>>,
    /// 本会话创建且尚未销毁的上下文
    contexts: Arc<parking_lot::Mutex<Vec<BrowserContextId>>>,
    handler_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumSession {
    async fn dispose_open_contexts(&self) {
        let leftover: Vec<BrowserContextId> = std::mem::take(&mut *self.contexts.lock());
        if leftover.is_empty() {
            return;
        }
        let browser = self.browser.lock().await;
        for context_id in leftover {
            if let Err(e) = browser.dispose_browser_context(context_id).await {
                warn!(error = %e, "Failed to dispose browser context");
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_context(
        &self,
        viewport: Viewport,
    ) -> Result<Box<dyn PageContext>, EngineError> {
        let browser = self.browser.lock().await;

        let context_id = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;

        let mut params = CreateTargetParams::new("about:blank");
        params.browser_context_id = Some(context_id.clone());

        let page = match browser.new_page(params).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.dispose_browser_context(context_id).await;
                return Err(EngineError::Other(e.to_string()));
            }
        };
        drop(browser);
        self.contexts.lock().push(context_id.clone());

        let chromium_page = ChromiumPage {
            page,
            context_id,
            browser: Arc::clone(&self.browser),
            contexts: Arc::clone(&self.contexts),
        };

        let setup = async {
            chromium_page
                .page
                .execute(SetDeviceMetricsOverrideParams::new(
                    i64::from(viewport.width),
                    i64::from(viewport.height),
                    1.0,
                    false,
                ))
                .await?;
            chromium_page
                .page
                .execute(SetLifecycleEventsEnabledParams::new(true))
                .await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        if let Err(e) = setup.await {
            let _ = chromium_page.close().await;
            return Err(EngineError::Other(e.to_string()));
        }

        debug!(width = viewport.width, height = viewport.height, "Browser context opened");
        Ok(Box::new(chromium_page))
    }

    async fn close(&self) -> Result<(), EngineError> {
        let result = if self.origin.shuts_down_browser() {
            let mut browser = self.browser.lock().await;
            browser.close().await.map(|_| ())
        } else {
            // 远程浏览器由外部管理，只清理自己的上下文后断开
            self.dispose_open_contexts().await;
            debug!("Disconnected from remote Chrome");
            Ok(())
        };
        if let Some(task) = self.handler_task.lock().take() {
            task.abort();
        }
        result.map_err(|e| EngineError::Other(e.to_string()))
    }
}

/// 跟踪主框架新文档的生命周期事件
///
/// `init` 之后出现的 `networkIdle` 才算本次导航的网络静默
#[derive(Debug, Default)]
struct LifecycleTracker {
    document_started: bool,
}

impl LifecycleTracker {
    fn observe(&mut self, name: &str) -> bool {
        match name {
            "init" => {
                self.document_started = true;
                false
            }
            "networkIdle" => self.document_started,
            _ => false,
        }
    }
}

/// 隔离上下文中的页面，关闭时一并销毁上下文
pub struct ChromiumPage {
    page: Page,
    context_id: BrowserContextId,
    browser: Arc<Mutex<Browser>>,
    contexts: Arc<parking_lot::Mutex<Vec<BrowserContextId>>>,
}

#[async_trait]
impl PageContext for ChromiumPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), EngineError> {
        let mut lifecycle = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| EngineError::Navigation(e.to_string()))?;

        tokio::time::timeout(timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| EngineError::Navigation(e.to_string()))?;
            let main_frame = self
                .page
                .mainframe()
                .await
                .map_err(|e| EngineError::Navigation(e.to_string()))?;

            let mut tracker = LifecycleTracker::default();
            while let Some(event) = lifecycle.next().await {
                if main_frame.as_ref().is_some_and(|frame| *frame != event.frame_id) {
                    continue;
                }
                if tracker.observe(&event.name) {
                    return Ok(());
                }
            }
            Err(EngineError::Navigation(
                "Page closed before network became idle".to_string(),
            ))
        })
        .await
        .map_err(|_| EngineError::Timeout)?
    }

    async fn title(&self) -> Result<Option<String>, EngineError> {
        self.page
            .get_title()
            .await
            .map_err(|e| EngineError::Other(e.to_string()))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, EngineError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| EngineError::Script(e.to_string()))?
            .into_value::<serde_json::Value>()
            .map_err(|e| EngineError::Script(e.to_string()))
    }

    async fn close(&self) -> Result<(), EngineError> {
        let page_result = self.page.clone().close().await;
        if let Err(ref e) = page_result {
            warn!(error = %e, "Failed to close page");
        }

        self.contexts.lock().retain(|id| *id != self.context_id);
        let browser = self.browser.lock().await;
        browser
            .dispose_browser_context(self.context_id.clone())
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;

        page_result.map_err(|e| EngineError::Other(e.to_string()))
    }
}
