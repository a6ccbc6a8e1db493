// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use design_auditor::engines::traits::{
    BrowserProvider, BrowserSession, EngineError, PageContext, Viewport,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 单个站点的脚本化行为
#[derive(Clone)]
pub enum Site {
    /// 渲染出给定的样式样本
    Styles(Vec<Value>),
    /// 导航失败
    Broken,
    /// 导航永不完成
    Hanging,
}

#[derive(Default)]
pub struct BrowserCounters {
    pub acquired: AtomicUsize,
    pub closed: AtomicUsize,
    pub contexts_opened: AtomicUsize,
    pub contexts_closed: AtomicUsize,
}

/// 按URL返回预设页面内容的浏览器
#[derive(Default)]
pub struct FakeBrowser {
    sites: Arc<HashMap<String, Site>>,
    unavailable: bool,
    pub counters: Arc<BrowserCounters>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, url: &str, site: Site) -> Self {
        Arc::make_mut(&mut self.sites).insert(url.to_string(), site);
        self
    }

    /// 获取浏览器总是失败
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn open_contexts(&self) -> usize {
        self.counters.contexts_opened.load(Ordering::SeqCst)
            - self.counters.contexts_closed.load(Ordering::SeqCst)
    }
}

/// 一条页面内样式样本
pub fn sample(layer: &str, property: &str, value: &str, count: i32) -> Value {
    json!({
        "layer": layer,
        "property": property,
        "value": value,
        "selector": "p",
        "count": count,
    })
}

#[async_trait]
impl BrowserProvider for FakeBrowser {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, EngineError> {
        if self.unavailable {
            return Err(EngineError::Connection("no browser available".into()));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            sites: Arc::clone(&self.sites),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeSession {
    sites: Arc<HashMap<String, Site>>,
    counters: Arc<BrowserCounters>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_context(&self, _viewport: Viewport) -> Result<Box<dyn PageContext>, EngineError> {
        self.counters.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            sites: Arc::clone(&self.sites),
            counters: Arc::clone(&self.counters),
            current: parking_lot::Mutex::new(None),
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    sites: Arc<HashMap<String, Site>>,
    counters: Arc<BrowserCounters>,
    current: parking_lot::Mutex<Option<Site>>,
}

#[async_trait]
impl PageContext for FakePage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), EngineError> {
        match self.sites.get(url).cloned() {
            Some(Site::Broken) | None => {
                Err(EngineError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))
            }
            Some(Site::Hanging) => std::future::pending().await,
            Some(site) => {
                *self.current.lock() = Some(site);
                Ok(())
            }
        }
    }

    async fn title(&self) -> Result<Option<String>, EngineError> {
        Ok(Some("Fixture page".to_string()))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, EngineError> {
        let samples = match self.current.lock().clone() {
            Some(Site::Styles(samples)) => samples,
            _ => return Err(EngineError::Script("page not loaded".into())),
        };

        if script.contains("MAX_ELEMENTS") {
            Ok(json!({ "samples": samples, "variables": [] }))
        } else if script.contains("componentSelectors") {
            Ok(json!([{
                "category": "navigation",
                "name": "standard-nav",
                "componentSelectors": ["nav"],
                "frequency": 1,
            }]))
        } else {
            Ok(json!([{
                "name": "button",
                "selector": "button",
                "htmlSnapshot": "<button>Go</button>",
                "frequency": 2,
            }]))
        }
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.counters.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
