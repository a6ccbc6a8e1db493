// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod failing_repos;
pub mod fake_browser;

use design_auditor::application::dto::audit_request::CreateAuditRequest;
use design_auditor::application::use_cases::audit_pipeline::AuditPipeline;
use design_auditor::config::settings::{
    BrowserSettings, ClassificationSettings, CrawlSettings, DatabaseSettings, LogSettings,
    MetricsSettings, Settings,
};
use design_auditor::domain::models::audit::Audit;
use design_auditor::domain::models::progress::ProgressEvent;
use design_auditor::domain::repositories::RepositorySet;
use design_auditor::infrastructure::database::connection;
use design_auditor::infrastructure::repositories::build_repository_set;
use design_auditor::workers::progress::ProgressSubscription;
use fake_browser::FakeBrowser;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub fn test_settings() -> Settings {
    Settings {
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: None,
            min_connections: None,
            connect_timeout: Some(5),
            idle_timeout: None,
        },
        browser: BrowserSettings {
            remote_url: None,
            navigation_timeout_secs: 5,
            request_timeout_secs: 5,
            headless: true,
            extra_args: Vec::new(),
        },
        crawl: CrawlSettings {
            // 小批量以覆盖分块写入
            insert_batch_size: 2,
            max_elements_per_page: 100,
            progress_capacity: 64,
            default_viewport_height: 900,
        },
        classification: ClassificationSettings::default(),
        metrics: MetricsSettings {
            enabled: false,
            listen_addr: "127.0.0.1:0".to_string(),
        },
        log: LogSettings::default(),
    }
}

/// 测试应用：内存SQLite + 脚本化浏览器
pub struct TestApp {
    pub pipeline: AuditPipeline,
    pub repos: RepositorySet,
    pub browser: Arc<FakeBrowser>,
}

impl TestApp {
    pub async fn new(browser: FakeBrowser) -> Self {
        Self::with_repositories(browser, |repos| repos).await
    }

    /// 允许在真实仓库外包一层（例如注入写入失败）
    pub async fn with_repositories(
        browser: FakeBrowser,
        wrap: impl FnOnce(RepositorySet) -> RepositorySet,
    ) -> Self {
        let settings = test_settings();
        let db = connection::connect_and_migrate(&settings.database)
            .await
            .expect("Failed to prepare in-memory database");
        let repos = wrap(build_repository_set(
            Arc::new(db),
            settings.crawl.insert_batch_size,
        ));
        let browser = Arc::new(browser);
        let pipeline = AuditPipeline::new(repos.clone(), browser.clone(), &settings);

        Self {
            pipeline,
            repos,
            browser,
        }
    }

    pub async fn create_audit(&self, products: &[&str], parent: Option<&str>) -> Audit {
        self.pipeline
            .create_audit(CreateAuditRequest {
                name: "Design audit".to_string(),
                product_urls: products.iter().map(|p| p.to_string()).collect(),
                parent_system_url: parent.map(str::to_string),
                config: None,
            })
            .await
            .expect("Failed to create audit")
    }

    /// 启动运行并收集全部事件，直到终止事件
    pub async fn run_to_end(&self, audit_id: Uuid) -> Vec<ProgressEvent> {
        self.pipeline.start(audit_id).await.expect("Failed to start run");
        let subscription = self
            .pipeline
            .subscribe(audit_id)
            .await
            .expect("Failed to subscribe");
        let events = drain(subscription).await;
        self.wait_idle(audit_id).await;
        events
    }

    /// 等待运行从注册表中移除
    pub async fn wait_idle(&self, audit_id: Uuid) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.pipeline.is_running(audit_id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Run did not leave the registry");
    }
}

pub async fn drain(mut subscription: ProgressSubscription) -> Vec<ProgressEvent> {
    tokio::time::timeout(Duration::from_secs(10), async move {
        let mut events = Vec::new();
        while let Some(event) = subscription.next().await {
            events.push(event);
        }
        events
    })
    .await
    .expect("Run did not emit a terminal event")
}
