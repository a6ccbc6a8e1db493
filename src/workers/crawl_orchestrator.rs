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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::settings::CrawlSettings;
use crate::domain::models::audit::{Audit, AuditStatus};
use crate::domain::models::crawl_job::{CrawlJob, CrawledPage};
use crate::domain::models::progress::{ProgressEvent, ProgressEventKind};
use crate::domain::models::token::{ExtractedComponent, ExtractedPattern, ExtractedToken};
use crate::domain::repositories::RepositorySet;
use crate::domain::services::classifier::ClassifierService;
use crate::domain::services::comparator::ComparatorService;
use crate::engines::page_extractor::PageExtractor;
use crate::engines::traits::{BrowserProvider, BrowserSession, EngineError, PageContext, Viewport};
use crate::infrastructure::metrics;
use crate::utils::errors::{PipelineError, RepositoryError};
use crate::workers::progress::ProgressChannel;
use crate::workers::registry::RunHandle;

/// 单个URL的失败，只影响该URL的作业
#[derive(Debug, Error)]
enum UrlError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

enum CrawlOutcome {
    Finished,
    Stopped,
}

/// 爬取循环的位置：已尝试的URL数和尚未终结的作业
#[derive(Default)]
struct CrawlCursor {
    attempted: AtomicUsize,
    in_flight: parking_lot::Mutex<Option<Uuid>>,
}

/// 浏览器会话守卫
///
/// 未显式释放就被丢弃时（运行被取消或panic），在后台关闭浏览器
pub struct SessionGuard {
    session: Arc<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Arc::from(session),
            released: false,
        }
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = self.session.close().await {
            warn!(error = %e, "Failed to close browser");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let session = Arc::clone(&self.session);
            runtime.spawn(async move {
                if let Err(e) = session.close().await {
                    warn!(error = %e, "Failed to close browser after cancelled run");
                }
            });
        }
    }
}

/// 爬取编排器
///
/// 驱动一个审计从爬取到分类的完整流程。URL严格顺序处理，
/// 同一时间只有一个浏览上下文。单个URL失败不会中止运行；
/// 只有无法获取浏览器以及分析阶段的失败是致命的。
pub struct CrawlOrchestrator {
    repos: RepositorySet,
    browser: Arc<dyn BrowserProvider>,
    extractor: PageExtractor,
    comparator: Arc<ComparatorService>,
    classifier: Arc<ClassifierService>,
    navigation_timeout: Duration,
    viewport_height: u32,
}

impl CrawlOrchestrator {
    pub fn new(
        repos: RepositorySet,
        browser: Arc<dyn BrowserProvider>,
        comparator: Arc<ComparatorService>,
        classifier: Arc<ClassifierService>,
        crawl: &CrawlSettings,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            repos,
            browser,
            extractor: PageExtractor::new(crawl.max_elements_per_page),
            comparator,
            classifier,
            navigation_timeout,
            viewport_height: crawl.default_viewport_height,
        }
    }

    /// 执行一次完整运行；结束时一定已发出终止事件
    #[instrument(skip_all, fields(audit_id = %audit.id))]
    pub async fn run(&self, audit: Audit, handle: Arc<RunHandle>) {
        metrics::record_run_started();

        if let Err(e) = self.execute(&audit, &handle).await {
            error!(error = %e, "Audit run failed");
            metrics::record_run_failed();

            if let Err(status_err) = self
                .repos
                .audits
                .update_status(audit.id, AuditStatus::Error)
                .await
            {
                error!(error = %status_err, "Failed to mark audit as error");
            }
            handle.progress.publish(
                ProgressEvent::new(ProgressEventKind::Error, audit.id, 0.0, e.to_string())
                    .with_status(AuditStatus::Error)
                    .terminal(),
            );
        }
    }

    async fn execute(&self, audit: &Audit, handle: &RunHandle) -> Result<(), PipelineError> {
        let progress = &handle.progress;
        let mut stop = handle.stop_signal();
        let targets = audit.crawl_targets();
        let cursor = CrawlCursor::default();

        let session = tokio::select! {
            biased;
            _ = wait_for_stop(&mut stop) => {
                return self.finish_stopped(audit, progress, 0.0).await;
            }
            acquired = self.browser.acquire() => {
                acquired.map_err(|e| PipelineError::Fatal(e.to_string()))?
            }
        };
        let guard = SessionGuard::new(session);

        self.repos
            .audits
            .update_status(audit.id, AuditStatus::Crawling)
            .await?;
        info!(urls = targets.len(), "Crawl started");
        progress.publish(
            ProgressEvent::new(
                ProgressEventKind::Start,
                audit.id,
                0.0,
                format!("Starting crawl of {} URL(s)", targets.len()),
            )
            .with_status(AuditStatus::Crawling),
        );

        let outcome = tokio::select! {
            biased;
            _ = wait_for_stop(&mut stop) => CrawlOutcome::Stopped,
            _ = self.crawl_all(audit, guard.session(), &targets, progress, &cursor) => {
                CrawlOutcome::Finished
            }
        };
        guard.release().await;

        if let CrawlOutcome::Stopped = outcome {
            // 被中断的作业仍是 running，由这里终结
            let interrupted = cursor.in_flight.lock().take();
            if let Some(job_id) = interrupted {
                match self.repos.crawl_jobs.mark_failed(job_id, "Crawl stopped").await {
                    Ok(()) | Err(RepositoryError::NotFound) => {}
                    Err(e) => error!(
                        job_id = %job_id,
                        error = %e,
                        "Failed to finalize interrupted crawl job"
                    ),
                }
            }
            let fraction = fraction(cursor.attempted.load(Ordering::SeqCst), targets.len());
            return self.finish_stopped(audit, progress, fraction).await;
        }

        self.repos
            .audits
            .update_status(audit.id, AuditStatus::Analyzing)
            .await?;
        progress.publish(
            ProgressEvent::new(
                ProgressEventKind::Progress,
                audit.id,
                1.0,
                "Comparing and classifying extracted design data",
            )
            .with_status(AuditStatus::Analyzing),
        );

        let compared = self.comparator.run(audit.id).await?;
        let classified = self.classifier.classify_audit(audit.id).await?;

        info!(compared, classified, "Audit analysis finished");
        progress.publish(
            ProgressEvent::new(
                ProgressEventKind::Complete,
                audit.id,
                1.0,
                format!("Audit complete: {} comparison result(s)", compared),
            )
            .with_status(AuditStatus::Complete),
        );
        Ok(())
    }

    /// 停止不回滚已写入的数据
    async fn finish_stopped(
        &self,
        audit: &Audit,
        progress: &ProgressChannel,
        fraction: f64,
    ) -> Result<(), PipelineError> {
        self.repos
            .audits
            .update_status(audit.id, AuditStatus::Crawled)
            .await?;
        info!("Crawl stopped");
        progress.publish(
            ProgressEvent::new(ProgressEventKind::Complete, audit.id, fraction, "Crawl stopped")
                .with_status(AuditStatus::Crawled),
        );
        Ok(())
    }

    async fn crawl_all(
        &self,
        audit: &Audit,
        session: &dyn BrowserSession,
        targets: &[String],
        progress: &ProgressChannel,
        cursor: &CrawlCursor,
    ) {
        for (index, url) in targets.iter().enumerate() {
            let done = fraction(index + 1, targets.len());
            let started = Instant::now();

            let job = match self
                .repos
                .crawl_jobs
                .create(&CrawlJob::start(audit.id, url.clone()))
                .await
            {
                Ok(job) => job,
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to create crawl job");
                    metrics::record_job_failed(started.elapsed());
                    progress.publish(
                        ProgressEvent::new(
                            ProgressEventKind::Error,
                            audit.id,
                            done,
                            format!("Failed to crawl {}: {}", url, e),
                        )
                        .with_url(url.as_str()),
                    );
                    cursor.attempted.store(index + 1, Ordering::SeqCst);
                    continue;
                }
            };

            *cursor.in_flight.lock() = Some(job.id);
            match self.crawl_url(audit, session, &job).await {
                Ok(tokens) => {
                    metrics::record_job_completed(started.elapsed(), tokens);
                    info!(url = %url, job_id = %job.id, tokens, "URL crawled");

                    progress.publish(
                        ProgressEvent::new(
                            ProgressEventKind::PageComplete,
                            audit.id,
                            done,
                            format!("Extracted {} token(s) from {}", tokens, url),
                        )
                        .with_job(job.id, url.as_str()),
                    );
                    progress.publish(
                        ProgressEvent::new(
                            ProgressEventKind::Progress,
                            audit.id,
                            done,
                            format!("Crawled {} of {} URL(s)", index + 1, targets.len()),
                        )
                        .with_job(job.id, url.as_str()),
                    );
                    progress.publish(
                        ProgressEvent::new(
                            ProgressEventKind::JobComplete,
                            audit.id,
                            done,
                            format!("Finished {}", url),
                        )
                        .with_job(job.id, url.as_str()),
                    );
                }
                Err(e) => {
                    warn!(url = %url, job_id = %job.id, error = %e, "URL crawl failed");
                    metrics::record_job_failed(started.elapsed());

                    if let Err(mark_err) = self
                        .repos
                        .crawl_jobs
                        .mark_failed(job.id, &e.to_string())
                        .await
                    {
                        error!(
                            job_id = %job.id,
                            error = %mark_err,
                            "Failed to record crawl job error"
                        );
                    }
                    progress.publish(
                        ProgressEvent::new(
                            ProgressEventKind::Error,
                            audit.id,
                            done,
                            format!("Failed to crawl {}: {}", url, e),
                        )
                        .with_job(job.id, url.as_str()),
                    );
                }
            }
            *cursor.in_flight.lock() = None;
            cursor.attempted.store(index + 1, Ordering::SeqCst);
        }
    }

    /// 浏览上下文在成功和失败时都会关闭
    async fn crawl_url(
        &self,
        audit: &Audit,
        session: &dyn BrowserSession,
        job: &CrawlJob,
    ) -> Result<usize, UrlError> {
        let viewport = Viewport {
            width: audit.config.primary_viewport(),
            height: self.viewport_height,
        };
        let page = session.open_context(viewport).await?;

        let result = self.extract_page(audit, job, page.as_ref()).await;
        if let Err(e) = page.close().await {
            warn!(url = %job.url, error = %e, "Failed to close browser context");
        }

        let tokens = result?;
        self.repos.crawl_jobs.mark_completed(job.id, 1).await?;
        Ok(tokens)
    }

    async fn extract_page(
        &self,
        audit: &Audit,
        job: &CrawlJob,
        page: &dyn PageContext,
    ) -> Result<usize, UrlError> {
        page.navigate(&job.url, self.navigation_timeout).await?;

        let title = match page.title().await {
            Ok(title) => title,
            Err(e) => {
                debug!(url = %job.url, error = %e, "Page title unavailable");
                None
            }
        };
        let crawled = self
            .repos
            .crawl_jobs
            .create_page(&CrawledPage::new(job, title))
            .await?;

        let extraction = self.extractor.extract(page).await;
        let product = job.url.as_str();

        let tokens: Vec<ExtractedToken> = extraction
            .tokens
            .into_iter()
            .filter(|t| audit.config.is_layer_enabled(t.layer))
            .map(|t| t.into_token(audit.id, Some(crawled.id), product))
            .collect();
        let components: Vec<ExtractedComponent> = extraction
            .components
            .into_iter()
            .map(|c| c.into_component(audit.id, product))
            .collect();
        let patterns: Vec<ExtractedPattern> = extraction
            .patterns
            .into_iter()
            .map(|p| p.into_pattern(audit.id, product))
            .collect();

        let inserted = self.repos.extractions.insert_tokens(&tokens).await?;
        self.repos.extractions.insert_components(&components).await?;
        self.repos.extractions.insert_patterns(&patterns).await?;

        debug!(
            url = %job.url,
            tokens = inserted,
            components = components.len(),
            patterns = patterns.len(),
            "Page extraction persisted"
        );
        Ok(inserted)
    }
}

fn fraction(done: usize, total: usize) -> f64 {
    done as f64 / total.max(1) as f64
}

async fn wait_for_stop(signal: &mut watch::Receiver<bool>) {
    if signal.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}
