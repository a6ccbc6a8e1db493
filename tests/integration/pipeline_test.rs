// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::failing_repos::{ExtractionFault, FailingComparisons, FailingExtractions};
use super::helpers::fake_browser::{sample, FakeBrowser, Site};
use super::helpers::{drain, TestApp};
use design_auditor::application::dto::audit_request::{
    CreateAuditRequest, OverrideClassificationRequest, UpdateAuditRequest,
};
use design_auditor::domain::models::audit::AuditStatus;
use design_auditor::domain::models::comparison::EntityType;
use design_auditor::domain::models::crawl_job::CrawlJobStatus;
use design_auditor::domain::models::progress::ProgressEventKind;
use design_auditor::domain::models::progress::ProgressEvent;
use design_auditor::domain::models::token::{Classification, TokenLayer};
use design_auditor::domain::repositories::RepositorySet;
use design_auditor::utils::errors::{PipelineError, PreconditionError};
use std::time::Duration;
use uuid::Uuid;

const P1: &str = "https://p1.example.com";
const P2: &str = "https://p2.example.com";
const P3: &str = "https://p3.example.com";

fn black_text(value: &str) -> Site {
    Site::Styles(vec![
        sample("color", "color", value, 10),
        sample("spacing", "paddingTop", "16px", 4),
        sample("spacing", "marginTop", "0px", 30),
    ])
}

#[tokio::test]
async fn test_failed_url_does_not_abort_run() {
    let app = TestApp::new(
        FakeBrowser::new()
            .with_site(P1, black_text("rgb(0, 0, 0)"))
            .with_site(P2, Site::Broken)
            .with_site(P3, black_text("rgb(0, 0, 0)")),
    )
    .await;
    let audit = app.create_audit(&[P1, P2, P3], None).await;

    let events = app.run_to_end(audit.id).await;

    assert_eq!(events.first().map(|e| e.kind), Some(ProgressEventKind::Start));
    let last = events.last().expect("no events");
    assert_eq!(last.kind, ProgressEventKind::Complete);
    assert_eq!(last.status, Some(AuditStatus::Complete));
    assert_eq!(events.iter().filter(|e| e.terminal).count(), 1);

    let errors: Vec<_> = events
        .iter()
        .filter(|e| e.kind == ProgressEventKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].url.as_deref(), Some(P2));
    assert!(errors[0].job_id.is_some());

    assert!(events
        .windows(2)
        .all(|pair| pair[0].progress <= pair[1].progress));

    let jobs = app.pipeline.crawl_jobs(audit.id).await.unwrap();
    let statuses: Vec<_> = jobs.iter().map(|j| j.status).collect();
    assert_eq!(
        statuses,
        vec![
            CrawlJobStatus::Complete,
            CrawlJobStatus::Error,
            CrawlJobStatus::Complete
        ]
    );
    assert!(jobs[1].error.as_deref().unwrap_or_default().contains("ERR_NAME_NOT_RESOLVED"));
    assert!(jobs.iter().all(|j| j.completed_at.is_some()));

    let audit = app.pipeline.get_audit(audit.id).await.unwrap();
    assert_eq!(audit.status, AuditStatus::Complete);
    assert_eq!(app.browser.closed(), 1);
    assert_eq!(app.browser.open_contexts(), 0);
}

#[tokio::test]
async fn test_near_identical_color_is_inherited() {
    let app = TestApp::new(
        FakeBrowser::new()
            .with_site(P1, black_text("rgb(0, 0, 0)"))
            .with_site(P2, black_text("rgb(10, 10, 10)")),
    )
    .await;
    let audit = app.create_audit(&[P1, P2], None).await;
    app.run_to_end(audit.id).await;

    let matrix = app.pipeline.comparison_matrix(audit.id).await.unwrap();
    let row = matrix
        .iter()
        .find(|r| r.layer == "color" && r.property == "color")
        .expect("color row missing");
    assert_eq!(row.canonical_value, "rgb(0, 0, 0)");
    assert!(row.max_divergence > 0.0 && row.max_divergence < 0.02);
    assert_eq!(row.products[P2].classification, Classification::Inherit);
    assert_eq!(row.products[P2].value, "rgb(10, 10, 10)");

    // 0px 被当作噪声过滤
    assert!(matrix.iter().all(|r| r.property != "marginTop"));

    let tokens = app.repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    let p2_color = tokens
        .iter()
        .find(|t| t.source_product == P2 && t.layer == TokenLayer::Color)
        .expect("P2 color token missing");
    assert_eq!(p2_color.classification, Classification::Inherit);
    assert!(p2_color.classification_confidence > 0.0);

    let tasks = app.pipeline.generate_roadmap(audit.id).await.unwrap();
    let task = tasks
        .iter()
        .find(|t| t.source_product == P2 && t.entity_type == EntityType::Token(TokenLayer::Color))
        .expect("no task for P2");
    assert_eq!(task.phase, 1);
    assert_eq!(task.classification, Classification::Inherit);
    assert!(task.entity_ids.contains(&p2_color.id));
}

#[tokio::test]
async fn test_roadmap_regeneration_replaces_tasks() {
    let app = TestApp::new(
        FakeBrowser::new()
            .with_site(P1, black_text("rgb(0, 0, 0)"))
            .with_site(P2, black_text("rgb(200, 30, 30)")),
    )
    .await;
    let audit = app.create_audit(&[P1, P2], None).await;
    app.run_to_end(audit.id).await;

    let first = app.pipeline.generate_roadmap(audit.id).await.unwrap();
    let second = app.pipeline.generate_roadmap(audit.id).await.unwrap();
    let stored = app.pipeline.get_roadmap(audit.id).await.unwrap();

    assert!(!first.is_empty());
    assert_eq!(first.len(), second.len());
    assert_eq!(stored.len(), second.len());
    assert!(stored.windows(2).all(|w| (w[0].phase, w[0].priority) <= (w[1].phase, w[1].priority)));

    let extend = stored
        .iter()
        .find(|t| t.source_product == P2 && t.classification == Classification::Extend)
        .expect("strong color divergence should be extended");
    assert_eq!(extend.phase, 3);
}

#[tokio::test]
async fn test_override_survives_reclassification() {
    let app = TestApp::new(
        FakeBrowser::new()
            .with_site(P1, black_text("rgb(0, 0, 0)"))
            .with_site(P2, black_text("rgb(10, 10, 10)")),
    )
    .await;
    let audit = app.create_audit(&[P1, P2], None).await;
    app.run_to_end(audit.id).await;

    let tokens = app.repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    let target = tokens
        .iter()
        .find(|t| t.source_product == P2 && t.layer == TokenLayer::Color)
        .unwrap()
        .id;

    let updated = app
        .pipeline
        .override_classification(OverrideClassificationRequest {
            token_ids: vec![target],
            classification: Classification::Extend,
        })
        .await
        .unwrap();
    assert_eq!(updated, 1);

    // 再次运行会重新比较和分类
    app.run_to_end(audit.id).await;

    let tokens = app.repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    let overridden = tokens.iter().find(|t| t.id == target).unwrap();
    assert_eq!(overridden.classification, Classification::Extend);
    assert_eq!(overridden.classification_confidence, 1.0);
    assert!(overridden.classification_overridden);

    let fresh = tokens
        .iter()
        .filter(|t| t.source_product == P2 && t.layer == TokenLayer::Color && t.id != target)
        .collect::<Vec<_>>();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].classification, Classification::Inherit);
}

#[tokio::test]
async fn test_override_rejects_unclassified_target() {
    let app = TestApp::new(FakeBrowser::new()).await;

    let err = app
        .pipeline
        .override_classification(OverrideClassificationRequest {
            token_ids: vec![Uuid::new_v4()],
            classification: Classification::Unclassified,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}

#[tokio::test]
async fn test_start_preconditions() {
    let app = TestApp::new(FakeBrowser::new().with_site(P1, black_text("rgb(0, 0, 0)"))).await;

    let missing = Uuid::new_v4();
    assert!(matches!(
        app.pipeline.start(missing).await,
        Err(PipelineError::Precondition(PreconditionError::AuditNotFound(id))) if id == missing
    ));

    let audit = app.create_audit(&[P1], None).await;
    assert!(matches!(
        app.pipeline.stop(audit.id).await,
        Err(PipelineError::Precondition(PreconditionError::NotRunning))
    ));

    app.repos
        .audits
        .update_status(audit.id, AuditStatus::Analyzing)
        .await
        .unwrap();
    assert!(matches!(
        app.pipeline.start(audit.id).await,
        Err(PipelineError::Precondition(PreconditionError::InvalidStatus(
            AuditStatus::Analyzing
        )))
    ));
    assert!(!app.pipeline.is_running(audit.id));
    assert_eq!(app.browser.counters.acquired.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let app = TestApp::new(FakeBrowser::new().with_site(P1, black_text("rgb(0, 0, 0)"))).await;
    let audit = app.create_audit(&[P1], None).await;

    app.pipeline.start(audit.id).await.unwrap();
    assert!(matches!(
        app.pipeline.start(audit.id).await,
        Err(PipelineError::Precondition(PreconditionError::AlreadyRunning))
    ));
    assert!(matches!(
        app.pipeline
            .update_audit(
                audit.id,
                UpdateAuditRequest {
                    name: Some("Renamed".into()),
                    ..Default::default()
                }
            )
            .await,
        Err(PipelineError::Precondition(PreconditionError::AlreadyRunning))
    ));

    let events = drain(app.pipeline.subscribe(audit.id).await.unwrap()).await;
    assert_eq!(events.last().map(|e| e.kind), Some(ProgressEventKind::Complete));
    app.wait_idle(audit.id).await;

    app.pipeline.start(audit.id).await.unwrap();
    drain(app.pipeline.subscribe(audit.id).await.unwrap()).await;
}

#[tokio::test]
async fn test_stop_finalizes_run_without_rollback() {
    let app = TestApp::new(
        FakeBrowser::new()
            .with_site(P1, Site::Hanging)
            .with_site(P2, black_text("rgb(0, 0, 0)")),
    )
    .await;
    let audit = app.create_audit(&[P1, P2], None).await;

    app.pipeline.start(audit.id).await.unwrap();
    let mut subscription = app.pipeline.subscribe(audit.id).await.unwrap();
    let start = subscription.next().await.unwrap();
    assert_eq!(start.kind, ProgressEventKind::Start);

    tokio::time::timeout(Duration::from_secs(5), async {
        while app.pipeline.crawl_jobs(audit.id).await.unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("crawl job never created");

    app.pipeline.stop(audit.id).await.unwrap();
    assert!(!app.pipeline.is_running(audit.id));

    let rest = drain(subscription).await;
    let last = rest.last().expect("no terminal event");
    assert_eq!(last.kind, ProgressEventKind::Complete);
    assert!(last.terminal);
    assert_eq!(last.status, Some(AuditStatus::Crawled));

    let audit = app.pipeline.get_audit(audit.id).await.unwrap();
    assert_eq!(audit.status, AuditStatus::Crawled);

    let jobs = app.pipeline.crawl_jobs(audit.id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, CrawlJobStatus::Error);
    assert_eq!(jobs[0].error.as_deref(), Some("Crawl stopped"));
    assert_eq!(app.browser.closed(), 1);

    // 已停止的审计可以重新启动
    assert!(audit.status.is_startable());
}

#[tokio::test]
async fn test_browser_failure_is_fatal() {
    let app = TestApp::new(FakeBrowser::unavailable()).await;
    let audit = app.create_audit(&[P1], None).await;

    let events = app.run_to_end(audit.id).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ProgressEventKind::Error);
    assert!(events[0].terminal);
    assert!(events[0].message.contains("no browser available"));

    let audit = app.pipeline.get_audit(audit.id).await.unwrap();
    assert_eq!(audit.status, AuditStatus::Error);
    assert!(app.pipeline.crawl_jobs(audit.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_subscribe_without_run_returns_snapshot() {
    let app = TestApp::new(FakeBrowser::new().with_site(P1, black_text("rgb(0, 0, 0)"))).await;
    let audit = app.create_audit(&[P1], None).await;

    let mut subscription = app.pipeline.subscribe(audit.id).await.unwrap();
    assert!(!subscription.is_live());
    let snapshot = subscription.next().await.unwrap();
    assert_eq!(snapshot.kind, ProgressEventKind::Status);
    assert_eq!(snapshot.status, Some(AuditStatus::Draft));
    assert!(snapshot.terminal);
    assert!(subscription.next().await.is_none());

    app.run_to_end(audit.id).await;
    let events = drain(app.pipeline.subscribe(audit.id).await.unwrap()).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, Some(AuditStatus::Complete));
    assert_eq!(events[0].progress, 1.0);

    assert!(matches!(
        app.pipeline.subscribe(Uuid::new_v4()).await,
        Err(PipelineError::Precondition(PreconditionError::AuditNotFound(_)))
    ));
}

#[tokio::test]
async fn test_parent_system_sets_canonical_value() {
    const PARENT: &str = "https://ds.example.com";
    let app = TestApp::new(
        FakeBrowser::new()
            .with_site(PARENT, Site::Styles(vec![sample("color", "color", "rgb(10, 10, 10)", 1)]))
            .with_site(P1, Site::Styles(vec![sample("color", "color", "rgb(0, 0, 0)", 50)]))
            .with_site(P2, Site::Styles(vec![sample("color", "color", "rgb(0, 0, 0)", 50)])),
    )
    .await;
    let audit = app.create_audit(&[P1, P2], Some(PARENT)).await;
    app.run_to_end(audit.id).await;

    let jobs = app.pipeline.crawl_jobs(audit.id).await.unwrap();
    assert_eq!(jobs.first().map(|j| j.url.as_str()), Some(PARENT));

    let matrix = app.pipeline.comparison_matrix(audit.id).await.unwrap();
    let row = matrix.iter().find(|r| r.property == "color").unwrap();
    assert_eq!(row.canonical_value, "rgb(10, 10, 10)");
    assert_eq!(row.products.len(), 3);

    let summary = app.pipeline.token_summary(audit.id).await.unwrap();
    let color = summary
        .layers
        .iter()
        .find(|l| l.layer == Some(TokenLayer::Color))
        .unwrap();
    assert_eq!(color.total, 101);
    assert_eq!(color.unique, 2);
}

#[tokio::test]
async fn test_audit_lifecycle() {
    let app = TestApp::new(FakeBrowser::new().with_site(P1, black_text("rgb(0, 0, 0)"))).await;

    let invalid = app
        .pipeline
        .create_audit(CreateAuditRequest {
            name: "Too many".into(),
            product_urls: (0..7).map(|i| format!("https://p{}.example.com", i)).collect(),
            parent_system_url: None,
            config: None,
        })
        .await;
    assert!(matches!(invalid, Err(PipelineError::Validation(_))));

    let audit = app.create_audit(&[P1], None).await;
    app.run_to_end(audit.id).await;

    let updated = app
        .pipeline
        .update_audit(
            audit.id,
            UpdateAuditRequest {
                name: Some("Renamed audit".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed audit");
    assert_eq!(updated.status, AuditStatus::Draft);

    assert_eq!(app.pipeline.list_audits().await.unwrap().len(), 1);
    app.pipeline.delete_audit(audit.id).await.unwrap();
    assert!(matches!(
        app.pipeline.get_audit(audit.id).await,
        Err(PipelineError::Precondition(PreconditionError::AuditNotFound(_)))
    ));
    assert!(app.repos.extractions.find_tokens_by_audit(audit.id).await.unwrap().is_empty());
}

fn assert_single_fatal_error(events: &[ProgressEvent]) {
    let last = events.last().expect("no events");
    assert_eq!(last.kind, ProgressEventKind::Error);
    assert_eq!(last.status, Some(AuditStatus::Error));
    assert!(last.terminal);
    assert_eq!(events.iter().filter(|e| e.terminal).count(), 1);
    assert!(events.iter().all(|e| e.kind != ProgressEventKind::Complete));
    assert!(last.message.contains("disk I/O error"));
}

#[tokio::test]
async fn test_token_write_failure_fails_only_that_url() {
    let app = TestApp::with_repositories(
        FakeBrowser::new()
            .with_site(P1, black_text("rgb(0, 0, 0)"))
            .with_site(P2, black_text("rgb(10, 10, 10)"))
            .with_site(P3, black_text("rgb(0, 0, 0)")),
        |repos| RepositorySet {
            extractions: FailingExtractions::wrap(
                repos.extractions.clone(),
                ExtractionFault::InsertTokensFor(P2.to_string()),
            ),
            ..repos
        },
    )
    .await;
    let audit = app.create_audit(&[P1, P2, P3], None).await;

    let events = app.run_to_end(audit.id).await;

    let last = events.last().expect("no events");
    assert_eq!(last.kind, ProgressEventKind::Complete);
    assert_eq!(last.status, Some(AuditStatus::Complete));

    let errors: Vec<_> = events
        .iter()
        .filter(|e| e.kind == ProgressEventKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].url.as_deref(), Some(P2));
    assert!(!errors[0].terminal);

    let jobs = app.pipeline.crawl_jobs(audit.id).await.unwrap();
    let statuses: Vec<_> = jobs.iter().map(|j| j.status).collect();
    assert_eq!(
        statuses,
        vec![
            CrawlJobStatus::Complete,
            CrawlJobStatus::Error,
            CrawlJobStatus::Complete
        ]
    );
    assert!(jobs[1].error.as_deref().unwrap_or_default().contains("disk I/O error"));

    let tokens = app.repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    assert!(!tokens.is_empty());
    assert!(tokens.iter().all(|t| t.source_product != P2));

    assert_eq!(app.browser.open_contexts(), 0);
    assert_eq!(app.browser.closed(), 1);
}

#[tokio::test]
async fn test_comparison_write_failure_is_fatal() {
    let app = TestApp::with_repositories(
        FakeBrowser::new()
            .with_site(P1, black_text("rgb(0, 0, 0)"))
            .with_site(P2, black_text("rgb(10, 10, 10)")),
        |repos| RepositorySet {
            comparisons: FailingComparisons::wrap(repos.comparisons.clone()),
            ..repos
        },
    )
    .await;
    let audit = app.create_audit(&[P1, P2], None).await;

    let events = app.run_to_end(audit.id).await;
    assert_single_fatal_error(&events);

    let audit = app.pipeline.get_audit(audit.id).await.unwrap();
    assert_eq!(audit.status, AuditStatus::Error);

    // 已提取的数据不回滚
    let jobs = app.pipeline.crawl_jobs(audit.id).await.unwrap();
    assert!(jobs.iter().all(|j| j.status == CrawlJobStatus::Complete));
    let tokens = app.repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    assert!(tokens.iter().any(|t| t.source_product == P1));
    assert!(tokens.iter().any(|t| t.source_product == P2));
    assert!(app.repos.comparisons.find_by_audit(audit.id).await.unwrap().is_empty());
    assert_eq!(app.browser.closed(), 1);
}

#[tokio::test]
async fn test_classification_write_failure_is_fatal() {
    let app = TestApp::with_repositories(
        FakeBrowser::new()
            .with_site(P1, black_text("rgb(0, 0, 0)"))
            .with_site(P2, black_text("rgb(10, 10, 10)")),
        |repos| RepositorySet {
            extractions: FailingExtractions::wrap(
                repos.extractions.clone(),
                ExtractionFault::ApplyTokenClassification,
            ),
            ..repos
        },
    )
    .await;
    let audit = app.create_audit(&[P1, P2], None).await;

    let events = app.run_to_end(audit.id).await;
    assert_single_fatal_error(&events);

    let audit = app.pipeline.get_audit(audit.id).await.unwrap();
    assert_eq!(audit.status, AuditStatus::Error);

    // 比较结果已写入，令牌保持未分类
    assert!(!app.repos.comparisons.find_by_audit(audit.id).await.unwrap().is_empty());
    let tokens = app.repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    assert!(!tokens.is_empty());
    assert!(tokens
        .iter()
        .all(|t| t.classification == Classification::Unclassified));
}
