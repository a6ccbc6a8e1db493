// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::test_settings;
use design_auditor::domain::models::audit::{Audit, AuditConfig, AuditStatus};
use design_auditor::domain::models::comparison::{ComparisonResult, EntityType};
use design_auditor::domain::models::crawl_job::{CrawlJob, CrawlJobStatus};
use design_auditor::domain::models::token::{Classification, ExtractedToken, TokenLayer};
use design_auditor::domain::repositories::RepositorySet;
use design_auditor::infrastructure::database::connection;
use design_auditor::infrastructure::repositories::build_repository_set;
use design_auditor::utils::errors::RepositoryError;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

async fn repos() -> RepositorySet {
    let settings = test_settings();
    let db = connection::connect_and_migrate(&settings.database)
        .await
        .expect("Failed to prepare in-memory database");
    build_repository_set(Arc::new(db), 2)
}

async fn seeded_audit(repos: &RepositorySet) -> Audit {
    let audit = Audit::new(
        "Repo audit".into(),
        vec!["https://a.example.com".into()],
        None,
        AuditConfig::default(),
    );
    repos.audits.create(&audit).await.unwrap()
}

fn token(audit_id: Uuid, property: &str, value: &str) -> ExtractedToken {
    ExtractedToken {
        id: Uuid::new_v4(),
        audit_id,
        crawled_page_id: None,
        source_product: "https://a.example.com".into(),
        layer: TokenLayer::Spacing,
        property: property.into(),
        computed_value: value.into(),
        raw_value: Some("var(--space-4)".into()),
        css_variable: Some("--space-4".into()),
        selector: "section".into(),
        frequency: 3,
        classification: Classification::Unclassified,
        classification_confidence: 0.0,
        classification_overridden: false,
    }
}

#[tokio::test]
async fn test_audit_round_trip_keeps_config() {
    let repos = repos().await;
    let mut audit = seeded_audit(&repos).await;

    let loaded = repos.audits.find_by_id(audit.id).await.unwrap().unwrap();
    assert_eq!(loaded.config, AuditConfig::default());
    assert_eq!(loaded.product_urls, audit.product_urls);

    audit.parent_system_url = Some("https://ds.example.com".into());
    repos.audits.update(&audit).await.unwrap();
    repos
        .audits
        .update_status(audit.id, AuditStatus::Crawled)
        .await
        .unwrap();

    let loaded = repos.audits.find_by_id(audit.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, AuditStatus::Crawled);
    assert_eq!(loaded.parent_system_url.as_deref(), Some("https://ds.example.com"));

    assert!(matches!(
        repos
            .audits
            .update_status(Uuid::new_v4(), AuditStatus::Error)
            .await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_crawl_job_is_finalized_once() {
    let repos = repos().await;
    let audit = seeded_audit(&repos).await;

    let job = repos
        .crawl_jobs
        .create(&CrawlJob::start(audit.id, "https://a.example.com".into()))
        .await
        .unwrap();
    repos.crawl_jobs.mark_completed(job.id, 1).await.unwrap();

    assert!(matches!(
        repos.crawl_jobs.mark_failed(job.id, "late failure").await,
        Err(RepositoryError::NotFound)
    ));

    let jobs = repos.crawl_jobs.find_by_audit(audit.id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, CrawlJobStatus::Complete);
    assert_eq!(jobs[0].page_count, 1);
    assert_eq!(jobs[0].progress, 1.0);
    assert!(jobs[0].error.is_none());
}

#[tokio::test]
async fn test_token_batches_keep_insertion_order() {
    let repos = repos().await;
    let audit = seeded_audit(&repos).await;

    let tokens: Vec<_> = (0..5)
        .map(|i| token(audit.id, "paddingTop", &format!("{}px", i * 4 + 4)))
        .collect();
    assert_eq!(repos.extractions.insert_tokens(&tokens).await.unwrap(), 5);
    assert_eq!(repos.extractions.insert_tokens(&[]).await.unwrap(), 0);

    let loaded = repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    let values: Vec<_> = loaded.iter().map(|t| t.computed_value.as_str()).collect();
    assert_eq!(values, vec!["4px", "8px", "12px", "16px", "20px"]);
    assert_eq!(loaded[0].css_variable.as_deref(), Some("--space-4"));
}

#[tokio::test]
async fn test_automatic_classification_skips_overridden_tokens() {
    let repos = repos().await;
    let audit = seeded_audit(&repos).await;

    let tokens = vec![
        token(audit.id, "paddingTop", "16px"),
        token(audit.id, "paddingTop", "18px"),
    ];
    repos.extractions.insert_tokens(&tokens).await.unwrap();

    let overridden = repos
        .extractions
        .override_token_classification(&[tokens[0].id], Classification::Adapt)
        .await
        .unwrap();
    assert_eq!(overridden, 1);

    let applied = repos
        .extractions
        .apply_token_classification(
            audit.id,
            TokenLayer::Spacing,
            "paddingTop",
            Classification::Inherit,
            0.6,
        )
        .await
        .unwrap();
    assert_eq!(applied, 1);

    let loaded = repos.extractions.find_tokens_by_audit(audit.id).await.unwrap();
    assert_eq!(loaded[0].classification, Classification::Adapt);
    assert_eq!(loaded[0].classification_confidence, 1.0);
    assert_eq!(loaded[1].classification, Classification::Inherit);
    assert_eq!(loaded[1].classification_confidence, 0.6);
}

#[tokio::test]
async fn test_comparison_replace_is_idempotent() {
    let repos = repos().await;
    let audit = seeded_audit(&repos).await;

    let results = |property: &str| ComparisonResult {
        id: Uuid::new_v4(),
        audit_id: audit.id,
        entity_type: EntityType::Token(TokenLayer::Color),
        entity_property: property.into(),
        canonical_value: "rgb(0, 0, 0)".into(),
        product_values: BTreeMap::from([(
            "https://a.example.com".to_string(),
            "rgb(0, 0, 0)".to_string(),
        )]),
        divergence_score: 0.0,
        classification: Classification::Unclassified,
    };

    let batch = vec![results("color"), results("backgroundColor"), results("borderColor")];
    repos.comparisons.replace_for_audit(audit.id, &batch).await.unwrap();

    let rerun = vec![results("color"), results("backgroundColor")];
    repos.comparisons.replace_for_audit(audit.id, &rerun).await.unwrap();

    let stored = repos.comparisons.find_by_audit(audit.id).await.unwrap();
    let properties: Vec<_> = stored.iter().map(|r| r.entity_property.as_str()).collect();
    assert_eq!(properties, vec!["backgroundColor", "color"]);

    repos
        .comparisons
        .update_classification(stored[0].id, Classification::Inherit)
        .await
        .unwrap();
    let stored = repos.comparisons.find_by_audit(audit.id).await.unwrap();
    assert_eq!(stored[0].classification, Classification::Inherit);
}
