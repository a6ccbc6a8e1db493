// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

pub const AUDIT_RUNS_STARTED: &str = "audit_runs_started_total";
pub const AUDIT_RUNS_FAILED: &str = "audit_runs_failed_total";
pub const CRAWL_JOBS_COMPLETED: &str = "crawl_jobs_completed_total";
pub const CRAWL_JOBS_FAILED: &str = "crawl_jobs_failed_total";
pub const TOKENS_EXTRACTED: &str = "tokens_extracted_total";
pub const CRAWL_JOB_DURATION: &str = "crawl_job_duration_seconds";

/// 安装Prometheus导出器；未启用时只登记指标说明
pub fn init_metrics(settings: &MetricsSettings) {
    describe_metrics();

    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    // 端口被占用时只记录警告
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(AUDIT_RUNS_STARTED, "Number of audit pipeline runs started");
    describe_counter!(AUDIT_RUNS_FAILED, "Number of audit pipeline runs that ended in error");
    describe_counter!(CRAWL_JOBS_COMPLETED, "Number of URLs crawled successfully");
    describe_counter!(CRAWL_JOBS_FAILED, "Number of URLs whose crawl failed");
    describe_counter!(TOKENS_EXTRACTED, "Number of design tokens persisted");
    describe_histogram!(CRAWL_JOB_DURATION, "Time spent crawling and extracting one URL");
}

pub fn record_run_started() {
    counter!(AUDIT_RUNS_STARTED).increment(1);
}

pub fn record_run_failed() {
    counter!(AUDIT_RUNS_FAILED).increment(1);
}

pub fn record_job_completed(duration: Duration, tokens: usize) {
    counter!(CRAWL_JOBS_COMPLETED).increment(1);
    counter!(TOKENS_EXTRACTED).increment(tokens as u64);
    histogram!(CRAWL_JOB_DURATION).record(duration.as_secs_f64());
}

pub fn record_job_failed(duration: Duration) {
    counter!(CRAWL_JOBS_FAILED).increment(1);
    histogram!(CRAWL_JOB_DURATION).record(duration.as_secs_f64());
}
