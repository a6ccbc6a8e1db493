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

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use design_auditor::application::dto::audit_request::{
    CreateAuditRequest, OverrideClassificationRequest,
};
use design_auditor::application::use_cases::audit_pipeline::AuditPipeline;
use design_auditor::config::settings::Settings;
use design_auditor::domain::models::token::Classification;
use design_auditor::engines::chromium::ChromiumProvider;
use design_auditor::infrastructure::database::connection;
use design_auditor::infrastructure::metrics;
use design_auditor::infrastructure::repositories::build_repository_set;
use design_auditor::utils::telemetry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "design-auditor")]
#[command(about = "Audit design-system adoption across product sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new audit
    Create {
        name: String,
        /// Product URL (repeat up to 6 times)
        #[arg(long = "product", required = true)]
        products: Vec<String>,
        /// Parent design-system URL
        #[arg(long)]
        parent: Option<String>,
    },

    /// List audits
    List,

    /// Crawl, compare and classify an audit, printing progress events
    Crawl { audit_id: Uuid },

    /// Show an audit with its crawl jobs and token summary
    Status { audit_id: Uuid },

    /// Show the migration roadmap
    Roadmap {
        audit_id: Uuid,
        /// Regenerate the roadmap from current classifications first
        #[arg(long)]
        regenerate: bool,
    },

    /// Manually classify tokens (inherit, adapt or extend)
    Override {
        #[arg(long)]
        classification: String,
        token_ids: Vec<Uuid>,
    },

    /// Show the comparison matrix
    Matrix { audit_id: Uuid },
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 主函数
///
/// 初始化配置、日志、指标和数据库后执行子命令
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load configuration")?;
    telemetry::init_telemetry(&settings.log);
    metrics::init_metrics(&settings.metrics);

    let db = Arc::new(
        connection::connect_and_migrate(&settings.database)
            .await
            .context("Failed to prepare database")?,
    );
    let repos = build_repository_set(Arc::clone(&db), settings.crawl.insert_batch_size);
    let browser = Arc::new(ChromiumProvider::new(settings.browser.clone()));
    let pipeline = AuditPipeline::new(repos, browser, &settings);

    match cli.command {
        Commands::Create {
            name,
            products,
            parent,
        } => {
            let audit = pipeline
                .create_audit(CreateAuditRequest {
                    name,
                    product_urls: products,
                    parent_system_url: parent,
                    config: None,
                })
                .await?;
            output(&audit)?;
        }
        Commands::List => output(&pipeline.list_audits().await?)?,
        Commands::Crawl { audit_id } => crawl(&pipeline, audit_id).await?,
        Commands::Status { audit_id } => {
            let audit = pipeline.get_audit(audit_id).await?;
            let jobs = pipeline.crawl_jobs(audit_id).await?;
            let summary = pipeline.token_summary(audit_id).await?;
            output(&serde_json::json!({
                "audit": audit,
                "crawlJobs": jobs,
                "tokenSummary": summary,
            }))?;
        }
        Commands::Roadmap {
            audit_id,
            regenerate,
        } => {
            let tasks = if regenerate {
                pipeline.generate_roadmap(audit_id).await?
            } else {
                pipeline.get_roadmap(audit_id).await?
            };
            output(&tasks)?;
        }
        Commands::Override {
            classification,
            token_ids,
        } => {
            let classification: Classification = classification
                .parse()
                .map_err(|_| anyhow!("Unknown classification: {}", classification))?;
            let updated = pipeline
                .override_classification(OverrideClassificationRequest {
                    token_ids,
                    classification,
                })
                .await?;
            info!(updated, "Tokens overridden");
            output(&serde_json::json!({ "updated": updated }))?;
        }
        Commands::Matrix { audit_id } => output(&pipeline.comparison_matrix(audit_id).await?)?,
    }

    Ok(())
}

/// 启动运行并输出进度，直到终止事件；Ctrl-C 停止运行
async fn crawl(pipeline: &AuditPipeline, audit_id: Uuid) -> Result<()> {
    pipeline.start(audit_id).await?;
    let mut subscription = pipeline.subscribe(audit_id).await?;

    loop {
        tokio::select! {
            event = subscription.next() => match event {
                Some(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if event.terminal {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping crawl");
                pipeline.stop(audit_id).await?;
                break;
            }
        }
    }

    let audit = pipeline.get_audit(audit_id).await?;
    info!(status = %audit.status, "Crawl finished");
    Ok(())
}
