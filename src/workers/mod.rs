// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供审计运行的后台执行：爬取编排、进度广播和运行注册表
pub mod crawl_orchestrator;
pub mod progress;
pub mod registry;

pub use crawl_orchestrator::CrawlOrchestrator;
