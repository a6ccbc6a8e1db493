// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 审计（audit）：一次设计系统审计及其配置
/// - 爬取作业（crawl_job）：每个URL的一次爬取尝试与已爬取页面
/// - 令牌（token）：提取出的样式令牌、组件和模式
/// - 比较结果（comparison）：按分组计算出的规范值与偏离度
/// - 迁移任务（migration_task）：路线图中的任务
/// - 进度事件（progress）：运行期间广播的事件
pub mod audit;
pub mod comparison;
pub mod crawl_job;
pub mod migration_task;
pub mod progress;
pub mod token;
