// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 审计流水线控制面和请求DTO
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 页面自动化能力、chromiumoxide适配器和页面内提取脚本
pub mod engines;

/// 基础设施模块
///
/// 数据库、仓库实现和指标
pub mod infrastructure;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 爬取编排、进度广播和运行注册表
pub mod workers;
