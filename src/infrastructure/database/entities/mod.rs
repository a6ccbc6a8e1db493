// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库实体模块
///
/// 定义数据库表对应的实体结构
/// 使用SeaORM框架进行对象关系映射
/// 枚举列以字符串存储，列表和映射列以JSON存储
pub mod audit;
pub mod comparison_result;
pub mod crawl_job;
pub mod crawled_page;
pub mod extracted_component;
pub mod extracted_pattern;
pub mod extracted_token;
pub mod migration_task;
