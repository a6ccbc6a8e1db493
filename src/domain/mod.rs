// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：审计、令牌、比较结果等实体
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：感知距离、比较、分类与路线图生成
///
/// 领域层不依赖于任何外部实现。
pub mod models;
pub mod repositories;
pub mod services;
