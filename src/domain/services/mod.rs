// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 感知距离（similarity）：颜色、数值和字体族的距离函数
/// - 比较服务（comparator）：规范值选择与偏离度计算
/// - 分类服务（classifier）：按阈值分类并支持人工覆盖
/// - 路线图服务（roadmap）：生成分阶段的迁移任务
pub mod classifier;
pub mod comparator;
pub mod roadmap;
pub mod similarity;
