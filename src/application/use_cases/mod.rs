// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// 审计流水线的控制面：审计管理、运行控制、进度订阅和各读模型
pub mod audit_pipeline;
