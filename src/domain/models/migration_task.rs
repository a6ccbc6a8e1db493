// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::comparison::EntityType;
use crate::domain::models::token::Classification;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 迁移任务
///
/// 派生数据，每次生成路线图时整体替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationTask {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub title: String,
    pub description: String,
    pub entity_type: EntityType,
    pub entity_ids: Vec<Uuid>,
    pub source_product: String,
    pub classification: Classification,
    pub effort_estimate: Effort,
    pub priority: Priority,
    /// 1 = inherit, 2 = adapt, 3 = extend
    pub phase: i32,
    pub status: MigrationTaskStatus,
}

/// 工作量估算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Xs,
    Sm,
    Md,
    Lg,
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Effort::Xs => write!(f, "xs"),
            Effort::Sm => write!(f, "sm"),
            Effort::Md => write!(f, "md"),
            Effort::Lg => write!(f, "lg"),
        }
    }
}

impl FromStr for Effort {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xs" => Ok(Effort::Xs),
            "sm" => Ok(Effort::Sm),
            "md" => Ok(Effort::Md),
            "lg" => Ok(Effort::Lg),
            _ => Err(()),
        }
    }
}

/// 任务优先级，排序时 critical 在前
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// 按令牌总频次推导优先级
    pub fn from_frequency(total: i64) -> Self {
        if total >= 50 {
            Priority::Critical
        } else if total >= 20 {
            Priority::High
        } else if total >= 5 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(()),
        }
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MigrationTaskStatus {
    #[default]
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl fmt::Display for MigrationTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MigrationTaskStatus::Todo => write!(f, "todo"),
            MigrationTaskStatus::InProgress => write!(f, "in-progress"),
            MigrationTaskStatus::Done => write!(f, "done"),
        }
    }
}

impl FromStr for MigrationTaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(MigrationTaskStatus::Todo),
            "in-progress" => Ok(MigrationTaskStatus::InProgress),
            "done" => Ok(MigrationTaskStatus::Done),
            _ => Err(()),
        }
    }
}
