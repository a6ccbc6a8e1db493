// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::token::{Classification, TokenLayer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 比较对象的类型
///
/// 令牌结果的类型就是它的层级；组件和模式各有独立类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Token(TokenLayer),
    Component,
    Pattern,
}

impl EntityType {
    pub fn layer(&self) -> Option<TokenLayer> {
        match self {
            EntityType::Token(layer) => Some(*layer),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityType::Token(layer) => write!(f, "{}", layer),
            EntityType::Component => write!(f, "component"),
            EntityType::Pattern => write!(f, "pattern"),
        }
    }
}

impl FromStr for EntityType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "component" => Ok(EntityType::Component),
            "pattern" => Ok(EntityType::Pattern),
            other => other.parse::<TokenLayer>().map(EntityType::Token),
        }
    }
}

/// 比较结果
///
/// 每个 (entity_type, entity_property) 分组一条，每次比较全部重建
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub entity_type: EntityType,
    pub entity_property: String,
    pub canonical_value: String,
    /// 产品URL → 该产品的代表值
    pub product_values: BTreeMap<String, String>,
    /// 各产品中最大的偏离度，0..=1
    pub divergence_score: f64,
    pub classification: Classification,
}

/// 比较矩阵中单个产品的单元格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub value: String,
    pub divergence: f64,
    pub classification: Classification,
}

/// 比较矩阵的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub layer: String,
    pub property: String,
    pub canonical_value: String,
    pub products: BTreeMap<String, MatrixCell>,
    pub max_divergence: f64,
}
