// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 令牌层级
///
/// 追踪的七类样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLayer {
    Color,
    Typography,
    Spacing,
    Elevation,
    Border,
    Motion,
    Opacity,
}

impl TokenLayer {
    pub const ALL: [TokenLayer; 7] = [
        TokenLayer::Color,
        TokenLayer::Typography,
        TokenLayer::Spacing,
        TokenLayer::Elevation,
        TokenLayer::Border,
        TokenLayer::Motion,
        TokenLayer::Opacity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenLayer::Color => "color",
            TokenLayer::Typography => "typography",
            TokenLayer::Spacing => "spacing",
            TokenLayer::Elevation => "elevation",
            TokenLayer::Border => "border",
            TokenLayer::Motion => "motion",
            TokenLayer::Opacity => "opacity",
        }
    }
}

impl fmt::Display for TokenLayer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenLayer {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenLayer::ALL
            .iter()
            .copied()
            .find(|layer| layer.as_str() == s)
            .ok_or(())
    }
}

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// 尚未分类
    #[default]
    Unclassified,
    /// 与设计系统一致，直接继承
    Inherit,
    /// 接近但有改动
    Adapt,
    /// 设计系统中没有对应值
    Extend,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Classification::Unclassified => write!(f, "unclassified"),
            Classification::Inherit => write!(f, "inherit"),
            Classification::Adapt => write!(f, "adapt"),
            Classification::Extend => write!(f, "extend"),
        }
    }
}

impl FromStr for Classification {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unclassified" => Ok(Classification::Unclassified),
            "inherit" => Ok(Classification::Inherit),
            "adapt" => Ok(Classification::Adapt),
            "extend" => Ok(Classification::Extend),
            _ => Err(()),
        }
    }
}

/// 提取的样式令牌
///
/// 同一页面内以 (layer, property, computed_value) 去重，重复出现只累加频次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedToken {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub crawled_page_id: Option<Uuid>,
    /// 来源产品URL（已补全协议）
    pub source_product: String,
    pub layer: TokenLayer,
    pub property: String,
    pub computed_value: String,
    pub raw_value: Option<String>,
    pub css_variable: Option<String>,
    pub selector: String,
    pub frequency: i32,
    pub classification: Classification,
    pub classification_confidence: f64,
    /// 人工覆盖的分类不会被自动分类修改
    pub classification_overridden: bool,
}

/// 提取的组件（按ARIA角色或语义元素聚合）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedComponent {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub source_product: String,
    pub name: String,
    pub selector: String,
    pub variants: Vec<String>,
    pub states: Vec<String>,
    /// 第一个匹配元素的HTML快照（截断）
    pub html_snapshot: Option<String>,
    pub frequency: i32,
    pub classification: Classification,
    pub classification_confidence: f64,
    pub classification_overridden: bool,
}

/// 提取的交互模式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPattern {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub source_product: String,
    pub category: String,
    pub name: String,
    pub component_selectors: Vec<String>,
    pub frequency: i32,
    pub classification: Classification,
    pub classification_confidence: f64,
    pub classification_overridden: bool,
}

impl ExtractedPattern {
    /// 比较结果中使用的键，`category::name`
    pub fn key(&self) -> String {
        format!("{}::{}", self.category, self.name)
    }
}

/// 单个层级的令牌统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub layer: Option<TokenLayer>,
    /// 令牌实例总数（频次之和）
    pub total: i64,
    /// 不同取值的个数
    pub unique: usize,
    pub inherit: usize,
    pub adapt: usize,
    pub extend: usize,
    pub unclassified: usize,
}

/// 审计的令牌统计，按层级排列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub layers: Vec<LayerSummary>,
}

impl TokenSummary {
    pub fn from_tokens(tokens: &[ExtractedToken]) -> Self {
        let layers = TokenLayer::ALL
            .iter()
            .map(|layer| {
                let mut summary = LayerSummary {
                    layer: Some(*layer),
                    ..Default::default()
                };
                let mut seen = std::collections::HashSet::new();
                for token in tokens.iter().filter(|t| t.layer == *layer) {
                    summary.total += i64::from(token.frequency);
                    seen.insert((token.property.as_str(), token.computed_value.as_str()));
                    match token.classification {
                        Classification::Inherit => summary.inherit += 1,
                        Classification::Adapt => summary.adapt += 1,
                        Classification::Extend => summary.extend += 1,
                        Classification::Unclassified => summary.unclassified += 1,
                    }
                }
                summary.unique = seen.len();
                summary
            })
            .collect();
        Self { layers }
    }
}
