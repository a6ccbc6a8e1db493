// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::token::{
    Classification, ExtractedComponent, ExtractedPattern, ExtractedToken, TokenLayer,
};
use crate::engines::traits::{EngineError, PageContext};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use indexmap::IndexMap;
use tracing::{debug, warn};
use uuid::Uuid;

const TOKEN_SCRIPT: &str = include_str!("scripts/tokens.js");
const COMPONENT_SCRIPT: &str = include_str!("scripts/components.js");
const PATTERN_SCRIPT: &str = include_str!("scripts/patterns.js");

/// 页面内扫描得到的一条样式样本（已在页面内按取值聚合）
#[derive(Debug, Clone, Deserialize)]
struct TokenSample {
    layer: String,
    property: String,
    value: String,
    selector: String,
    count: i32,
}

/// 同源样式表中声明的CSS自定义属性
#[derive(Debug, Clone, Deserialize)]
pub struct CssVariable {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct TokenScan {
    samples: Vec<TokenSample>,
    #[serde(default)]
    variables: Vec<CssVariable>,
}

/// 单页提取出的令牌，尚未关联审计
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub layer: TokenLayer,
    pub property: String,
    pub computed_value: String,
    pub raw_value: Option<String>,
    pub css_variable: Option<String>,
    pub selector: String,
    pub frequency: i32,
}

impl RawToken {
    pub fn into_token(
        self,
        audit_id: Uuid,
        page_id: Option<Uuid>,
        product: &str,
    ) -> ExtractedToken {
        ExtractedToken {
            id: Uuid::new_v4(),
            audit_id,
            crawled_page_id: page_id,
            source_product: product.to_string(),
            layer: self.layer,
            property: self.property,
            computed_value: self.computed_value,
            raw_value: self.raw_value,
            css_variable: self.css_variable,
            selector: self.selector,
            frequency: self.frequency,
            classification: Classification::Unclassified,
            classification_confidence: 0.0,
            classification_overridden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComponent {
    pub name: String,
    pub selector: String,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub states: Vec<String>,
    pub html_snapshot: Option<String>,
    pub frequency: i32,
}

impl RawComponent {
    pub fn into_component(self, audit_id: Uuid, product: &str) -> ExtractedComponent {
        ExtractedComponent {
            id: Uuid::new_v4(),
            audit_id,
            source_product: product.to_string(),
            name: self.name,
            selector: self.selector,
            variants: self.variants,
            states: self.states,
            html_snapshot: self.html_snapshot,
            frequency: self.frequency,
            classification: Classification::Unclassified,
            classification_confidence: 0.0,
            classification_overridden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPattern {
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub component_selectors: Vec<String>,
    pub frequency: i32,
}

impl RawPattern {
    pub fn into_pattern(self, audit_id: Uuid, product: &str) -> ExtractedPattern {
        ExtractedPattern {
            id: Uuid::new_v4(),
            audit_id,
            source_product: product.to_string(),
            category: self.category,
            name: self.name,
            component_selectors: self.component_selectors,
            frequency: self.frequency,
            classification: Classification::Unclassified,
            classification_confidence: 0.0,
            classification_overridden: false,
        }
    }
}

/// 单页的完整提取结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageExtraction {
    pub tokens: Vec<RawToken>,
    pub components: Vec<RawComponent>,
    pub patterns: Vec<RawPattern>,
}

/// 该值是否表示“没有令牌”而非“令牌取默认值”
pub fn is_noise(layer: TokenLayer, property: &str, value: &str) -> bool {
    if value.is_empty() || value == "none" || value == "normal" {
        return true;
    }
    if value == "auto" && !matches!(property, "gap" | "margin" | "padding") {
        return true;
    }
    match layer {
        TokenLayer::Spacing => value == "0px",
        TokenLayer::Color => value == "rgba(0, 0, 0, 0)" || value == "transparent",
        TokenLayer::Border => {
            (property == "borderWidth" && value == "0px")
                || (property == "borderStyle" && value == "none")
        }
        TokenLayer::Opacity => value == "1",
        TokenLayer::Motion => value == "0s" || value == "0ms",
        TokenLayer::Typography | TokenLayer::Elevation => false,
    }
}

/// 按 (layer, property, computed_value) 去重累加频次，保留首次出现的选择器和顺序
#[derive(Debug, Default)]
pub struct TokenAccumulator {
    tokens: IndexMap<(TokenLayer, String, String), RawToken>,
}

impl TokenAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次观测；噪声值被丢弃
    pub fn add(
        &mut self,
        layer: TokenLayer,
        property: &str,
        value: &str,
        selector: &str,
        count: i32,
    ) {
        if is_noise(layer, property, value) {
            return;
        }
        self.tokens
            .entry((layer, property.to_string(), value.to_string()))
            .and_modify(|token| token.frequency += count)
            .or_insert_with(|| RawToken {
                layer,
                property: property.to_string(),
                computed_value: value.to_string(),
                raw_value: None,
                css_variable: None,
                selector: selector.to_string(),
                frequency: count,
            });
    }

    /// 将CSS变量关联到取值相同或包含该变量值的令牌
    ///
    /// 每个令牌只关联第一个匹配的变量
    pub fn bind_variables(&mut self, variables: &[CssVariable]) {
        for variable in variables {
            if variable.value.is_empty() {
                continue;
            }
            for token in self.tokens.values_mut().filter(|t| t.css_variable.is_none()) {
                if token.computed_value.contains(variable.value.as_str()) {
                    token.css_variable = Some(variable.name.clone());
                    token.raw_value = Some(format!("var({})", variable.name));
                }
            }
        }
    }

    pub fn into_tokens(self) -> Vec<RawToken> {
        self.tokens.into_values().collect()
    }
}

/// 页面提取器
///
/// 三个提取过程彼此独立；任一过程脚本失败只会得到空结果
pub struct PageExtractor {
    max_elements: usize,
}

impl PageExtractor {
    pub fn new(max_elements: usize) -> Self {
        Self { max_elements }
    }

    pub async fn extract(&self, page: &dyn PageContext) -> PageExtraction {
        PageExtraction {
            tokens: self.extract_tokens(page).await,
            components: self.extract_components(page).await,
            patterns: self.extract_patterns(page).await,
        }
    }

    pub async fn extract_tokens(&self, page: &dyn PageContext) -> Vec<RawToken> {
        let script = TOKEN_SCRIPT.replace("__MAX_ELEMENTS__", &self.max_elements.to_string());
        let Some(scan) = run_script::<TokenScan>(page, &script, "tokens").await else {
            return Vec::new();
        };

        let mut accumulator = TokenAccumulator::new();
        for sample in &scan.samples {
            let Ok(layer) = sample.layer.parse::<TokenLayer>() else {
                continue;
            };
            accumulator.add(layer, &sample.property, &sample.value, &sample.selector, sample.count);
        }
        accumulator.bind_variables(&scan.variables);

        let tokens = accumulator.into_tokens();
        debug!(
            tokens = tokens.len(),
            variables = scan.variables.len(),
            "Token extraction finished"
        );
        tokens
    }

    /// 组件按名称聚合
    pub async fn extract_components(&self, page: &dyn PageContext) -> Vec<RawComponent> {
        let raw = run_script::<Vec<RawComponent>>(page, COMPONENT_SCRIPT, "components")
            .await
            .unwrap_or_default();

        let mut merged: IndexMap<String, RawComponent> = IndexMap::new();
        for component in raw {
            let frequency = component.frequency;
            merged
                .entry(component.name.clone())
                .and_modify(|existing| existing.frequency += frequency)
                .or_insert(component);
        }
        merged.into_values().collect()
    }

    /// 模式按 (category, name) 聚合
    pub async fn extract_patterns(&self, page: &dyn PageContext) -> Vec<RawPattern> {
        let raw = run_script::<Vec<RawPattern>>(page, PATTERN_SCRIPT, "patterns")
            .await
            .unwrap_or_default();

        let mut merged: IndexMap<(String, String), RawPattern> = IndexMap::new();
        for pattern in raw {
            let frequency = pattern.frequency;
            merged
                .entry((pattern.category.clone(), pattern.name.clone()))
                .and_modify(|existing| existing.frequency += frequency)
                .or_insert(pattern);
        }
        merged.into_values().collect()
    }
}

async fn run_script<T: DeserializeOwned>(
    page: &dyn PageContext,
    script: &str,
    kind: &str,
) -> Option<T> {
    let result = page.evaluate(script).await.and_then(|value| {
        serde_json::from_value::<T>(value).map_err(|e| EngineError::Script(e.to_string()))
    });
    match result {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(kind, error = %e, "Extraction script failed, returning empty result");
            None
        }
    }
}
