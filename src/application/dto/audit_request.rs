// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::audit::AuditConfig;
use crate::domain::models::token::Classification;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 6), custom(function = "validate_urls"))]
    pub product_urls: Vec<String>,
    #[validate(custom(function = "validate_url"))]
    pub parent_system_url: Option<String>,
    pub config: Option<AuditConfig>,
}

/// 编辑审计；任何字段被修改都会把状态重置为 draft
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuditRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 6), custom(function = "validate_urls"))]
    pub product_urls: Option<Vec<String>>,
    /// `Some("")` 清除父级系统URL
    pub parent_system_url: Option<String>,
    pub config: Option<AuditConfig>,
}

impl UpdateAuditRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.product_urls.is_none()
            && self.parent_system_url.is_none()
            && self.config.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OverrideClassificationRequest {
    pub token_ids: Vec<Uuid>,
    #[validate(custom(function = "validate_override_target"))]
    pub classification: Classification,
}

fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::new("empty_url"));
    }
    Ok(())
}

fn validate_urls(urls: &[String]) -> Result<(), ValidationError> {
    urls.iter().try_for_each(|url| validate_url(url))
}

fn validate_override_target(classification: &Classification) -> Result<(), ValidationError> {
    if *classification == Classification::Unclassified {
        return Err(ValidationError::new("unclassified_override"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(urls: Vec<&str>) -> CreateAuditRequest {
        CreateAuditRequest {
            name: "Q3 audit".into(),
            product_urls: urls.into_iter().map(String::from).collect(),
            parent_system_url: None,
            config: None,
        }
    }

    #[test]
    fn test_product_url_count_is_bounded() {
        assert!(request(vec!["a.example.com"]).validate().is_ok());
        assert!(request(vec![]).validate().is_err());
        assert!(request(vec!["a.com"; 7]).validate().is_err());
    }

    #[test]
    fn test_blank_urls_are_rejected() {
        assert!(request(vec!["a.example.com", "  "]).validate().is_err());

        let mut with_parent = request(vec!["a.example.com"]);
        with_parent.parent_system_url = Some(String::new());
        assert!(with_parent.validate().is_err());
    }

    #[test]
    fn test_override_to_unclassified_is_rejected() {
        let dto = OverrideClassificationRequest {
            token_ids: vec![Uuid::new_v4()],
            classification: Classification::Unclassified,
        };
        assert!(dto.validate().is_err());
    }
}
