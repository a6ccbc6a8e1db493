// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

/// 为缺少协议的URL补全 `https://`
///
/// 已带 `http://` 或 `https://`（不区分大小写）的URL原样返回
pub fn ensure_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// 从产品URL中提取可读标签（去掉 `www.` 的主机名）
///
/// 无法解析时返回原始字符串
pub fn product_label(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => host.replacen("www.", "", 1),
            None => raw.to_string(),
        },
        Err(_) => raw.to_string(),
    }
}
