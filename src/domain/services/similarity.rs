// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 感知距离
//!
//! 在给定令牌层级下计算两个CSS原始值之间的距离，结果位于 `[0, 1]`：
//! 0 表示无法区分，1 表示差异最大或无法比较。所有函数都是纯函数且对称。

use crate::domain::models::token::TokenLayer;
use once_cell::sync::Lazy;
use regex::Regex;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#([0-9a-f]{3,8})$").unwrap());

static RGB_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*([0-9.]+))?\s*\)$",
    )
    .unwrap()
});

static NUMERIC_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+))(?:px|rem|em|%|s|ms|deg)?$").unwrap()
});

/// sRGB颜色，通道取值 0..=255，alpha 取值 0..=1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

/// CIELAB颜色
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// 解析十六进制（3/4/6/8位）或 `rgb()`/`rgba()` 颜色
pub fn parse_color(value: &str) -> Option<Rgba> {
    let trimmed = value.trim().to_lowercase();

    if let Some(caps) = HEX_COLOR.captures(&trimmed) {
        let hex = caps.get(1)?.as_str();
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
        let doubled = |i: usize| {
            let c = &hex[i..i + 1];
            channel(&format!("{}{}", c, c))
        };
        return match hex.len() {
            3 => Some(Rgba {
                r: doubled(0)?,
                g: doubled(1)?,
                b: doubled(2)?,
                a: 1.0,
            }),
            4 => Some(Rgba {
                r: doubled(0)?,
                g: doubled(1)?,
                b: doubled(2)?,
                a: doubled(3)? / 255.0,
            }),
            6 => Some(Rgba {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
                a: 1.0,
            }),
            8 => Some(Rgba {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
                a: channel(&hex[6..8])? / 255.0,
            }),
            _ => None,
        };
    }

    let caps = RGB_COLOR.captures(&trimmed)?;
    let int = |i: usize| caps.get(i)?.as_str().parse::<f64>().ok();
    let a = match caps.get(4) {
        Some(m) => m.as_str().parse::<f64>().ok()?,
        None => 1.0,
    };
    Some(Rgba {
        r: int(1)?,
        g: int(2)?,
        b: int(3)?,
        a,
    })
}

/// sRGB → 线性RGB → XYZ (D65) → CIELAB
pub fn rgb_to_lab(r: f64, g: f64, b: f64) -> Lab {
    fn linearize(channel: f64) -> f64 {
        let c = channel / 255.0;
        if c > 0.04045 {
            ((c + 0.055) / 1.055).powf(2.4)
        } else {
            c / 12.92
        }
    }

    let (rl, gl, bl) = (linearize(r), linearize(g), linearize(b));

    let x = (rl * 0.4124564 + gl * 0.3575761 + bl * 0.1804375) / 0.95047;
    let y = rl * 0.2126729 + gl * 0.7151522 + bl * 0.0721750;
    let z = (rl * 0.0193339 + gl * 0.1191920 + bl * 0.9503041) / 1.08883;

    const EPSILON: f64 = 0.008856;
    const KAPPA: f64 = 903.3;
    let f = |t: f64| {
        if t > EPSILON {
            t.cbrt()
        } else {
            (KAPPA * t + 16.0) / 116.0
        }
    };
    let (fx, fy, fz) = (f(x), f(y), f(z));

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// CIEDE2000色差，kL = kC = kH = 1
pub fn ciede2000(lab1: Lab, lab2: Lab) -> f64 {
    let (l1, a1, b1) = (lab1.l, lab1.a, lab1.b);
    let (l2, a2, b2) = (lab2.l, lab2.a, lab2.b);
    let (k_l, k_c, k_h) = (1.0, 1.0, 1.0);
    let pow25_7 = 25f64.powi(7);

    let c1_ab = (a1 * a1 + b1 * b1).sqrt();
    let c2_ab = (a2 * a2 + b2 * b2).sqrt();
    let c_ab_mean7 = ((c1_ab + c2_ab) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_ab_mean7 / (c_ab_mean7 + pow25_7)).sqrt());

    let a1_p = a1 * (1.0 + g);
    let a2_p = a2 * (1.0 + g);
    let c1_p = (a1_p * a1_p + b1 * b1).sqrt();
    let c2_p = (a2_p * a2_p + b2 * b2).sqrt();

    let hue = |b: f64, a: f64| {
        let h = b.atan2(a).to_degrees();
        if h < 0.0 {
            h + 360.0
        } else {
            h
        }
    };
    let h1_p = hue(b1, a1_p);
    let h2_p = hue(b2, a2_p);

    let delta_l_p = l2 - l1;
    let delta_c_p = c2_p - c1_p;

    let chroma_product = c1_p * c2_p;
    let delta_h_p = if chroma_product == 0.0 {
        0.0
    } else if (h2_p - h1_p).abs() <= 180.0 {
        h2_p - h1_p
    } else if h2_p - h1_p > 180.0 {
        h2_p - h1_p - 360.0
    } else {
        h2_p - h1_p + 360.0
    };
    let delta_big_h_p = 2.0 * chroma_product.sqrt() * (delta_h_p.to_radians() / 2.0).sin();

    let l_p_mean = (l1 + l2) / 2.0;
    let c_p_mean = (c1_p + c2_p) / 2.0;
    let h_p_mean = if chroma_product == 0.0 {
        h1_p + h2_p
    } else if (h1_p - h2_p).abs() <= 180.0 {
        (h1_p + h2_p) / 2.0
    } else if h1_p + h2_p < 360.0 {
        (h1_p + h2_p + 360.0) / 2.0
    } else {
        (h1_p + h2_p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_p_mean - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_p_mean).to_radians().cos()
        + 0.32 * (3.0 * h_p_mean + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_p_mean - 63.0).to_radians().cos();

    let l_dev_sq = (l_p_mean - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_dev_sq / (20.0 + l_dev_sq).sqrt();
    let s_c = 1.0 + 0.045 * c_p_mean;
    let s_h = 1.0 + 0.015 * c_p_mean * t;

    let c_p_mean7 = c_p_mean.powi(7);
    let r_c = 2.0 * (c_p_mean7 / (c_p_mean7 + pow25_7)).sqrt();
    let delta_theta = 30.0 * (-((h_p_mean - 275.0) / 25.0).powi(2)).exp();
    let r_t = -(2.0 * delta_theta).to_radians().sin() * r_c;

    let dl = delta_l_p / (k_l * s_l);
    let dc = delta_c_p / (k_c * s_c);
    let dh = delta_big_h_p / (k_h * s_h);

    (dl * dl + dc * dc + dh * dh + r_t * dc * dh).sqrt()
}

/// 归一化的CIEDE2000距离；任一颜色无法解析时为1
pub fn color_distance_ciede2000(color1: &str, color2: &str) -> f64 {
    match (parse_color(color1), parse_color(color2)) {
        (Some(c1), Some(c2)) => {
            let lab1 = rgb_to_lab(c1.r, c1.g, c1.b);
            let lab2 = rgb_to_lab(c2.r, c2.g, c2.b);
            (ciede2000(lab1, lab2) / 100.0).min(1.0)
        }
        _ => 1.0,
    }
}

/// CIELAB欧氏距离，除以375归一化
pub fn color_distance_lab(color1: &str, color2: &str) -> f64 {
    match (parse_color(color1), parse_color(color2)) {
        (Some(c1), Some(c2)) => {
            let lab1 = rgb_to_lab(c1.r, c1.g, c1.b);
            let lab2 = rgb_to_lab(c2.r, c2.g, c2.b);
            let distance = ((lab1.l - lab2.l).powi(2)
                + (lab1.a - lab2.a).powi(2)
                + (lab1.b - lab2.b).powi(2))
            .sqrt();
            (distance / 375.0).min(1.0)
        }
        _ => 1.0,
    }
}

fn parse_numeric_value(value: &str) -> Option<f64> {
    let caps = NUMERIC_VALUE.captures(value.trim())?;
    caps.get(1)?.as_str().parse::<f64>().ok()
}

/// 去掉单位后的相对数值差
pub fn numeric_distance(a: &str, b: &str) -> f64 {
    let (Some(num_a), Some(num_b)) = (parse_numeric_value(a), parse_numeric_value(b)) else {
        return 1.0;
    };
    if num_a == 0.0 && num_b == 0.0 {
        return 0.0;
    }
    let max = num_a.abs().max(num_b.abs());
    ((num_a - num_b).abs() / max).min(1.0)
}

/// 字体族：小写、去掉首尾引号后完全相等为0，否则为1
pub fn font_family_distance(a: &str, b: &str) -> f64 {
    fn normalize(value: &str) -> String {
        let lower = value.trim().to_lowercase();
        let without_start = lower
            .strip_prefix('"')
            .or_else(|| lower.strip_prefix('\''))
            .unwrap_or(&lower);
        without_start
            .strip_suffix('"')
            .or_else(|| without_start.strip_suffix('\''))
            .unwrap_or(without_start)
            .to_string()
    }

    if normalize(a) == normalize(b) {
        0.0
    } else {
        1.0
    }
}

/// 按层级和属性分派到对应的距离函数
pub fn token_distance(layer: TokenLayer, property: &str, value1: &str, value2: &str) -> f64 {
    if value1 == value2 {
        return 0.0;
    }

    match layer {
        TokenLayer::Color => color_distance_ciede2000(value1, value2),
        TokenLayer::Typography if property == "fontFamily" => font_family_distance(value1, value2),
        TokenLayer::Typography
        | TokenLayer::Spacing
        | TokenLayer::Elevation
        | TokenLayer::Border
        | TokenLayer::Motion
        | TokenLayer::Opacity => numeric_distance(value1, value2),
    }
}

/// 层级未知时的退化距离：相等为0，否则为1
pub fn exact_distance(value1: &str, value2: &str) -> f64 {
    if value1 == value2 {
        0.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {} to be within {} of {}",
            actual,
            tolerance,
            expected
        );
    }

    #[test]
    fn test_parse_hex_variants() {
        let short = parse_color("#fff").unwrap();
        assert_eq!((short.r, short.g, short.b, short.a), (255.0, 255.0, 255.0, 1.0));

        let with_alpha = parse_color("#ff000080").unwrap();
        assert_eq!(with_alpha.r, 255.0);
        assert_close(with_alpha.a, 128.0 / 255.0, 1e-9);

        let four = parse_color("#0f08").unwrap();
        assert_eq!((four.g, four.b), (255.0, 0.0));
        assert_close(four.a, 136.0 / 255.0, 1e-9);

        assert!(parse_color("#12345").is_none());
        assert!(parse_color("#ggg").is_none());
    }

    #[test]
    fn test_parse_rgb_functions() {
        let rgb = parse_color("rgb(10, 20, 30)").unwrap();
        assert_eq!((rgb.r, rgb.g, rgb.b, rgb.a), (10.0, 20.0, 30.0, 1.0));

        let rgba = parse_color("RGBA(0,0,0,0.5)").unwrap();
        assert_eq!(rgba.a, 0.5);

        assert!(parse_color("hsl(0, 0%, 0%)").is_none());
        assert!(parse_color("red").is_none());
    }

    #[test]
    fn test_rgb_to_lab_reference_points() {
        let white = rgb_to_lab(255.0, 255.0, 255.0);
        assert_close(white.l, 100.0, 1e-3);
        assert_close(white.a, 0.0, 1e-3);
        assert_close(white.b, 0.0, 1e-3);

        let black = rgb_to_lab(0.0, 0.0, 0.0);
        assert_close(black.l, 0.0, 1e-9);
    }

    #[test]
    fn test_ciede2000_reference_pairs() {
        // Sharma, Wu & Dalal reference data
        let pairs = [
            ((50.0, 2.6772, -79.7751), (50.0, 0.0, -82.7485), 2.0425),
            ((50.0, -1.3802, -84.2814), (50.0, 0.0, -82.7485), 1.0),
            ((50.0, 0.0, 0.0), (50.0, -1.0, 2.0), 2.3669),
            ((50.0, 2.5, 0.0), (73.0, 25.0, -18.0), 27.1492),
        ];
        for ((l1, a1, b1), (l2, a2, b2), expected) in pairs {
            let lab1 = Lab { l: l1, a: a1, b: b1 };
            let lab2 = Lab { l: l2, a: a2, b: b2 };
            assert_close(ciede2000(lab1, lab2), expected, 1e-4);
            assert_close(ciede2000(lab2, lab1), expected, 1e-4);
        }
    }

    #[test]
    fn test_color_distance_identity_and_symmetry() {
        let colors = ["#ffffff", "#ff0000", "rgb(12, 200, 99)", "rgba(0, 0, 255, 0.4)", "#123"];
        for a in colors {
            assert_eq!(color_distance_ciede2000(a, a), 0.0);
            for b in colors {
                assert_close(
                    color_distance_ciede2000(a, b),
                    color_distance_ciede2000(b, a),
                    1e-12,
                );
            }
        }
    }

    #[test]
    fn test_color_distance_bounds() {
        assert_eq!(color_distance_ciede2000("#fff", "transparent"), 1.0);
        let d = color_distance_ciede2000("#000000", "#ffffff");
        assert!(d > 0.99 && d <= 1.0);

        let near = color_distance_ciede2000("rgb(0, 0, 0)", "rgb(10, 10, 10)");
        assert!(near > 0.0 && near < 0.02, "near-black distance was {}", near);
    }

    #[test]
    fn test_color_distance_lab() {
        assert_eq!(color_distance_lab("#abc", "#abc"), 0.0);
        assert_close(color_distance_lab("#000", "#fff"), 100.0 / 375.0, 1e-3);
        assert_eq!(color_distance_lab("nope", "#fff"), 1.0);
    }

    #[test]
    fn test_numeric_distance() {
        assert_eq!(numeric_distance("16px", "16px"), 0.0);
        assert_eq!(numeric_distance("0px", "0"), 0.0);
        assert_close(numeric_distance("8px", "16px"), 0.5, 1e-12);
        assert_close(numeric_distance("0.2s", "200ms"), 0.999, 1e-12);
        assert_eq!(numeric_distance("0px", "4px"), 1.0);
        assert_eq!(numeric_distance("auto", "4px"), 1.0);
        assert_eq!(numeric_distance("-4px", "4px"), 1.0);
        assert_eq!(numeric_distance(".5", "0.5"), 0.0);
    }

    #[test]
    fn test_font_family_normalization() {
        assert_eq!(font_family_distance("\"Inter\"", "inter"), 0.0);
        assert_eq!(font_family_distance("'Helvetica Neue'", "helvetica neue"), 0.0);
        assert_eq!(font_family_distance("Inter, sans-serif", "Inter"), 1.0);
    }

    #[test]
    fn test_token_distance_equal_strings_short_circuit() {
        for layer in TokenLayer::ALL {
            assert_eq!(token_distance(layer, "anything", "garbage", "garbage"), 0.0);
        }
    }

    #[test]
    fn test_token_distance_dispatch() {
        assert_eq!(
            token_distance(TokenLayer::Typography, "fontFamily", "Inter", "Roboto"),
            1.0
        );
        assert_close(
            token_distance(TokenLayer::Typography, "fontSize", "12px", "16px"),
            0.25,
            1e-12,
        );
        assert_close(
            token_distance(TokenLayer::Opacity, "opacity", "0.5", "0.25"),
            0.5,
            1e-12,
        );
        assert_eq!(
            token_distance(
                TokenLayer::Elevation,
                "boxShadow",
                "rgba(0, 0, 0, 0.1) 0px 1px 2px 0px",
                "none"
            ),
            1.0
        );
        assert_eq!(exact_distance("solid", "dashed"), 1.0);
    }

    #[test]
    fn test_token_distance_symmetry() {
        let cases = [
            (TokenLayer::Spacing, "margin", "4px", "12px"),
            (TokenLayer::Motion, "transitionDuration", "0.3s", "0.15s"),
            (TokenLayer::Color, "color", "#333", "rgb(40, 40, 40)"),
            (TokenLayer::Typography, "fontFamily", "\"A\"", "B"),
        ];
        for (layer, property, a, b) in cases {
            assert_eq!(
                token_distance(layer, property, a, b),
                token_distance(layer, property, b, a)
            );
        }
    }
}
