//! 字段值归一化：货币/百分比字符串、数字、空值统一为两位小数或 NA。

use crate::models::record::number_text;
use crate::models::FieldKind;
use bigdecimal::{BigDecimal, Zero};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 比较用的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedValue {
    Amount(BigDecimal),
    /// 原值为 null 或缺失；与 0 不同
    NotAvailable,
}

impl NormalizedValue {
    pub fn zero() -> Self {
        Self::Amount(BigDecimal::zero())
    }

    pub fn from_f64(value: f64) -> Self {
        match decimal_from_f64(value) {
            Some(d) => Self::Amount(round_cents(&d)),
            None => Self::zero(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Amount(_))
    }

    pub fn amount(&self) -> Option<&BigDecimal> {
        match self {
            Self::Amount(d) => Some(d),
            Self::NotAvailable => None,
        }
    }

    /// NA 按 0 处理
    pub fn or_zero(self) -> Self {
        match self {
            Self::NotAvailable => Self::zero(),
            other => other,
        }
    }

    pub fn scaled(self, factor: i64) -> Self {
        match self {
            Self::Amount(d) => Self::Amount(d * BigDecimal::from(factor)),
            na => na,
        }
    }

    pub fn rounded(self) -> Self {
        match self {
            Self::Amount(d) => Self::Amount(round_cents(&d)),
            na => na,
        }
    }

    /// 与给定数值（舍入到两位后）完全相等
    pub fn equals(&self, value: f64) -> bool {
        *self == Self::from_f64(value)
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount(d) => write!(f, "{}", d.with_scale(2)),
            Self::NotAvailable => f.write_str("NA"),
        }
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// 解析原始值（不舍入）
///
/// 无法解析的值按 0 处理，这是有意的有损口径；需要区分缺失和 0 的调用方应先看原值。
pub fn parse(raw: Option<&Value>) -> NormalizedValue {
    match raw {
        None | Some(Value::Null) => NormalizedValue::NotAvailable,
        Some(Value::Number(n)) => BigDecimal::from_str(&number_text(n))
            .map(NormalizedValue::Amount)
            .unwrap_or_else(|_| NormalizedValue::zero()),
        Some(Value::String(s)) => parse_number(s)
            .map(NormalizedValue::Amount)
            .unwrap_or_else(NormalizedValue::zero),
        Some(_) => NormalizedValue::zero(),
    }
}

/// 解析并舍入到两位小数
///
/// 各类型的数值口径相同，`kind` 只决定后续展示格式 (见 `format_fixed` / `format_compact`)。
pub fn normalize(raw: Option<&Value>, kind: FieldKind) -> NormalizedValue {
    let value = parse(raw).rounded();
    tracing::trace!("normalize {:?} as {:?} -> {}", raw, kind, value);
    value
}

/// 去掉 `$`、`,`、`%` 后取开头的数字部分，`"12.5 USD"` 得到 12.5
///
/// 带指数的写法先按 f64 解析，超出 f64 范围 (`1e999`) 视为无法解析，按 0 处理。
pub fn parse_number(text: &str) -> Option<BigDecimal> {
    let cleaned: String = text.chars().filter(|c| !matches!(c, '$' | ',' | '%')).collect();
    let literal = leading_number(cleaned.trim_start())?;
    if literal.contains('e') {
        let value: f64 = literal.parse().ok()?;
        return decimal_from_f64(value);
    }
    BigDecimal::from_str(&literal).ok()
}

fn leading_number(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut literal = String::new();

    match bytes.first() {
        Some(b'-') => {
            literal.push('-');
            pos = 1;
        }
        Some(b'+') => pos = 1,
        _ => {}
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &s[int_start..pos];

    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        frac_digits = &s[frac_start..frac_end];
        pos = frac_end;
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    literal.push_str(if int_digits.is_empty() { "0" } else { int_digits });
    if !frac_digits.is_empty() {
        literal.push('.');
        literal.push_str(frac_digits);
    }

    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        let mut exp_end = pos + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            literal.push('e');
            literal.push_str(&s[pos + 1..exp_end]);
        }
    }

    Some(literal)
}

fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// 舍入到两位小数，半数远离零 (1234.505 -> 1234.51, -2.345 -> -2.35)
pub fn round_cents(value: &BigDecimal) -> BigDecimal {
    let truncated = value.with_scale(2);
    let remainder = (value - &truncated).abs();
    let half_cent = BigDecimal::new(5.into(), 3);

    if remainder < half_cent {
        truncated
    } else if *value < BigDecimal::zero() {
        truncated - BigDecimal::new(1.into(), 2)
    } else {
        truncated + BigDecimal::new(1.into(), 2)
    }
}

/// 两位小数的最短写法：`6.00` -> `6`，`5.30` -> `5.3`
pub fn compact_decimal(value: &BigDecimal) -> String {
    let fixed = value.with_scale(2).to_string();
    if !fixed.contains('.') {
        return fixed;
    }
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 固定两位小数展示，空值为 `NA`
pub fn format_fixed(value: &NormalizedValue, kind: FieldKind) -> String {
    let NormalizedValue::Amount(d) = value else {
        return "NA".to_string();
    };
    let fixed = d.with_scale(2).to_string();
    match kind {
        FieldKind::Currency => format!("${}", fixed),
        FieldKind::Percentage => format!("{}%", fixed),
        FieldKind::Count | FieldKind::PlainNumber => fixed,
    }
}

/// 最短小数展示，空值为 `N/A`；计数类字段为 0 时同样显示 `N/A`
pub fn format_compact(value: &NormalizedValue, kind: FieldKind) -> String {
    let NormalizedValue::Amount(d) = value else {
        return "N/A".to_string();
    };
    let compact = compact_decimal(d);
    match kind {
        FieldKind::Currency => format!("${}", compact),
        FieldKind::Percentage => format!("{}%", compact),
        FieldKind::Count | FieldKind::PlainNumber if d.is_zero() => "N/A".to_string(),
        FieldKind::Count | FieldKind::PlainNumber => compact,
    }
}
