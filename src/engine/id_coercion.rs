// ==========================================
// 撿貨資訊聯邦查詢引擎 - 料號表示转换
// ==========================================
// 背景: 同一料號在不同来源中可能存为文本 / 整数 / 浮点 / 补零文本
// 职责: 生成探测其他来源料號字段时需尝试的候选表示
// 约束: 无法转为数值时静默跳过该表示，不报错
// ==========================================

use crate::domain::FieldValue;

/// 生成候选键（去重，按尝试顺序）
///
/// 1. 原值
/// 2. 可解析为数值时: 浮点形式、浮点文本 ("1002.0")
/// 3. 数值为整数时: 整数形式、整数文本 ("1002")
pub fn candidate_keys(raw: &FieldValue) -> Vec<FieldValue> {
    if raw.is_absent() {
        return Vec::new();
    }

    let mut keys: Vec<FieldValue> = Vec::with_capacity(5);
    push_unique(&mut keys, raw.clone());

    if let Some(n) = numeric_value(raw) {
        push_unique(&mut keys, FieldValue::Float(n));
        push_unique(&mut keys, FieldValue::Text(float_text(n)));
        if let Some(i) = integral(n) {
            push_unique(&mut keys, FieldValue::Int(i));
            push_unique(&mut keys, FieldValue::Text(i.to_string()));
        }
    }

    keys
}

/// 料號归一键（用于合并同一料號的不同表示）
///
/// 数值与纯数字文本归一到同一键；补零文本保持原样，不与数值合并
pub fn canonical_key(raw: &FieldValue) -> Option<String> {
    if raw.is_absent() {
        return None;
    }
    match raw {
        FieldValue::Int(i) => Some(i.to_string()),
        FieldValue::Float(f) => Some(number_key(*f)),
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() && number_key(n) == trimmed => Some(trimmed.to_string()),
                Ok(n) if n.is_finite() && float_text(n) == trimmed => Some(number_key(n)),
                _ => Some(trimmed.to_string()),
            }
        }
        other => Some(other.to_string()),
    }
}

/// 数值视图: Int / Float 直接取值，Text 去空白后尝试解析
fn numeric_value(raw: &FieldValue) -> Option<f64> {
    let n = match raw {
        FieldValue::Int(i) => *i as f64,
        FieldValue::Float(f) => *f,
        FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() {
        Some(n)
    } else {
        None
    }
}

/// 整数值（超出 i64 精确范围时放弃）
fn integral(n: f64) -> Option<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Some(n as i64)
    } else {
        None
    }
}

/// 浮点文本（整数值保留 ".0"）
fn float_text(n: f64) -> String {
    format!("{:?}", n)
}

fn number_key(n: f64) -> String {
    match integral(n) {
        Some(i) => i.to_string(),
        None => float_text(n),
    }
}

fn push_unique(keys: &mut Vec<FieldValue>, key: FieldValue) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_id_expands_to_numeric_forms() {
        let keys = candidate_keys(&FieldValue::from("1002"));
        assert_eq!(
            keys,
            vec![
                FieldValue::from("1002"),
                FieldValue::Float(1002.0),
                FieldValue::from("1002.0"),
                FieldValue::Int(1002),
            ]
        );
    }

    #[test]
    fn test_float_id_reaches_integer_text() {
        let keys = candidate_keys(&FieldValue::Float(2001.0));
        assert!(keys.contains(&FieldValue::from("2001")));
        assert!(keys.contains(&FieldValue::from("2001.0")));
        assert_eq!(keys[0], FieldValue::Float(2001.0));
    }

    #[test]
    fn test_zero_padded_text_keeps_original_first() {
        let keys = candidate_keys(&FieldValue::from("002001"));
        assert_eq!(keys[0], FieldValue::from("002001"));
        assert!(keys.contains(&FieldValue::from("2001")));
    }

    #[test]
    fn test_non_numeric_text_yields_only_itself() {
        let keys = candidate_keys(&FieldValue::from("AB-100"));
        assert_eq!(keys, vec![FieldValue::from("AB-100")]);
    }

    #[test]
    fn test_fractional_id_has_no_integer_form() {
        let keys = candidate_keys(&FieldValue::Float(12.5));
        assert_eq!(keys, vec![FieldValue::Float(12.5), FieldValue::from("12.5")]);
    }

    #[test]
    fn test_absent_id_has_no_keys() {
        assert!(candidate_keys(&FieldValue::Null).is_empty());
        assert!(candidate_keys(&FieldValue::Float(f64::NAN)).is_empty());
    }

    #[test]
    fn test_canonical_key_groups_representations() {
        let a = canonical_key(&FieldValue::Int(2001));
        let b = canonical_key(&FieldValue::Float(2001.0));
        let c = canonical_key(&FieldValue::from("2001"));
        let d = canonical_key(&FieldValue::from("2001.0"));
        assert_eq!(a, Some("2001".to_string()));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
        assert_eq!(
            canonical_key(&FieldValue::from("002001")),
            Some("002001".to_string())
        );
        assert_eq!(canonical_key(&FieldValue::from("  ")), None);
    }
}
