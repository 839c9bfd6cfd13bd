// ==========================================
// 撿貨資訊聯邦查詢引擎 - 松散类型记录
// ==========================================
// 职责: 字段值标签联合 + 有序字段映射
// 约束: 同一逻辑字段在不同来源可能以不同物理类型存储
// ==========================================

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// 日期时间文本格式（输出与存储共用）
pub const DATETIME_TEXT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 日期文本格式
pub const DATE_TEXT_FORMAT: &str = "%Y-%m-%d";

// ==========================================
// FieldValue - 字段值
// ==========================================
/// 记录字段值
///
/// 数值分为 Int / Float 两种物理形态，比较时按数值统一处理；
/// Float(NaN) 视为缺失值（与 Null 等价）。
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// 是否为缺失值（Null 或 NaN）
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// 是否为 NaN 类数值
    pub fn is_nan(&self) -> bool {
        matches!(self, FieldValue::Float(f) if f.is_nan())
    }

    /// 数值视图（Int / Float）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 过滤条件使用的等值语义
    ///
    /// - Int 与 Float 按数值比较
    /// - Text 只与 Text 相等，DateTime 只与 DateTime 相等
    /// - 缺失值不与任何值相等
    pub fn loosely_equals(&self, other: &FieldValue) -> bool {
        if self.is_absent() || other.is_absent() {
            return false;
        }
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// 等值索引键
    ///
    /// 与 `loosely_equals` 一致: 两值松散相等当且仅当索引键相同；
    /// 空值 / NaN 没有索引键
    pub fn lookup_key(&self) -> Option<String> {
        if self.is_absent() {
            return None;
        }
        match self {
            FieldValue::Bool(b) => Some(format!("b:{}", b)),
            FieldValue::Text(s) => Some(format!("t:{}", s)),
            FieldValue::DateTime(dt) => Some(format!("d:{}", dt.format("%Y-%m-%dT%H:%M:%S%.f"))),
            _ => self.as_f64().map(|n| {
                const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
                if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
                    format!("n:{}", n as i64)
                } else {
                    format!("n:{:?}", n)
                }
            }),
        }
    }

    /// 同类可比较值之间的顺序（用于范围过滤）
    ///
    /// 类型不兼容时返回 None，范围条件视为不成立。
    pub fn partial_compare(&self, other: &FieldValue) -> Option<Ordering> {
        if self.is_absent() || other.is_absent() {
            return None;
        }
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// 排序用全序: 缺失 < Bool < 数值 < Text < DateTime
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        let rank = self.sort_rank().cmp(&other.sort_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }

    fn sort_rank(&self) -> u8 {
        if self.is_absent() {
            return 0;
        }
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) | FieldValue::Float(_) => 2,
            FieldValue::Text(_) => 3,
            FieldValue::DateTime(_) => 4,
        }
    }

    /// 由普通 JSON 值构造（对象/数组按 JSON 文本保存）
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
            },
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// 转为普通 JSON 值（NaN → null，DateTime → 文本）
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Int(i) => serde_json::Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::DateTime(dt) => {
                serde_json::Value::String(dt.format(DATETIME_TEXT_FORMAT).to_string())
            }
        }
    }
}

impl PartialEq for FieldValue {
    /// 结构相等（Int(1) != Float(1.0)，NaN == NaN）
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a.to_bits() == b.to_bits(),
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{:?}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_TEXT_FORMAT)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(dt: NaiveDateTime) -> Self {
        FieldValue::DateTime(dt)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(FieldValue::from_json(&value))
    }
}

// ==========================================
// Record - 有序字段映射
// ==========================================
/// 一条松散类型记录（字段顺序保持插入顺序）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// 链式构造
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(field.to_string(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// 取字段值，缺失字段与 Null/NaN 一律返回 None
    pub fn get_present(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field).filter(|v| !v.is_absent())
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut FieldValue> {
        self.0.get_mut(field)
    }

    /// 删除字段并保持其余字段顺序
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.shift_remove(field)
    }

    /// 仅保留满足条件的字段
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FieldValue) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut FieldValue)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 所有字段值均为缺失
    pub fn is_blank(&self) -> bool {
        self.0.values().all(FieldValue::is_absent)
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_nan_is_absent() {
        assert!(FieldValue::Float(f64::NAN).is_absent());
        assert!(FieldValue::Null.is_absent());
        assert!(!FieldValue::Float(0.0).is_absent());
        assert!(!FieldValue::Text(String::new()).is_absent());
    }

    #[test]
    fn test_loose_equality_crosses_numeric_kinds_only() {
        assert!(FieldValue::Int(1002).loosely_equals(&FieldValue::Float(1002.0)));
        assert!(!FieldValue::Text("1002".into()).loosely_equals(&FieldValue::Int(1002)));
        assert!(!FieldValue::Null.loosely_equals(&FieldValue::Null));
    }

    #[test]
    fn test_lookup_key_agrees_with_loose_equality() {
        let values = [
            FieldValue::Int(1002),
            FieldValue::Float(1002.0),
            FieldValue::Float(1002.5),
            FieldValue::Text("1002".into()),
            FieldValue::Text("1002.0".into()),
            FieldValue::Bool(true),
        ];
        for a in &values {
            for b in &values {
                assert_eq!(
                    a.loosely_equals(b),
                    a.lookup_key() == b.lookup_key(),
                    "{:?} vs {:?}",
                    a,
                    b
                );
            }
        }
        assert_eq!(FieldValue::Float(f64::NAN).lookup_key(), None);
        assert_eq!(FieldValue::Null.lookup_key(), None);
    }

    #[test]
    fn test_sort_cmp_puts_absent_first() {
        let mut values = vec![
            FieldValue::Text("b".into()),
            FieldValue::Int(3),
            FieldValue::Null,
            FieldValue::Float(1.5),
            FieldValue::Float(f64::NAN),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert!(values[0].is_absent());
        assert!(values[1].is_absent());
        assert_eq!(values[2], FieldValue::Float(1.5));
        assert_eq!(values[3], FieldValue::Int(3));
        assert_eq!(values[4], FieldValue::Text("b".into()));
    }

    #[test]
    fn test_json_output_of_nan_and_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let record = Record::new()
            .with("單價", f64::NAN)
            .with("MIC需求起日", dt)
            .with("料號", 2001.0);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["單價"].is_null());
        assert_eq!(json["MIC需求起日"], "2024-01-01T08:00:00");
        assert_eq!(json["料號"], 2001.0);
    }

    #[test]
    fn test_remove_keeps_field_order() {
        let mut record = Record::new().with("a", 1).with("_id", "x").with("b", 2);
        record.remove("_id");
        let keys: Vec<&String> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
