// ==========================================
// 撿貨資訊聯邦查詢引擎 - 文档过滤条件
// ==========================================
// 职责: 等值 / 范围 / 集合 / 日期前缀区间 过滤，以及字段投影
// 约束: 缺失字段与 Null/NaN 不满足任何比较条件
// ==========================================

use crate::domain::{FieldValue, Record};
use std::cmp::Ordering;

// ==========================================
// Filter - 过滤条件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// 匹配全部文档
    All,
    Eq(String, FieldValue),
    Gte(String, FieldValue),
    Lte(String, FieldValue),
    Lt(String, FieldValue),
    /// 集合成员
    In(String, Vec<FieldValue>),
    /// 文本字段前 `len` 个字符落在 [low, high] 内（字典序）
    PrefixBetween {
        field: String,
        len: usize,
        low: String,
        high: String,
    },
    Or(Vec<Filter>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn gte(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn lte(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Lte(field.to_string(), value.into())
    }

    pub fn lt(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Lt(field.to_string(), value.into())
    }

    pub fn is_in(field: &str, values: Vec<FieldValue>) -> Self {
        Filter::In(field.to_string(), values)
    }

    pub fn prefix_between(field: &str, low: &str, high: &str) -> Self {
        Filter::PrefixBetween {
            field: field.to_string(),
            len: low.chars().count(),
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    /// 判断记录是否满足条件
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => record
                .get(field)
                .map(|v| v.loosely_equals(expected))
                .unwrap_or(false),
            Filter::Gte(field, bound) => compare_field(record, field, bound)
                .map(|ord| ord != Ordering::Less)
                .unwrap_or(false),
            Filter::Lte(field, bound) => compare_field(record, field, bound)
                .map(|ord| ord != Ordering::Greater)
                .unwrap_or(false),
            Filter::Lt(field, bound) => compare_field(record, field, bound)
                .map(|ord| ord == Ordering::Less)
                .unwrap_or(false),
            Filter::In(field, candidates) => match record.get(field) {
                Some(v) => candidates.iter().any(|c| v.loosely_equals(c)),
                None => false,
            },
            Filter::PrefixBetween {
                field,
                len,
                low,
                high,
            } => match record.get(field).and_then(FieldValue::as_text) {
                Some(text) => {
                    let prefix: String = text.chars().take(*len).collect();
                    prefix.as_str() >= low.as_str() && prefix.as_str() <= high.as_str()
                }
                None => false,
            },
            Filter::Or(branches) => branches.iter().any(|f| f.matches(record)),
            Filter::And(branches) => branches.iter().all(|f| f.matches(record)),
        }
    }

    /// 结构校验（空字段名 / 空析取视为非法）
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Filter::All => Ok(()),
            Filter::Eq(field, _)
            | Filter::Gte(field, _)
            | Filter::Lte(field, _)
            | Filter::Lt(field, _)
            | Filter::In(field, _)
            | Filter::PrefixBetween { field, .. } => {
                if field.trim().is_empty() {
                    Err("过滤字段名为空".to_string())
                } else {
                    Ok(())
                }
            }
            Filter::Or(branches) | Filter::And(branches) => {
                if branches.is_empty() {
                    return Err("组合条件不能为空".to_string());
                }
                branches.iter().try_for_each(Filter::validate)
            }
        }
    }
}

fn compare_field(record: &Record, field: &str, bound: &FieldValue) -> Option<Ordering> {
    record.get(field)?.partial_compare(bound)
}

// ==========================================
// Projection - 字段投影
// ==========================================
/// 限制返回字段；默认保留存储主键，可通过 `without_id` 排除
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
    include_id: bool,
}

impl Projection {
    pub fn of(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            include_id: true,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.include_id = false;
        self
    }

    pub fn includes(&self, field: &str) -> bool {
        if field == crate::domain::fields::STORAGE_ID {
            return self.include_id;
        }
        self.fields.iter().any(|f| f == field)
    }

    /// 按投影裁剪记录（保持原字段顺序）
    pub fn apply(&self, mut record: Record) -> Record {
        record.retain(|field, _| self.includes(field));
        record
    }
}
