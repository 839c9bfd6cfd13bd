// ==========================================
// 撿貨資訊聯邦查詢引擎 - 结果清洗与排序
// ==========================================
// 步骤（顺序固定）:
// 1. 删除内部/存储标识字段
// 2. 日期字段统一为纯日期文本
// 3. NaN 类数值替换为 Null
// 4. 按可识别字段稳定排序（缺失值视为最小）
// ==========================================

use crate::domain::fields::{is_internal_field, is_pick_field, DATE_FIELDS};
use crate::domain::{FieldValue, Record, SortOrder, DATE_TEXT_FORMAT};
use std::cmp::Ordering;

/// 清洗并排序合并后的结果集
///
/// `sort_field` 不可识别或为空时保持输入顺序（扇出顺序 + 补全顺序）
pub fn finalize(records: Vec<Record>, sort_field: Option<&str>, order: SortOrder) -> Vec<Record> {
    let mut records: Vec<Record> = records.into_iter().map(sanitize).collect();

    if let Some(field) = sort_field.map(str::trim).filter(|f| is_pick_field(f)) {
        sort_records(&mut records, field, order);
    }

    records
}

/// 单条记录清洗（步骤 1-3）
pub fn sanitize(mut record: Record) -> Record {
    record.retain(|field, _| !is_internal_field(field));

    for field in DATE_FIELDS {
        if let Some(value) = record.get_mut(field) {
            if let Some(date_only) = date_only_text(value) {
                *value = FieldValue::Text(date_only);
            }
        }
    }

    for (_, value) in record.iter_mut() {
        if value.is_nan() {
            *value = FieldValue::Null;
        }
    }

    record
}

/// 日期字段的纯日期文本
///
/// - 文本含 `T` 或空格时间分隔符: 截取分隔符之前的部分（分隔符在首位时不改动）
/// - DateTime: 格式化为 YYYY-MM-DD
/// - 其他情况不改动（返回 None）
fn date_only_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => {
            let cut = s
                .find('T')
                .or_else(|| s.trim_end().find(' '))
                .filter(|&i| i > 0)?;
            Some(s[..cut].to_string())
        }
        FieldValue::DateTime(dt) => Some(dt.format(DATE_TEXT_FORMAT).to_string()),
        _ => None,
    }
}

/// 稳定排序；降序使用反向比较器，相同键保持输入顺序
pub fn sort_records(records: &mut [Record], field: &str, order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = compare_on(a, b, field);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// 两条记录在某字段上的顺序（缺失值最小）
pub fn compare_on(a: &Record, b: &Record, field: &str) -> Ordering {
    let absent = FieldValue::Null;
    a.get(field)
        .unwrap_or(&absent)
        .sort_cmp(b.get(field).unwrap_or(&absent))
}
