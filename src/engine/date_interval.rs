// ==========================================
// 撿貨資訊聯邦查詢引擎 - 需求日期区间规范化
// ==========================================
// 职责: 将起讫日期文本展开为来源中实际存在的多种表示
// 约束: 永不失败；无法解析时退化为纯文本匹配
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// 可接受的日期时间格式（按尝试顺序）
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// 可接受的纯日期格式
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

// ==========================================
// DateBound - 区间单端
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct DateBound {
    /// 原始文本（去除首尾空白）
    pub original: String,
    /// 斜线分隔变体 (YYYY/MM/DD)
    pub slash: String,
    /// 短横线分隔变体 (YYYY-MM-DD)
    pub dash: String,
    /// 日历日期（可解析时）
    pub date: Option<NaiveDate>,
    /// 精确时刻（纯日期输入时为当日 00:00）
    pub instant: Option<NaiveDateTime>,
}

impl DateBound {
    pub fn parse(text: &str) -> Self {
        let original = text.trim().to_string();
        let slash = original.replace('-', "/");
        let dash = original.replace('/', "-");
        let instant = parse_instant(&dash);

        Self {
            original,
            slash,
            dash,
            date: instant.map(|dt| dt.date()),
            instant,
        }
    }

    /// 当日 00:00
    pub fn day_start(&self) -> Option<NaiveDateTime> {
        self.date.map(|d| d.and_time(NaiveTime::MIN))
    }

    /// 前缀区间比较用的文本
    ///
    /// 可解析时只取日期部分（YYYY-MM-DD 或 YYYY/MM/DD），否则取原文对应变体
    pub fn prefix_text(&self, separator: char) -> String {
        match (self.date, separator) {
            (Some(d), '/') => d.format("%Y/%m/%d").to_string(),
            (Some(d), _) => d.format("%Y-%m-%d").to_string(),
            (None, '/') => self.slash.clone(),
            (None, _) => self.dash.clone(),
        }
    }

    /// 三种文本变体（去重，保持顺序）
    pub fn text_variants(&self) -> Vec<&str> {
        let mut variants: Vec<&str> = Vec::with_capacity(3);
        for v in [self.original.as_str(), self.slash.as_str(), self.dash.as_str()] {
            if !variants.contains(&v) {
                variants.push(v);
            }
        }
        variants
    }
}

/// 解析短横线形式的日期/日期时间文本
fn parse_instant(dash_text: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(dash_text, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(dash_text, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

// ==========================================
// NormalizedInterval - 规范化区间
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInterval {
    pub start: DateBound,
    pub end: DateBound,
}

impl NormalizedInterval {
    /// 是否为单日区间
    ///
    /// 两端落在同一日历日，或原始文本完全相同
    pub fn is_single_day(&self) -> bool {
        match (self.start.date, self.end.date) {
            (Some(s), Some(e)) => s == e,
            _ => self.start.original == self.end.original,
        }
    }

    /// 日粒度半开区间 [start 00:00, end 次日 00:00)
    ///
    /// 任一端无法解析时返回 None（跳过日历路径）
    pub fn day_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = self.start.date?;
        let end = self.end.date?;
        let end_exclusive = end.checked_add_signed(Duration::days(1))?;
        Some((
            start.and_time(NaiveTime::MIN),
            end_exclusive.and_time(NaiveTime::MIN),
        ))
    }

    /// 两端都可解析且终点早于起点
    pub fn is_inverted(&self) -> bool {
        matches!((self.start.date, self.end.date), (Some(s), Some(e)) if e < s)
    }
}

/// 规范化起讫日期文本
pub fn normalize(start_text: &str, end_text: &str) -> NormalizedInterval {
    NormalizedInterval {
        start: DateBound::parse(start_text),
        end: DateBound::parse(end_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dash_and_slash_forms_parse_to_same_day() {
        let a = DateBound::parse("2024-01-05");
        let b = DateBound::parse("2024/01/05");
        assert_eq!(a.date, Some(ymd(2024, 1, 5)));
        assert_eq!(a.date, b.date);
        assert_eq!(a.slash, "2024/01/05");
        assert_eq!(b.dash, "2024-01-05");
    }

    #[test]
    fn test_datetime_forms_keep_instant() {
        let b = DateBound::parse("2024/01/05T13:45:00");
        assert_eq!(b.date, Some(ymd(2024, 1, 5)));
        assert_eq!(
            b.instant,
            Some(ymd(2024, 1, 5).and_hms_opt(13, 45, 0).unwrap())
        );
        let spaced = DateBound::parse("2024-01-05 13:45:00");
        assert_eq!(spaced.instant, b.instant);
    }

    #[test]
    fn test_compact_form_parses() {
        assert_eq!(DateBound::parse("20240105").date, Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_unparseable_degrades_to_text() {
        let b = DateBound::parse("  下週一 ");
        assert_eq!(b.original, "下週一");
        assert!(b.date.is_none());
        assert!(b.instant.is_none());
        assert_eq!(b.text_variants(), vec!["下週一"]);
    }

    #[test]
    fn test_day_range_is_end_exclusive() {
        let interval = normalize("2024-01-01", "2024/01/31");
        let (lo, hi) = interval.day_range().unwrap();
        assert_eq!(lo, ymd(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(hi, ymd(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap());
        assert!(!interval.is_single_day());
    }

    #[test]
    fn test_single_day_detection() {
        assert!(normalize("2024-01-01", "2024/01/01T09:00:00").is_single_day());
        assert!(normalize("abc", "abc").is_single_day());
        assert!(!normalize("abc", "abd").is_single_day());
    }

    #[test]
    fn test_partial_parse_skips_day_range() {
        let interval = normalize("2024-01-01", "soon");
        assert!(interval.day_range().is_none());
        assert!(!interval.is_inverted());
        assert!(normalize("2024-02-01", "2024-01-01").is_inverted());
    }
}
