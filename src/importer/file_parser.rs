// ==========================================
// 撿貨資訊聯邦查詢引擎 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 第一张工作表（或 CSV 全文）按表头展开的松散类型记录
// ==========================================

use crate::domain::{FieldValue, Record, DATETIME_TEXT_FORMAT};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件为记录列表（跳过全空行）
    fn parse_to_records(&self, file_path: &Path) -> ImportResult<Vec<Record>>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_records(&self, file_path: &Path) -> ImportResult<Vec<Record>> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            let record: Record = headers
                .iter()
                .zip(row.iter())
                .map(|(header, value)| (header.clone(), infer_text_value(value)))
                .collect();

            // 跳过完全空白的行
            if record.is_blank() {
                continue;
            }
            records.push(record);
        }

        Ok(records)
    }
}

/// CSV 单元格类型推断
///
/// - 空白 / NaN / NaT → Null
/// - 整数 → Int（补零数字保持文本，避免料號丢失前导零）
/// - 浮点 → Float
/// - true/false → Bool
/// - 其余 → Text（去除首尾空白）
pub fn infer_text_value(raw: &str) -> FieldValue {
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") || value == "NaT" {
        return FieldValue::Null;
    }

    let digits = value.trim_start_matches(['-', '+']);
    let zero_padded = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if !zero_padded {
        if let Ok(i) = value.parse::<i64>() {
            return FieldValue::Int(i);
        }
        if let Ok(f) = value.parse::<f64>() {
            if f.is_finite() {
                return FieldValue::Float(f);
            }
        }
    }

    if value.eq_ignore_ascii_case("true") {
        return FieldValue::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return FieldValue::Bool(false);
    }

    FieldValue::Text(value.to_string())
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_records(&self, file_path: &Path) -> ImportResult<Vec<Record>> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut rows = range.rows();
        let header_row = match rows.next() {
            Some(row) => row,
            None => return Ok(Vec::new()),
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for data_row in rows {
            let record: Record = headers
                .iter()
                .zip(data_row.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_value(cell)))
                .collect();

            if record.is_blank() {
                continue;
            }
            records.push(record);
        }

        Ok(records)
    }
}

/// Excel 单元格 → 字段值
fn cell_value(cell: &Data) -> FieldValue {
    match cell {
        Data::Int(i) => FieldValue::Int(*i),
        Data::Float(f) if f.is_nan() => FieldValue::Null,
        Data::Float(f) => FieldValue::Float(*f),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Text(trimmed.to_string())
            }
        }
        Data::Bool(b) => FieldValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(FieldValue::DateTime)
            .unwrap_or(FieldValue::Null),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, DATETIME_TEXT_FORMAT)
            .map(FieldValue::DateTime)
            .or_else(|_| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| FieldValue::DateTime(d.and_time(chrono::NaiveTime::MIN)))
            })
            .unwrap_or_else(|_| FieldValue::Text(s.clone())),
        Data::DurationIso(s) => FieldValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => FieldValue::Null,
    }
}

/// Excel 序列日期（1900 体系）→ NaiveDateTime，精度到毫秒
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_records(&self, file_path: &Path) -> ImportResult<Vec<Record>> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_to_records(file_path),
            "xlsx" | "xls" => ExcelParser.parse_to_records(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
