//! Upload ingestion: CSV reading, heuristic column inference, and value
//! normalization.
//!
//! The upload is trusted beyond these heuristics — arbitrary column order and
//! renamed headers are tolerated via substring matching, percentage-like
//! cells arrive with or without a `%` suffix, and a literal 合计/Total marker
//! row is dropped before any aggregation.

use crate::models::{ColumnMap, IngestError, RateParseError, RawRow, Role};
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Raw uploaded table: one header row plus string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Position of a header label, if it exists in the table.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    /// Cell under `label` for row `row`; empty string when the label maps to
    /// no real column or the row is short. Fallback labels synthesized by
    /// inference land here, so a missing column produces defaults, not an
    /// indexing error.
    pub fn cell<'a>(&self, row: &'a [String], label: &str) -> &'a str {
        self.column_index(label)
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Read a delimited upload into a [`Table`]. Short records are padded so
/// every row has one cell per header.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("读取文件 {}", path.display()))?;

    let headers: Vec<String> = rdr
        .headers()
        .context("读取表头")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.context("读取数据行")?;
        let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

/// Substring rule table for role inference, checked in order per header;
/// the first matching rule decides that header's role. The period role is
/// assigned separately (named column or first column), never by keyword.
fn role_of(header: &str) -> Option<Role> {
    let has = |kw: &str| header.contains(kw);
    if has("出勤") || has("attendance") {
        Some(Role::Attendance)
    } else if has("正确") || has("correct") {
        Some(Role::Correctness)
    } else if (has("微课") && has("率")) || (has("micro") && has("rate")) {
        Some(Role::Microlesson)
    } else if (has("课时") && has("数")) || has("hours") {
        Some(Role::Hours)
    } else if has("班级") || has("class") {
        Some(Role::Class)
    } else if has("学科") || has("subject") {
        Some(Role::Subject)
    } else {
        None
    }
}

/// Map the upload's headers onto the semantic roles of the pipeline.
///
/// The period column is a header literally named 周 (or period/week) when
/// present, else the first column. Every header is then matched against the
/// substring rule table; a later header matching an already-filled role
/// overwrites it (last match wins — kept as-is rather than silently fixed).
/// Unmatched required roles fall back to fixed labels that may not exist in
/// the table; [`Table::cell`] treats those as empty cells.
pub fn infer_columns(headers: &[String]) -> Result<ColumnMap, IngestError> {
    let period = headers
        .iter()
        .find(|h| *h == "周" || *h == "period" || *h == "week")
        .or_else(|| headers.first())
        .ok_or(IngestError::EmptyTable)?
        .clone();

    let mut class = None;
    let mut subject = None;
    let mut hours = None;
    let mut attendance = None;
    let mut correctness = None;
    let mut microlesson = None;

    for h in headers {
        match role_of(h) {
            Some(Role::Attendance) => attendance = Some(h.clone()),
            Some(Role::Correctness) => correctness = Some(h.clone()),
            Some(Role::Microlesson) => microlesson = Some(h.clone()),
            Some(Role::Hours) => hours = Some(h.clone()),
            Some(Role::Class) => class = Some(h.clone()),
            Some(Role::Subject) => subject = Some(h.clone()),
            Some(Role::Period) | None => {}
        }
    }

    Ok(ColumnMap {
        period,
        class: class.unwrap_or_else(|| "班级名称".to_string()),
        hours: hours.unwrap_or_else(|| "课时数".to_string()),
        attendance: attendance.unwrap_or_else(|| "课时平均出勤率".to_string()),
        correctness: correctness.unwrap_or_else(|| "题目正确率".to_string()),
        subject,
        microlesson,
    })
}

/// Coerce a percentage-like cell into a fraction.
///
/// `"87%"` → 0.87, `"0.87"` → 0.87, `""` → 0.0. Values above 100% pass
/// through unclamped. Anything non-numeric after stripping the suffix is a
/// [`RateParseError`]; the caller decides between fail-fast and
/// default-to-zero.
pub fn clean_percentage(raw: &str) -> Result<f64, RateParseError> {
    let s = raw.trim();
    if s.contains('%') {
        let bare = s.trim_end_matches('%').trim();
        bare.parse::<f64>()
            .map(|v| v / 100.0)
            .map_err(|_| RateParseError { cell: s.to_string() })
    } else if s.is_empty() {
        Ok(0.0)
    } else {
        s.parse::<f64>()
            .map_err(|_| RateParseError { cell: s.to_string() })
    }
}

fn grade_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(.*?级)").expect("grade regex"))
}

/// Extract the grade from a class name by its trailing 级 marker; class names
/// without one land in the 其他 bucket.
pub fn grade_of(class_name: &str) -> String {
    grade_marker()
        .captures(class_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "其他".to_string())
}

/// Default-to-zero policy for bad numeric cells, applied uniformly to rate
/// and hour columns: the cell is logged and the upload continues, a single
/// bad cell never aborts ingestion.
fn rate_or_zero(raw: &str, column: &str) -> f64 {
    match clean_percentage(raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("列 {column} 中{e}，按 0 处理");
            0.0
        }
    }
}

fn hours_or_zero(raw: &str, column: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            log::warn!("列 {column} 中无法解析的课时数值 {s:?}，按 0 处理");
            0.0
        }
    }
}

/// Clean the upload into typed rows: drop 合计/Total marker rows, normalize
/// rates to fractions, and parse hours. Column lookups go through the
/// inferred [`ColumnMap`], so synthesized fallback labels yield zeros and
/// empty strings rather than errors.
pub fn clean_rows(table: &Table, cols: &ColumnMap) -> Vec<RawRow> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let period = table.cell(row, &cols.period).trim().to_string();
            if period == "合计" || period == "Total" {
                return None;
            }
            Some(RawRow {
                period,
                class: table.cell(row, &cols.class).trim().to_string(),
                subject: cols
                    .subject
                    .as_ref()
                    .map(|c| table.cell(row, c).trim().to_string()),
                hours: hours_or_zero(table.cell(row, &cols.hours), &cols.hours),
                attendance: rate_or_zero(table.cell(row, &cols.attendance), &cols.attendance),
                correctness: rate_or_zero(table.cell(row, &cols.correctness), &cols.correctness),
                microlesson: cols
                    .microlesson
                    .as_ref()
                    .map(|c| rate_or_zero(table.cell(row, c), c))
                    .unwrap_or(0.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_percentage_handles_suffix_plain_and_blank() {
        assert_eq!(clean_percentage("87%").unwrap(), 0.87);
        assert_eq!(clean_percentage("0.87").unwrap(), 0.87);
        assert_eq!(clean_percentage("").unwrap(), 0.0);
        assert_eq!(clean_percentage(" 95 % ").unwrap(), 0.95);
    }

    #[test]
    fn clean_percentage_passes_values_above_one_unclamped() {
        assert_eq!(clean_percentage("120%").unwrap(), 1.2);
        assert_eq!(clean_percentage("1.5").unwrap(), 1.5);
    }

    #[test]
    fn clean_percentage_rejects_garbage() {
        assert!(clean_percentage("abc").is_err());
        assert!(clean_percentage("12a%").is_err());
    }

    #[test]
    fn inference_matches_renamed_headers_by_substring() {
        let cols = infer_columns(&headers(&[
            "周",
            "班级名称",
            "学科",
            "课时数",
            "课时平均出勤率",
            "题目正确率",
            "微课完成率",
        ]))
        .unwrap();
        assert_eq!(cols.period, "周");
        assert_eq!(cols.class, "班级名称");
        assert_eq!(cols.hours, "课时数");
        assert_eq!(cols.attendance, "课时平均出勤率");
        assert_eq!(cols.correctness, "题目正确率");
        assert_eq!(cols.subject.as_deref(), Some("学科"));
        assert_eq!(cols.microlesson.as_deref(), Some("微课完成率"));
    }

    #[test]
    fn first_column_is_period_when_none_is_named_for_it() {
        let cols = infer_columns(&headers(&["时间", "班级"])).unwrap();
        assert_eq!(cols.period, "时间");
    }

    #[test]
    fn unmatched_required_roles_get_fallback_labels() {
        let cols = infer_columns(&headers(&["周", "备注"])).unwrap();
        assert_eq!(cols.class, "班级名称");
        assert_eq!(cols.hours, "课时数");
        assert!(cols.subject.is_none());
        assert!(cols.microlesson.is_none());
    }

    #[test]
    fn later_matching_header_overwrites_the_role() {
        // Last match wins when two headers hit the same role.
        let cols = infer_columns(&headers(&["周", "出勤率(旧)", "课时平均出勤率"])).unwrap();
        assert_eq!(cols.attendance, "课时平均出勤率");
    }

    #[test]
    fn empty_header_row_is_an_ingest_error() {
        assert!(matches!(infer_columns(&[]), Err(IngestError::EmptyTable)));
    }

    #[test]
    fn grade_extraction_stops_at_first_marker() {
        assert_eq!(grade_of("九年级2班"), "九年级");
        assert_eq!(grade_of("高一年级10班"), "高一年级");
        assert_eq!(grade_of("实验班"), "其他");
    }

    #[test]
    fn clean_rows_drops_total_markers_and_defaults_bad_cells() {
        let table = Table {
            headers: headers(&["周", "班级名称", "课时数", "课时平均出勤率", "题目正确率"]),
            rows: vec![
                vec!["第1周", "九年级1班", "10", "90%", "0.8"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                vec!["合计", "", "10", "90%", "0.8"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                vec!["第1周", "九年级2班", "n/a", "oops", ""]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ],
        };
        let cols = infer_columns(&table.headers).unwrap();
        let rows = clean_rows(&table, &cols);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].attendance, 0.9);
        assert_eq!(rows[0].correctness, 0.8);
        assert_eq!(rows[1].hours, 0.0);
        assert_eq!(rows[1].attendance, 0.0);
        assert_eq!(rows[1].correctness, 0.0);
    }
}
