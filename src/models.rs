use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic roles the pipeline needs out of an uploaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Period,
    Class,
    Subject,
    Hours,
    Attendance,
    Correctness,
    Microlesson,
}

/// Mapping from semantic role to the actual column label found in the upload.
///
/// Built once per upload by [`crate::ingest::infer_columns`] and immutable
/// afterwards. Required roles that inference could not match carry a fixed
/// fallback label which may not exist in the table; cell lookup against a
/// missing label yields an empty cell, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub period: String,
    pub class: String,
    pub hours: String,
    pub attendance: String,
    pub correctness: String,
    pub subject: Option<String>,
    pub microlesson: Option<String>,
}

/// One cleaned spreadsheet record (one class, one subject, one period).
///
/// Rates are canonical fractions in `0..1` (values above 1.0 pass through
/// unclamped); `microlesson` is 0.0 when the upload carries no such column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub period: String,
    pub class: String,
    pub subject: Option<String>,
    pub hours: f64,
    pub attendance: f64,
    pub correctness: f64,
    pub microlesson: f64,
}

/// Per-(grade, class) aggregate within one period.
///
/// Invariant: the rate fields are hour-weighted averages whose weights sum to
/// `hours`; a class with zero total hours has all rates defined as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeClassStat {
    pub grade: String,
    pub class: String,
    pub hours: i64,
    pub attendance: f64,
    pub correctness: f64,
    pub microlesson: f64,
    /// Distinct subjects seen for the class, comma-joined in first-seen
    /// order; "-" when the upload has no subject column.
    pub subjects: String,
}

/// Whole-period aggregate across all classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: String,
    pub hours: i64,
    pub attendance: f64,
    pub correctness: f64,
}

/// Fatal per-upload ingestion failures. These halt the pipeline with a single
/// user-visible message; no partial report is rendered.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("上传的表格没有表头，无法识别列")]
    EmptyTable,
    #[error("时间数据无效：过滤合计行后没有可用的周期数据")]
    NoPeriods,
}

/// A percentage-like cell that is neither blank nor numeric after stripping
/// the `%` suffix. Callers pick the policy (default-to-zero vs. reject).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("无法解析的百分比数值: {cell:?}")]
pub struct RateParseError {
    pub cell: String,
}
