//! Append-only audit logs: access events and feedback entries.
//!
//! Flat CSV files with a fixed header written on first append. Single-writer
//! by assumption (one interactive admin/teacher at a time); concurrent
//! writers would need a lock or an append-safe store.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::path::Path;

pub const ACCESS_LOG: &str = "access_log.csv";
pub const FEEDBACK_LOG: &str = "feedback_log.csv";

const ACCESS_HEADER: [&str; 3] = ["访问时间", "IP地址", "事件"];
const FEEDBACK_HEADER: [&str; 3] = ["时间", "评价", "建议"];

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn append_record<P: AsRef<Path>>(path: P, header: &[&str; 3], record: &[&str; 3]) -> Result<()> {
    let path = path.as_ref();
    let is_new = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志 {}", path.display()))?;
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if is_new {
        wtr.write_record(header)?;
    }
    wtr.write_record(record)?;
    wtr.flush()?;
    Ok(())
}

/// Append one access event; `client_id` defaults to "Unknown" upstream when
/// the caller has no identity to report.
pub fn log_access<P: AsRef<Path>>(path: P, client_id: &str, event: &str) -> Result<()> {
    append_record(path, &ACCESS_HEADER, &[&timestamp(), client_id, event])
}

/// Append one feedback entry (rating token plus free-text comment).
pub fn log_feedback<P: AsRef<Path>>(path: P, rating: &str, comment: &str) -> Result<()> {
    append_record(path, &FEEDBACK_HEADER, &[&timestamp(), rating, comment])
}
