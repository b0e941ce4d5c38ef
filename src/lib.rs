//! classpulse
//!
//! A lightweight Rust library for turning a weekly classroom-activity export
//! (attendance, correctness rate, micro-lesson completion, class/grade
//! identifiers) into period-keyed teaching-quality statistics and a
//! self-contained interactive HTML report. Pairs with the `classpulse` CLI.
//!
//! ### Features
//! - Heuristic column inference over arbitrarily-shaped uploads
//! - Natural ordering of mixed numeric/CJK period and grade labels
//! - Hour-weighted aggregation with period-over-period trend deltas
//! - Top-class and needs-attention selection heuristics
//! - HTML report with embedded chart payloads and an AI-written narrative
//!
//! ### Example
//! ```no_run
//! use classpulse::{ingest, report::Report};
//!
//! let table = ingest::read_table("班级数据.csv")?;
//! let report = Report::build(&table)?;
//! let html = classpulse::report::render_html(&report, "本周整体平稳。", "AI课堂教学数据分析工具");
//! std::fs::write("周报.html", html)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod ai;
pub mod analytics;
pub mod audit;
pub mod config;
pub mod ingest;
pub mod models;
pub mod natkey;
pub mod report;
pub mod stats;

pub use config::AppConfig;
pub use models::{ColumnMap, GradeClassStat, IngestError, PeriodSummary, RawRow};
pub use report::Report;
