//! Hour-weighted aggregation over cleaned rows.
//!
//! Two groupings: by (grade, class) within one period for the breakdown
//! table, and by period across the whole upload for the history series.
//! Weighted averages guard the zero-hour case (defined as 0.0, never NaN).

use crate::ingest::grade_of;
use crate::models::{GradeClassStat, PeriodSummary, RawRow};
use crate::natkey::natural_key;
use std::collections::BTreeMap;

/// Hour-weighted average of `metric` over `rows`: Σ(metric·hours)/Σ(hours),
/// or 0.0 when the group has no hours.
pub fn weighted_avg(rows: &[&RawRow], metric: impl Fn(&RawRow) -> f64) -> f64 {
    let total: f64 = rows.iter().map(|r| r.hours).sum();
    if total == 0.0 {
        return 0.0;
    }
    rows.iter().map(|r| metric(r) * r.hours).sum::<f64>() / total
}

/// Distinct period labels in the rows, sorted in natural order (oldest
/// first). The last element is the current period, the second-to-last the
/// previous one.
pub fn sorted_periods(rows: &[RawRow]) -> Vec<String> {
    let mut seen = Vec::new();
    for r in rows {
        if !seen.iter().any(|p: &String| *p == r.period) {
            seen.push(r.period.clone());
        }
    }
    seen.sort_by_key(|p| natural_key(p));
    seen
}

/// Rows belonging to one period.
pub fn rows_for_period<'a>(rows: &'a [RawRow], period: &str) -> Vec<&'a RawRow> {
    rows.iter().filter(|r| r.period == period).collect()
}

/// Whole-period aggregate: total hours (truncated to integer) plus the
/// hour-weighted attendance and correctness across all classes.
pub fn summarize_period(period: &str, rows: &[&RawRow]) -> PeriodSummary {
    PeriodSummary {
        period: period.to_string(),
        hours: rows.iter().map(|r| r.hours).sum::<f64>() as i64,
        attendance: weighted_avg(rows, |r| r.attendance),
        correctness: weighted_avg(rows, |r| r.correctness),
    }
}

/// Per-(grade, class) aggregates for one period's rows, sorted by the
/// natural key of the grade then of the class name.
pub fn aggregate_classes(rows: &[&RawRow]) -> Vec<GradeClassStat> {
    let mut groups: BTreeMap<(String, String), Vec<&RawRow>> = BTreeMap::new();
    for &r in rows {
        let key = (grade_of(&r.class), r.class.clone());
        groups.entry(key).or_default().push(r);
    }

    let mut out: Vec<GradeClassStat> = groups
        .into_iter()
        .map(|((grade, class), members)| GradeClassStat {
            hours: members.iter().map(|r| r.hours).sum::<f64>() as i64,
            attendance: weighted_avg(&members, |r| r.attendance),
            correctness: weighted_avg(&members, |r| r.correctness),
            microlesson: weighted_avg(&members, |r| r.microlesson),
            subjects: join_subjects(&members),
            grade,
            class,
        })
        .collect();

    out.sort_by_key(|s| (natural_key(&s.grade), natural_key(&s.class)));
    out
}

/// Distinct subjects in first-seen order; "-" when the upload carried no
/// subject column.
fn join_subjects(rows: &[&RawRow]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for r in rows {
        if let Some(s) = r.subject.as_deref() {
            if !seen.contains(&s) {
                seen.push(s);
            }
        }
    }
    if seen.is_empty() {
        "-".to_string()
    } else {
        seen.join(",")
    }
}

/// One summary per distinct period in the upload, sorted by natural period
/// order — the full historical time series.
pub fn aggregate_history(rows: &[RawRow]) -> Vec<PeriodSummary> {
    sorted_periods(rows)
        .iter()
        .map(|p| summarize_period(p, &rows_for_period(rows, p)))
        .collect()
}
