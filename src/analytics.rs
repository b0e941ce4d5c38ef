//! Period-over-period comparisons and class selection heuristics.

use crate::models::{GradeClassStat, PeriodSummary};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

/// Signed change of one metric versus the previous period. A delta of
/// exactly zero renders as [`Direction::Down`] with magnitude 0; there is
/// no separate "flat" state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub delta: f64,
    pub direction: Direction,
}

impl Trend {
    pub fn between(current: f64, previous: f64) -> Self {
        let delta = current - previous;
        let direction = if delta > 0.0 { Direction::Up } else { Direction::Down };
        Trend { delta, direction }
    }
}

/// The three headline trends, present only when a previous period exists.
/// An absent previous period suppresses trend display entirely; there is no
/// zero-filled fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    pub hours: Trend,
    pub attendance: Trend,
    pub correctness: Trend,
}

impl Trends {
    pub fn between(current: &PeriodSummary, previous: &PeriodSummary) -> Self {
        Trends {
            hours: Trend::between(current.hours as f64, previous.hours as f64),
            attendance: Trend::between(current.attendance, previous.attendance),
            correctness: Trend::between(current.correctness, previous.correctness),
        }
    }
}

/// Stable compound ordering for class ranking: hours descending, then
/// correctness descending. Shared by the top-class pick and the per-grade
/// table rows.
pub fn rank_order(a: &GradeClassStat, b: &GradeClassStat) -> Ordering {
    b.hours
        .cmp(&a.hours)
        .then(b.correctness.partial_cmp(&a.correctness).unwrap_or(Ordering::Equal))
}

/// The designated top performer: first row after a stable sort by
/// [`rank_order`]. Fully tied rows resolve to whichever came first in the
/// input order.
pub fn top_class(stats: &[GradeClassStat]) -> Option<&GradeClassStat> {
    let mut ranked: Vec<&GradeClassStat> = stats.iter().collect();
    ranked.sort_by(|a, b| rank_order(a, b));
    ranked.first().copied()
}

/// The class flagged for attention: above-average attendance but
/// below-average correctness, first match in the given row order (not
/// re-sorted). `None` when no class fits.
pub fn at_risk_class<'a>(
    stats: &'a [GradeClassStat],
    current: &PeriodSummary,
) -> Option<&'a GradeClassStat> {
    stats
        .iter()
        .find(|s| s.attendance > current.attendance && s.correctness < current.correctness)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(class: &str, hours: i64, att: f64, corr: f64) -> GradeClassStat {
        GradeClassStat {
            grade: "九年级".to_string(),
            class: class.to_string(),
            hours,
            attendance: att,
            correctness: corr,
            microlesson: 0.0,
            subjects: "-".to_string(),
        }
    }

    #[test]
    fn trend_direction_matches_sign_of_delta() {
        let up = Trend::between(120.0, 100.0);
        assert_eq!(up.direction, Direction::Up);
        assert_eq!(up.delta, 20.0);

        let down = Trend::between(0.70, 0.75);
        assert_eq!(down.direction, Direction::Down);
        assert!((down.delta + 0.05).abs() < 1e-9);
    }

    #[test]
    fn zero_delta_renders_as_down() {
        let flat = Trend::between(0.8, 0.8);
        assert_eq!(flat.direction, Direction::Down);
        assert_eq!(flat.delta, 0.0);
    }

    #[test]
    fn top_class_prefers_hours_then_correctness() {
        let stats = vec![
            stat("九年级1班", 8, 0.9, 0.95),
            stat("九年级2班", 10, 0.8, 0.60),
            stat("九年级3班", 10, 0.8, 0.70),
        ];
        assert_eq!(top_class(&stats).unwrap().class, "九年级3班");
    }

    #[test]
    fn top_class_tie_resolves_to_first_input_row() {
        let stats = vec![
            stat("A", 10, 0.9, 0.9),
            stat("B", 10, 0.9, 0.9),
        ];
        assert_eq!(top_class(&stats).unwrap().class, "A");
    }

    #[test]
    fn at_risk_needs_high_attendance_and_low_correctness() {
        let current = PeriodSummary {
            period: "第2周".to_string(),
            hours: 30,
            attendance: 0.85,
            correctness: 0.80,
        };
        let stats = vec![
            stat("九年级1班", 10, 0.80, 0.70), // attendance below average
            stat("九年级2班", 10, 1.00, 0.60), // flagged
            stat("九年级3班", 10, 0.95, 0.55), // also qualifies, but later
        ];
        assert_eq!(at_risk_class(&stats, &current).unwrap().class, "九年级2班");
    }

    #[test]
    fn no_at_risk_class_when_none_qualifies() {
        let current = PeriodSummary {
            period: "第2周".to_string(),
            hours: 10,
            attendance: 0.85,
            correctness: 0.80,
        };
        let stats = vec![stat("九年级1班", 10, 0.9, 0.9)];
        assert!(at_risk_class(&stats, &current).is_none());
    }
}
