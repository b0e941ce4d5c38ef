//! Report assembly: shape the aggregation outputs into table rows and chart
//! series, then emit a self-contained HTML document.
//!
//! The document embeds two ECharts payloads (per-class bars for the current
//! period, per-period history lines), a KPI header with optional trend
//! markers, the narrative text block, and a per-grade breakdown table with
//! alert/good cell classes. Charts render client-side; nothing is rasterized
//! here.

use crate::analytics::{self, Direction, Trend, Trends};
use crate::ingest::{self, Table};
use crate::models::{GradeClassStat, IngestError, PeriodSummary};
use crate::stats;
use serde::Serialize;
use std::fmt::Write as _;

/// One rendered table row with its comparative styling flags. A metric
/// strictly below the current period's weighted average flags "alert".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub class: String,
    pub subjects: String,
    pub hours: i64,
    pub attendance: f64,
    pub microlesson: f64,
    pub correctness: f64,
    pub attendance_alert: bool,
    pub correctness_alert: bool,
}

/// One per-grade table section, rows ranked by hours then correctness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSection {
    pub grade: String,
    pub rows: Vec<TableRow>,
}

/// Current-period chart payload: one category per class, values already
/// rounded to percent with one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSeries {
    pub classes: Vec<String>,
    pub hours: Vec<i64>,
    pub attendance: Vec<f64>,
    pub correctness: Vec<f64>,
}

/// Historical chart payload: one category per period, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySeries {
    pub periods: Vec<String>,
    pub hours: Vec<i64>,
    pub attendance: Vec<f64>,
    pub correctness: Vec<f64>,
}

/// Everything the presentation layer needs for one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub period: String,
    pub previous: Option<String>,
    pub current: PeriodSummary,
    pub trends: Option<Trends>,
    pub top: GradeClassStat,
    pub at_risk: Option<GradeClassStat>,
    pub sections: Vec<GradeSection>,
    pub class_series: ClassSeries,
    pub history: HistorySeries,
}

/// Round a fraction to a percentage with one decimal (chart/table display).
fn pct1(fraction: f64) -> f64 {
    (fraction * 1000.0).round() / 10.0
}

impl Report {
    /// Run the whole per-upload pipeline: column inference, value cleaning,
    /// period partition, aggregation, comparative analytics, and series
    /// materialization.
    pub fn build(table: &Table) -> Result<Report, IngestError> {
        let cols = ingest::infer_columns(&table.headers)?;
        let rows = ingest::clean_rows(table, &cols);

        let periods = stats::sorted_periods(&rows);
        let period = periods.last().ok_or(IngestError::NoPeriods)?.clone();
        let previous = periods
            .len()
            .checked_sub(2)
            .map(|i| periods[i].clone());

        let current_rows = stats::rows_for_period(&rows, &period);
        let current = stats::summarize_period(&period, &current_rows);
        let trends = previous.as_deref().map(|p| {
            let prev_rows = stats::rows_for_period(&rows, p);
            Trends::between(&current, &stats::summarize_period(p, &prev_rows))
        });

        let class_stats = stats::aggregate_classes(&current_rows);
        let top = analytics::top_class(&class_stats)
            .cloned()
            .ok_or(IngestError::NoPeriods)?;
        let at_risk = analytics::at_risk_class(&class_stats, &current).cloned();

        let sections = build_sections(&class_stats, &current);
        let class_series = ClassSeries {
            classes: class_stats.iter().map(|s| s.class.clone()).collect(),
            hours: class_stats.iter().map(|s| s.hours).collect(),
            attendance: class_stats.iter().map(|s| pct1(s.attendance)).collect(),
            correctness: class_stats.iter().map(|s| pct1(s.correctness)).collect(),
        };

        let history_summaries = stats::aggregate_history(&rows);
        let history = HistorySeries {
            periods: history_summaries.iter().map(|h| h.period.clone()).collect(),
            hours: history_summaries.iter().map(|h| h.hours).collect(),
            attendance: history_summaries.iter().map(|h| pct1(h.attendance)).collect(),
            correctness: history_summaries.iter().map(|h| pct1(h.correctness)).collect(),
        };

        Ok(Report {
            period,
            previous,
            current,
            trends,
            top,
            at_risk,
            sections,
            class_series,
            history,
        })
    }
}

/// Group class stats by grade (input order is already natural grade/class
/// order), rank rows within each grade, and stamp the styling flags against
/// the current period's weighted averages.
fn build_sections(class_stats: &[GradeClassStat], current: &PeriodSummary) -> Vec<GradeSection> {
    let mut sections: Vec<GradeSection> = Vec::new();
    for stat in class_stats {
        if sections.last().map(|s| s.grade.as_str()) != Some(stat.grade.as_str()) {
            sections.push(GradeSection {
                grade: stat.grade.clone(),
                rows: Vec::new(),
            });
        }
        let section = sections.last_mut().expect("section just pushed");
        section.rows.push(TableRow {
            class: stat.class.clone(),
            subjects: stat.subjects.clone(),
            hours: stat.hours,
            attendance: pct1(stat.attendance),
            microlesson: pct1(stat.microlesson),
            correctness: pct1(stat.correctness),
            attendance_alert: stat.attendance < current.attendance,
            correctness_alert: stat.correctness < current.correctness,
        });
    }
    for section in &mut sections {
        section.rows.sort_by(|a, b| {
            b.hours
                .cmp(&a.hours)
                .then(b.correctness.partial_cmp(&a.correctness).unwrap_or(std::cmp::Ordering::Equal))
        });
    }
    sections
}

/// Escape text destined for HTML element content.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// JSON destined for an inline `<script>` block must not be able to close it.
fn script_safe(json: String) -> String {
    json.replace("</", "<\\/")
}

fn json_of<T: Serialize>(value: &T) -> String {
    script_safe(serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string()))
}

/// Trend marker span: green ↑ for up, red ↓ for down (zero delta included).
/// Percentage metrics render the delta in points, counts as integers.
fn trend_span(trend: &Trend, is_pct: bool) -> String {
    let (color, arrow) = match trend.direction {
        Direction::Up => ("#2ecc71", "↑"),
        Direction::Down => ("#e74c3c", "↓"),
    };
    let value = if is_pct {
        format!("{:.1}%", trend.delta.abs() * 100.0)
    } else {
        format!("{}", trend.delta.abs() as i64)
    };
    format!("<span style=\"color:{color};font-weight:bold;\">{arrow} {value}</span>")
}

/// Render the complete self-contained report document.
///
/// `narrative` is the confirmed AI (or placeholder) text; newlines become
/// `<br>`. `title` is the configured application title shown as the page
/// heading.
pub fn render_html(report: &Report, narrative: &str, title: &str) -> String {
    let (th, ta, tc) = match &report.trends {
        Some(t) => (
            trend_span(&t.hours, false),
            trend_span(&t.attendance, true),
            trend_span(&t.correctness, true),
        ),
        None => (String::new(), String::new(), String::new()),
    };

    let best_html = format!(
        "<div class=\"highlight-box success-box\">🏆 <strong>综合标杆：{}</strong> (课时:{} / 正确率:{:.1}%)</div>",
        html_escape(&report.top.class),
        report.top.hours,
        report.top.correctness * 100.0
    );
    let focus_html = match &report.at_risk {
        Some(f) => format!(
            "<div class=\"highlight-box warning-box\">⚠️ <strong>重点关注：{}</strong> (出勤:{:.1}% 正常，但正确率 {:.1}% 偏低)</div>",
            html_escape(&f.class),
            f.attendance * 100.0,
            f.correctness * 100.0
        ),
        None => String::new(),
    };

    let mut tbl_html = String::new();
    for section in &report.sections {
        let _ = write!(
            tbl_html,
            "<h3>{}</h3><table><thead><tr><th>班级</th><th>学科</th><th>课时</th><th>出勤</th><th>微课</th><th>正确率</th></tr></thead><tbody>",
            html_escape(&section.grade)
        );
        for row in &section.rows {
            let ca = if row.attendance_alert { "alert" } else { "good" };
            let cc = if row.correctness_alert { "alert" } else { "good" };
            let _ = write!(
                tbl_html,
                "<tr><td><b>{}</b></td><td style='color:#999;font-size:12px'>{}</td><td>{}</td><td class='{ca}'>{:.1}%</td><td>{:.1}%</td><td class='{cc}'>{:.1}%</td></tr>",
                html_escape(&row.class),
                html_escape(&row.subjects),
                row.hours,
                row.attendance,
                row.microlesson,
                row.correctness
            );
        }
        tbl_html.push_str("</tbody></table>");
    }

    let compare_note = match &report.previous {
        Some(p) => format!("(对比: {})", html_escape(p)),
        None => String::new(),
    };
    let narrative_html = html_escape(narrative).replace('\n', "<br>");

    let js_cls = json_of(&report.class_series.classes);
    let js_h = json_of(&report.class_series.hours);
    let js_a = json_of(&report.class_series.attendance);
    let js_c = json_of(&report.class_series.correctness);
    let js_td = json_of(&report.history.periods);
    let js_th = json_of(&report.history.hours);
    let js_ta = json_of(&report.history.attendance);
    let js_tc = json_of(&report.history.correctness);

    format!(
        r#"<!DOCTYPE html><html><head><meta charset="UTF-8">
<title>{title}</title>
<script src="https://cdn.jsdelivr.net/npm/echarts@5.4.3/dist/echarts.min.js"></script>
<style>
    body {{ font-family: "Microsoft YaHei", sans-serif; max-width: 1000px; margin: 0 auto; padding: 20px; background: #f4f6f9; }}
    .card {{ background: #fff; padding: 20px; margin-bottom: 20px; border-radius: 8px; box-shadow: 0 2px 5px rgba(0,0,0,0.05); }}
    .kpi {{ display: flex; justify-content: space-around; text-align: center; }}
    .kpi div strong {{ font-size: 30px; color: #2980b9; display: block; }}
    .highlight-box {{ padding: 15px; margin: 10px 0; border-radius: 5px; font-size: 14px; }}
    .success-box {{ background: #d4edda; color: #155724; border-left: 5px solid #28a745; }}
    .warning-box {{ background: #fff3cd; color: #856404; border-left: 5px solid #ffc107; }}
    .ai-box {{ background: #e8f4fd; border-left: 5px solid #3498db; color: #2c3e50; padding: 20px; line-height: 1.8; }}
    table {{ width: 100%; border-collapse: collapse; margin-top: 10px; font-size: 14px; }}
    th {{ background: #eee; padding: 10px; border-bottom: 2px solid #ddd; }} td {{ padding: 10px; border-bottom: 1px solid #eee; text-align: center; }}
    .alert {{ color: #e74c3c; font-weight: bold; }} .good {{ color: #27ae60; }}
    .chart {{ height: 400px; width: 100%; }}
    .footer {{ text-align:center; color:#999; font-size:12px; margin-top:20px; }}
</style></head><body>
    <h2 style="text-align:center">{heading}</h2>
    <div style="text-align:center;color:#666;margin-bottom:20px">周期: <b>{period}</b> {compare_note}</div>
    <div class="card">
        <h3>📊 本周核心指标</h3>
        <div class="kpi">
            <div><strong>{hours}{th}</strong>总课时</div>
            <div><strong>{att:.1}%{ta}</strong>出勤率</div>
            <div><strong>{corr:.1}%{tc}</strong>正确率</div>
        </div>{best_html}{focus_html}
    </div>
    <div class="card"><h3>🤖 智能教学反馈</h3><div class="ai-box">{narrative_html}</div></div>
    <div class="card"><h3>🏫 班级效能分析</h3><div id="c1" class="chart"></div></div>
    <div class="card"><h3>📋 详细数据</h3><p style="text-align:right;color:#999;font-size:12px">* 红字低于校均</p>{tbl_html}</div>
    <div class="card"><h3>📈 历史趋势</h3><div id="c2" class="chart"></div></div>
    <div class="footer">Generated by classpulse</div>
    <script>
        var c1 = echarts.init(document.getElementById('c1'));
        c1.setOption({{
            tooltip: {{trigger:'axis'}}, legend: {{bottom:0}}, grid: {{left:'3%',right:'4%',bottom:'10%',containLabel:true}},
            xAxis: {{type:'category',data:{js_cls},axisLabel:{{rotate:30}}}},
            yAxis: [{{type:'value',name:'课时'}},{{type:'value',name:'%',max:100}}],
            series: [
                {{type:'bar',name:'课时',data:{js_h},itemStyle:{{color:'#3498db'}}}},
                {{type:'line',yAxisIndex:1,name:'出勤',data:{js_a},itemStyle:{{color:'#2ecc71'}}}},
                {{type:'line',yAxisIndex:1,name:'正确',data:{js_c},itemStyle:{{color:'#e74c3c'}}}}
            ]
        }});
        var c2 = echarts.init(document.getElementById('c2'));
        c2.setOption({{
            tooltip: {{trigger:'axis'}}, legend: {{bottom:0}}, grid: {{left:'3%',right:'4%',bottom:'10%',containLabel:true}},
            xAxis: {{type:'category',data:{js_td}}},
            yAxis: [{{type:'value',name:'课时'}},{{type:'value',name:'%',max:100}}],
            series: [
                {{type:'bar',name:'课时',data:{js_th},itemStyle:{{color:'#9b59b6'}}}},
                {{type:'line',yAxisIndex:1,name:'出勤',data:{js_ta},itemStyle:{{color:'#2ecc71'}}}},
                {{type:'line',yAxisIndex:1,name:'正确',data:{js_tc},itemStyle:{{color:'#e74c3c'}}}}
            ]
        }});
        window.onresize = function(){{c1.resize();c2.resize();}};
    </script>
</body></html>
"#,
        title = html_escape(title),
        heading = html_escape(title),
        period = html_escape(&report.period),
        hours = report.current.hours,
        att = report.current.attendance * 100.0,
        corr = report.current.correctness * 100.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct1_rounds_to_one_decimal() {
        assert_eq!(pct1(0.875), 87.5);
        assert_eq!(pct1(2.0 / 3.0), 66.7);
        assert_eq!(pct1(0.0), 0.0);
        assert_eq!(pct1(1.0), 100.0);
    }

    #[test]
    fn script_safe_cannot_close_the_block() {
        let json = json_of(&vec!["</script>".to_string()]);
        assert!(!json.contains("</script>"));
    }
}
