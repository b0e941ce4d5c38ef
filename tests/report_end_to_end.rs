use classpulse::analytics::Direction;
use classpulse::ingest::{self, Table};
use classpulse::models::IngestError;
use classpulse::report::{Report, render_html};
use std::io::Write;

fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table {
        headers: headers.iter().map(|s| s.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

const HEADERS: [&str; 6] = ["周", "班级名称", "学科", "课时数", "课时平均出勤率", "题目正确率"];

/// Two periods, two classes. Class 九年级1班 has full attendance but low
/// correctness against a school average of 80%, so it is the single
/// needs-attention pick.
fn two_period_table() -> Table {
    table(
        &HEADERS,
        &[
            &["第1周", "九年级1班", "语文", "8", "100%", "60%"],
            &["第1周", "九年级2班", "语文", "8", "60%", "100%"],
            &["第2周", "九年级1班", "语文", "10", "100%", "60%"],
            &["第2周", "九年级2班", "语文", "10", "60%", "100%"],
            &["合计", "", "", "36", "80%", "80%"],
        ],
    )
}

#[test]
fn at_risk_and_trends_on_a_two_period_dataset() {
    let report = Report::build(&two_period_table()).unwrap();

    assert_eq!(report.period, "第2周");
    assert_eq!(report.previous.as_deref(), Some("第1周"));
    assert_eq!(report.current.hours, 20);
    assert!((report.current.attendance - 0.8).abs() < 1e-9);
    assert!((report.current.correctness - 0.8).abs() < 1e-9);

    // Hours grew by 4; both rates are flat, and a zero delta renders "down".
    let trends = report.trends.expect("two periods give trends");
    assert_eq!(trends.hours.direction, Direction::Up);
    assert_eq!(trends.hours.delta, 4.0);
    assert_eq!(trends.attendance.direction, Direction::Down);
    assert_eq!(trends.attendance.delta, 0.0);

    // Hours tie at 10, correctness breaks the tie.
    assert_eq!(report.top.class, "九年级2班");
    assert_eq!(report.at_risk.as_ref().unwrap().class, "九年级1班");
}

#[test]
fn single_period_suppresses_trends_but_keeps_kpi_totals() {
    let single = table(
        &HEADERS,
        &[
            &["第2周", "九年级1班", "语文", "10", "100%", "60%"],
            &["第2周", "九年级2班", "语文", "10", "60%", "100%"],
        ],
    );
    let report = Report::build(&single).unwrap();

    assert!(report.trends.is_none());
    assert!(report.previous.is_none());
    assert_eq!(report.current.hours, 20);
    assert!((report.current.attendance - 0.8).abs() < 1e-9);
    assert_eq!(report.at_risk.as_ref().unwrap().class, "九年级1班");

    let html = render_html(&report, "一切平稳。", "AI课堂教学数据分析工具");
    assert!(!html.contains('↑'));
    assert!(!html.contains('↓'));
    assert!(!html.contains("对比:"));
}

#[test]
fn header_only_upload_is_an_ingestion_error_not_a_crash() {
    let empty = table(&HEADERS, &[]);
    assert!(matches!(Report::build(&empty), Err(IngestError::NoPeriods)));

    let only_total = table(&HEADERS, &[&["合计", "", "", "36", "80%", "80%"]]);
    assert!(matches!(
        Report::build(&only_total),
        Err(IngestError::NoPeriods)
    ));
}

#[test]
fn periods_partition_in_natural_order_across_the_pipeline() {
    let t = table(
        &HEADERS,
        &[
            &["第10周", "九年级1班", "语文", "5", "90%", "80%"],
            &["第9周", "九年级1班", "语文", "4", "85%", "75%"],
            &["第2周", "九年级1班", "语文", "3", "80%", "70%"],
        ],
    );
    let report = Report::build(&t).unwrap();
    assert_eq!(report.period, "第10周");
    assert_eq!(report.previous.as_deref(), Some("第9周"));
    assert_eq!(report.history.periods, vec!["第2周", "第9周", "第10周"]);
    assert_eq!(report.history.hours, vec![3, 4, 5]);
}

#[test]
fn rendered_html_embeds_narrative_kpis_and_chart_payloads() {
    let report = Report::build(&two_period_table()).unwrap();
    let html = render_html(&report, "表扬九年级2班。\n建议关注九年级1班。", "周报工具");

    assert!(html.contains("周报工具"));
    assert!(html.contains("周期: <b>第2周</b>"));
    assert!(html.contains("(对比: 第1周)"));
    assert!(html.contains("↑ 4"));
    assert!(html.contains("综合标杆：九年级2班"));
    assert!(html.contains("重点关注：九年级1班"));
    assert!(html.contains("表扬九年级2班。<br>建议关注九年级1班。"));
    // Chart payloads in natural class order, rates as rounded percentages.
    assert!(html.contains(r#"["九年级1班","九年级2班"]"#));
    assert!(html.contains("[100.0,60.0]"));
    assert!(html.contains("[60.0,100.0]"));
}

#[test]
fn alert_flags_follow_strict_below_average_comparison() {
    let report = Report::build(&two_period_table()).unwrap();
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].grade, "九年级");

    // Rows ranked by hours then correctness within the grade.
    let rows = &report.sections[0].rows;
    assert_eq!(rows[0].class, "九年级2班");
    assert!(rows[0].attendance_alert); // 60% < 80% average
    assert!(!rows[0].correctness_alert);
    assert_eq!(rows[1].class, "九年级1班");
    assert!(!rows[1].attendance_alert);
    assert!(rows[1].correctness_alert);
}

#[test]
fn csv_file_round_trips_through_read_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("班级数据.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "周,班级名称,学科,课时数,课时平均出勤率,题目正确率").unwrap();
    writeln!(f, "第1周,九年级1班,语文,10,95%,0.85").unwrap();
    writeln!(f, "第1周,高一年级1班,数学,12,90%,0.80").unwrap();
    drop(f);

    let t = ingest::read_table(&path).unwrap();
    assert_eq!(t.headers.len(), 6);
    assert_eq!(t.rows.len(), 2);

    let report = Report::build(&t).unwrap();
    assert_eq!(report.current.hours, 22);
    // 九年级 sorts before 高一年级 on the substituted numeric scale.
    assert_eq!(
        report.class_series.classes,
        vec!["九年级1班", "高一年级1班"]
    );
    assert_eq!(report.sections[0].grade, "九年级");
    assert_eq!(report.sections[1].grade, "高一年级");
}
