use request_log_analyzer::filter::{Categorizer, CategoryKey, EvalError, RequestFilter};
use request_log_analyzer::report::{Exclusions, ReportData};
use request_log_analyzer::{
    FieldValue, LineRole, Report, ReportConfig, ReportError, ReportSet, Request, SortOrder,
    TypedEvent,
};

fn request(fields: &[(&str, FieldValue)]) -> Request {
    let mut event = TypedEvent::new("completed", LineRole::Single, 1);
    for (name, value) in fields {
        event.fields.insert((*name).to_string(), value.clone());
    }
    Request::open(event)
}

fn keyed(key: &str) -> Request {
    request(&[("key", FieldValue::from(key))])
}

fn timed(key: &str, seconds: f64) -> Request {
    request(&[
        ("key", FieldValue::from(key)),
        ("duration", FieldValue::Duration(seconds)),
    ])
}

#[test]
fn test_frequency_counts_and_orders_by_count() {
    let mut report = Report::frequency("Keys", Categorizer::field("key"));
    for key in ["A", "B", "A", "A", "C"] {
        report.update(&keyed(key));
    }

    let snapshot = report.snapshot(SortOrder::default());
    let rows = snapshot.frequency_rows().unwrap();
    let counts: Vec<(String, u64)> = rows
        .iter()
        .map(|r| (r.category.to_string(), r.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("A".to_string(), 3),
            ("B".to_string(), 1),
            ("C".to_string(), 1)
        ]
    );
    assert!((rows[0].share - 0.6).abs() < 1e-12);
    assert!(matches!(snapshot.data, ReportData::Frequency { total: 5, .. }));
}

#[test]
fn test_absent_category_is_counted_separately() {
    let mut report = Report::frequency("Keys", Categorizer::field("key"));
    report.update(&keyed("A"));
    report.update(&request(&[]));
    report.update(&request(&[]));

    let snapshot = report.snapshot(SortOrder::default());
    let rows = snapshot.frequency_rows().unwrap();
    assert_eq!(rows[0].category, CategoryKey::Absent);
    assert_eq!(rows[0].count, 2);
    assert_eq!(rows[1].category, CategoryKey::value("A"));
}

#[test]
fn test_duration_summarizes_per_category() {
    let mut report = Report::duration("Timing", "duration", Categorizer::field("key"));
    report.update(&timed("K", 1.0));
    report.update(&timed("K", 3.0));
    report.update(&timed("L", 0.5));
    report.update(&keyed("K"));

    let snapshot = report.snapshot(SortOrder::Sum);
    let rows = snapshot.duration_rows().unwrap();
    let k = &rows[0];
    assert_eq!(k.category, CategoryKey::value("K"));
    assert_eq!(k.count, 2);
    assert_eq!(k.sum, 4.0);
    assert_eq!(k.min, 1.0);
    assert_eq!(k.max, 3.0);
    assert_eq!(k.mean, 2.0);
    assert!((k.variance - 2.0).abs() < 1e-12);
    assert_eq!(rows[1].category, CategoryKey::value("L"));
    assert_eq!(rows[1].variance, 0.0);
    assert_eq!(snapshot.excluded.missing_value, 1);
}

#[test]
fn test_duration_sort_orders() {
    let mut report = Report::duration("Timing", "duration", Categorizer::field("key"));
    for (key, seconds) in [("slow", 5.0), ("many", 1.0), ("many", 1.0), ("many", 1.0)] {
        report.update(&timed(key, seconds));
    }

    let first = |order| {
        report.snapshot(order).duration_rows().unwrap()[0]
            .category
            .to_string()
    };
    assert_eq!(first(SortOrder::Sum), "slow");
    assert_eq!(first(SortOrder::Count), "many");
    assert_eq!(first(SortOrder::Max), "slow");
    assert_eq!(first(SortOrder::Category), "many");
}

#[test]
fn test_filter_limits_what_a_report_sees() {
    let mut report = Report::frequency("Blockers", Categorizer::field("key"))
        .with_filter(RequestFilter::parse("duration>1.0").unwrap());
    report.update(&timed("fast", 0.2));
    report.update(&timed("slow", 2.5));
    report.update(&keyed("untimed"));

    let snapshot = report.snapshot(SortOrder::default());
    assert_eq!(snapshot.frequency_rows().unwrap().len(), 1);
    assert_eq!(
        snapshot.excluded,
        Exclusions {
            filtered: 2,
            ..Exclusions::default()
        }
    );
}

#[test]
fn test_failing_custom_categorizer_excludes_only_that_request() {
    let categorizer = Categorizer::custom(|record| match record.field("key") {
        Some(FieldValue::String(key)) if key == "boom" => Err(EvalError::new("cannot categorize")),
        Some(value) => Ok(CategoryKey::value(value.to_string().to_uppercase())),
        None => Ok(CategoryKey::Absent),
    });
    let mut report = Report::frequency("Custom", categorizer);
    report.update(&keyed("a"));
    report.update(&keyed("boom"));
    report.update(&keyed("a"));

    let snapshot = report.snapshot(SortOrder::default());
    let rows = snapshot.frequency_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, CategoryKey::value("A"));
    assert_eq!(rows[0].count, 2);
    assert_eq!(snapshot.excluded.errors, 1);
}

#[test]
fn test_per_event_reports_observe_each_matching_line() {
    let mut request = Request::open(
        TypedEvent::new("processing", LineRole::Header, 1).with_field("action", "index"),
    );
    for (line, file) in [(2, "_a"), (3, "_b"), (4, "_a")] {
        let mut event = TypedEvent::new("rendered", LineRole::Body, line).with_field("file", file);
        event
            .fields
            .insert("view".to_string(), FieldValue::Duration(0.01 * line as f64));
        request.merge(event);
    }

    let mut report = Report::duration("Partials", "view", Categorizer::field("file"))
        .with_line_types(["rendered"])
        .per_event();
    report.update(&request);

    let snapshot = report.snapshot(SortOrder::Count);
    let rows = snapshot.duration_rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].category, CategoryKey::value("_a"));
    assert_eq!(rows[0].count, 2);
    assert!((rows[0].sum - 0.06).abs() < 1e-12);
}

#[test]
fn test_line_type_restriction_skips_other_requests() {
    let mut report =
        Report::frequency("Rendered only", Categorizer::field("key")).with_line_types(["rendered"]);
    report.update(&keyed("A"));

    let snapshot = report.snapshot(SortOrder::default());
    assert!(snapshot.frequency_rows().unwrap().is_empty());
    assert_eq!(snapshot.excluded, Exclusions::default());
}

#[test]
fn test_timespan_and_hourly_spread() {
    let at = |ts: u64| request(&[("timestamp", FieldValue::Timestamp(ts))]);
    let mut set = ReportSet::compile(&[ReportConfig::timespan(), ReportConfig::hourly_spread()])
        .unwrap();

    set.update(&at(20150202133308));
    set.update(&at(20150202093308));
    set.update(&at(20150202135959));
    set.update(&request(&[]));

    let snapshots = set.snapshot(SortOrder::default());
    match &snapshots[0].data {
        ReportData::Timespan(span) => {
            assert_eq!(span.first, Some(20150202093308));
            assert_eq!(span.last, Some(20150202135959));
            assert_eq!(span.count, 3);
            assert_eq!(span.seconds, Some(4 * 3600 + 26 * 60 + 51));
        }
        other => panic!("expected timespan, got {other:?}"),
    }
    match &snapshots[1].data {
        ReportData::HourlySpread(spread) => {
            assert_eq!(spread.buckets.len(), 24);
            assert_eq!(spread.buckets[13], 2);
            assert_eq!(spread.buckets[9], 1);
            assert_eq!(spread.total, 3);
        }
        other => panic!("expected hourly spread, got {other:?}"),
    }
    assert_eq!(snapshots[1].excluded.missing_value, 1);
    assert_eq!(set.observed(), 4);
}

#[test]
fn test_reset_clears_state_but_keeps_reports() {
    let mut set = ReportSet::compile(&[ReportConfig::frequency("key")]).unwrap();
    set.update(&keyed("A"));
    set.reset();

    assert_eq!(set.len(), 1);
    assert_eq!(set.observed(), 0);
    let snapshot = &set.snapshot(SortOrder::default())[0];
    assert!(snapshot.frequency_rows().unwrap().is_empty());
}

#[test]
fn test_snapshot_is_stable_across_calls() {
    let mut set = ReportSet::compile(&[
        ReportConfig::frequency("key"),
        ReportConfig::duration("duration", "key"),
    ])
    .unwrap();
    for (key, seconds) in [("A", 0.1), ("B", 0.2), ("A", 0.3)] {
        set.update(&timed(key, seconds));
    }

    let first = set.snapshot(SortOrder::Mean);
    let second = set.snapshot(SortOrder::Mean);
    assert_eq!(first, second);
}

#[test]
fn test_invalid_report_configs_are_rejected() {
    let mut missing_category = ReportConfig::frequency("key");
    missing_category.category = None;
    assert!(matches!(
        Report::compile(&missing_category),
        Err(ReportError::MissingCategory { .. })
    ));

    let bad_filter = ReportConfig::frequency("key").filter("duration");
    assert!(matches!(
        Report::compile(&bad_filter),
        Err(ReportError::InvalidFilter { .. })
    ));

    let bad_template = ReportConfig::frequency("{controller");
    assert!(matches!(
        Report::compile(&bad_template),
        Err(ReportError::InvalidCategory { .. })
    ));
}
