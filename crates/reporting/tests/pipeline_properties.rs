use campaign_core::error::AnalyticsError;
use campaign_core::types::{CampaignSummary, Metric, PerformanceReport, RawDataset, RawRecord};
use campaign_reporting::{AnalyticsPipeline, FieldNormalizer, SchemaValidator};
use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn raw_number() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (-1_000i64..100_000).prop_map(Value::from),
        2 => (-1_000.0f64..100_000.0).prop_map(|v| json!(v)),
        2 => (0u32..100_000).prop_map(|v| Value::from(format!("${v}"))),
        1 => Just(Value::Null),
        1 => Just(Value::from("n/a")),
    ]
}

fn raw_row() -> impl Strategy<Value = RawRecord> {
    (
        prop::sample::select(vec!["A", "B", " C ", "", "D"]),
        raw_number(),
        raw_number(),
        raw_number(),
        raw_number(),
        raw_number(),
    )
        .prop_map(|(id, impressions, clicks, spend, revenue, conversions)| {
            let mut row = RawRecord::new();
            row.insert("campaign_id".into(), Value::from(id));
            row.insert("impressions".into(), impressions);
            row.insert("clicks".into(), clicks);
            row.insert("spend".into(), spend);
            row.insert("revenue".into(), revenue);
            row.insert("conversions".into(), conversions);
            row
        })
}

fn rows_and_shuffle() -> impl Strategy<Value = (Vec<RawRecord>, Vec<RawRecord>)> {
    prop::collection::vec(raw_row(), 1..40)
        .prop_flat_map(|rows| (Just(rows.clone()), Just(rows).prop_shuffle()))
}

fn by_id(report: &PerformanceReport) -> BTreeMap<String, CampaignSummary> {
    report
        .campaigns
        .iter()
        .map(|c| (c.campaign_id.clone(), c.clone()))
        .collect()
}

fn assert_finite_non_negative(values: &[f64]) {
    for v in values {
        assert!(v.is_finite() && *v >= 0.0, "bad value {v}");
    }
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn impressions_sum_per_campaign(rows in prop::collection::vec(raw_row(), 1..40)) {
        let dataset = RawDataset::from_rows(rows);
        let report = match AnalyticsPipeline::default().run(&dataset) {
            Ok(report) => report,
            Err(AnalyticsError::EmptyDataset { .. }) => return Ok(()),
            Err(other) => panic!("unexpected error: {other}"),
        };

        let validated = SchemaValidator::default().validate(&dataset).unwrap();
        let clean = FieldNormalizer::default().normalize(&validated.rows).records;
        let mut expected: BTreeMap<String, u64> = BTreeMap::new();
        for record in &clean {
            *expected.entry(record.campaign_id.clone()).or_insert(0) += record.impressions;
        }

        prop_assert_eq!(report.campaigns.len(), expected.len());
        for summary in &report.campaigns {
            prop_assert_eq!(summary.total_impressions, expected[&summary.campaign_id]);
        }
    }

    #[test]
    fn outputs_are_finite_and_non_negative(rows in prop::collection::vec(raw_row(), 1..40)) {
        let dataset = RawDataset::from_rows(rows);
        let Ok(report) = AnalyticsPipeline::default().run(&dataset) else {
            return Ok(());
        };

        for c in &report.campaigns {
            assert_finite_non_negative(&[
                c.total_spend,
                c.total_revenue,
                c.metrics.ctr,
                c.metrics.cpc,
                c.metrics.cpa,
                c.metrics.roas,
            ]);
            for metric in Metric::ALL {
                if c.metrics.is_undefined(metric) {
                    prop_assert_eq!(c.metrics.get(metric), 0.0);
                }
            }
            prop_assert!(!c.campaign_id.is_empty());
            prop_assert_eq!(c.campaign_id.trim(), c.campaign_id.as_str());
        }
        let o = &report.overall;
        assert_finite_non_negative(&[o.total_spend, o.total_revenue, o.metrics.ctr, o.metrics.roas]);
    }

    #[test]
    fn reordering_rows_changes_nothing((rows, shuffled) in rows_and_shuffle()) {
        let first = AnalyticsPipeline::default().run(&RawDataset::from_rows(rows));
        let second = AnalyticsPipeline::default().run(&RawDataset::from_rows(shuffled));

        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(by_id(&a), by_id(&b));
                prop_assert_eq!(
                    a.best_campaign().map(|c| c.campaign_id.clone()),
                    b.best_campaign().map(|c| c.campaign_id.clone())
                );
                prop_assert_eq!(
                    a.worst_campaign().map(|c| c.campaign_id.clone()),
                    b.worst_campaign().map(|c| c.campaign_id.clone())
                );
                prop_assert_eq!(a.overall.total_spend.to_bits(), b.overall.total_spend.to_bits());
            }
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "only one ordering failed"),
        }
    }
}

#[test]
fn averaging_row_ratios_would_disagree() {
    let rows = vec![
        json!({"campaign_id": "A", "impressions": 100, "clicks": 50, "spend": 10, "revenue": 100}),
        json!({"campaign_id": "A", "impressions": 900, "clicks": 9, "spend": 90, "revenue": 90}),
    ];
    let dataset = RawDataset::from_rows(
        rows.into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect(),
    );
    let report = AnalyticsPipeline::default().run(&dataset).unwrap();
    let a = &report.campaigns[0];

    // per-row ctr: 0.5 and 0.01, mean 0.255; per-row roas: 10 and 1, mean 5.5
    assert!((a.metrics.ctr - 59.0 / 1000.0).abs() < 1e-12);
    assert!((a.metrics.roas - 1.9).abs() < 1e-12);
    assert!((a.metrics.ctr - 0.255).abs() > 0.1);
}

#[test]
fn ranking_ties_resolve_by_spend_then_id() {
    let rows = vec![
        json!({"campaign_id": "beta", "impressions": 10, "clicks": 1, "spend": 20, "revenue": 40}),
        json!({"campaign_id": "alpha", "impressions": 10, "clicks": 1, "spend": 20, "revenue": 40}),
        json!({"campaign_id": "gamma", "impressions": 10, "clicks": 1, "spend": 10, "revenue": 20}),
        json!({"campaign_id": "delta", "impressions": 10, "clicks": 1, "spend": 80, "revenue": 40}),
    ];
    let dataset = RawDataset::from_rows(
        rows.into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect(),
    );
    let report = AnalyticsPipeline::default().run(&dataset).unwrap();
    assert_eq!(report.best_campaign().unwrap().campaign_id, "alpha");
    assert_eq!(report.worst_campaign().unwrap().campaign_id, "delta");

    let top: Vec<_> = report
        .top_campaigns()
        .iter()
        .map(|c| c.campaign_id.clone())
        .collect();
    assert_eq!(top, vec!["alpha", "beta", "gamma", "delta"]);
}

#[test]
fn report_serializes_for_downstream_consumers() {
    let rows = vec![
        json!({"campaign_id": "A", "impressions": 1000, "clicks": 50, "spend": 100, "revenue": 400}),
        json!({"campaign_id": "B", "impressions": 0, "clicks": 0, "spend": 0}),
    ];
    let dataset = RawDataset::from_rows(
        rows.into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect(),
    );
    let report = AnalyticsPipeline::default().run(&dataset).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["campaigns"][0]["campaign_id"], "A");
    assert_eq!(json["campaigns"][0]["roas"], 4.0);
    assert_eq!(
        json["campaigns"][1]["undefined_metrics"],
        json!(["ctr", "cpc", "cpa", "roas"])
    );
    assert_eq!(json["overall"]["best"]["campaign_id"], "A");
    assert_eq!(json["overall"]["ranked_by"], "roas");
    assert_eq!(json["diagnostics"]["column_mapping"]["spend"], "spend");

    let back: PerformanceReport = serde_json::from_value(json).unwrap();
    assert_eq!(back.campaigns, report.campaigns);
}
