//! End-to-end trending scenarios
//!
//! Each test walks one documented behaviour through the public API:
//! interval derivation, conjunction, extraction, position correlation and
//! reduction.

use telemetry_trending::condition::{CompositeCondition, Condition, Predicate, TimeInterval};
use telemetry_trending::correlate::{correlate_positions, PositionSample};
use telemetry_trending::extract::{extract, Extraction};
use telemetry_trending::series::{MnemonicSeries, Sample, Value};
use telemetry_trending::stats::AggregateRecord;

fn labels(name: &str, points: &[(f64, &str)]) -> MnemonicSeries {
    MnemonicSeries::new(
        name,
        points.iter().map(|&(t, v)| Sample::new(t, Value::label(v))).collect(),
    )
    .unwrap()
}

fn analog(name: &str, points: &[(f64, f64)]) -> MnemonicSeries {
    MnemonicSeries::new(name, points.iter().map(|&(t, v)| Sample::new(t, v)).collect()).unwrap()
}

/// Condition whose single interval is `[start, end)`
fn window(name: &str, start: f64, end: f64) -> Condition {
    let series = labels(name, &[(start, "ON"), (end, "OFF")]);
    Condition::new(&series, Predicate::EqualsLabel("ON".into())).unwrap()
}

#[test]
fn test_intervals_from_on_off_series() {
    let series = labels(
        "INRSI_CAA_ON_FLAG",
        &[(0.0, "OFF"), (5.0, "ON"), (10.0, "OFF"), (20.0, "ON")],
    );
    let condition = Condition::new(&series, Predicate::EqualsLabel("ON".into())).unwrap();

    assert_eq!(
        condition.intervals(),
        &[TimeInterval::closed(5.0, 10.0), TimeInterval::open(20.0)]
    );
    assert!(condition.holds_at(7.0));
    assert!(!condition.holds_at(10.0));
    assert!(!condition.holds_at(15.0));
    assert!(condition.holds_at(25.0));
}

#[test]
fn test_conjunction_of_overlapping_windows() {
    let a = window("A", 0.0, 10.0);
    let b = window("B", 5.0, 15.0);
    let composite = CompositeCondition::new(vec![&a, &b]).unwrap();

    assert!(composite.holds_at(7.0));
    assert!(!composite.holds_at(12.0));
    assert!(!composite.holds_at(3.0));
}

#[test]
fn test_extraction_keeps_samples_inside_conjunction() {
    let a = window("A", 0.0, 10.0);
    let b = window("B", 5.0, 15.0);
    let composite = CompositeCondition::new(vec![&a, &b]).unwrap();

    let target = analog("SE_ZBUSVLT", &[(1.0, 30.0), (6.0, 31.0), (9.0, 32.0), (21.0, 33.0)]);
    let extraction = extract(&composite, &target).unwrap();

    let times: Vec<f64> = extraction.points().unwrap().iter().map(|p| p.time).collect();
    assert_eq!(times, vec![6.0, 9.0]);
    assert_eq!(extraction.values(), vec![31.0, 32.0]);
}

#[test]
fn test_extraction_outside_windows_is_no_data() {
    let a = window("A", 0.0, 10.0);
    let composite = CompositeCondition::new(vec![&a]).unwrap();
    let target = analog("SE_ZBUSVLT", &[(11.0, 30.0)]);

    assert_eq!(extract(&composite, &target).unwrap(), Extraction::NoData);
}

#[test]
fn test_completion_event_attributes_preceding_ratio() {
    let moves = labels("INRSI_FWA_MOVE_ST", &[(10.0, "SUCCESS")]);
    let positions = labels("INRSI_FWA_MECH_POS", &[(8.0, "F110W")]);
    let ratios = analog("INRSI_C_FWA_POSITION", &[(9.0, 3.2)]);

    let buckets = correlate_positions(&moves, "SUCCESS", &positions, &ratios, &[]).unwrap();

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets["F110W"], vec![PositionSample { time: 9.0, value: 3.2 }]);
}

#[test]
fn test_reduction_of_single_and_empty_lists() {
    let record = AggregateRecord::from_values(1.0, 2.0, &[1.0]).unwrap();
    assert_eq!(record.start(), 1.0);
    assert_eq!(record.end(), 2.0);
    assert_eq!(record.count(), 1);
    assert_eq!(record.mean(), 1.0);
    assert_eq!(record.stdev(), 0.0);

    assert!(AggregateRecord::from_values(1.0, 2.0, &[]).is_none());
}
