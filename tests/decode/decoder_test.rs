//! Tests for decoding grouped-scan rows into per-measure tallies.

use indexmap::IndexMap;
use tally::decode::{collapse, decode, MultiCount, Tallies, Tally};
use tally::error::EngineError;
use tally::measure::{Measure, MeasureSet};
use tally::scan::{ScanError, ScanRow};
use tally::sql::expr::col;
use tally::value::Value;

fn sold_out_and_mfg() -> MeasureSet {
    MeasureSet::named([
        ("sold_out", Measure::boolean(col("sold_out"))),
        ("mfg", Measure::expression(col("mfg"))),
    ])
    .unwrap()
}

#[test]
fn test_scenario_named_counts_and_histogram() {
    let rows = vec![
        ScanRow::new(vec![Value::Bool(true), Value::Int(1)], 1),
        ScanRow::new(vec![Value::Bool(false), Value::Int(1)], 1),
        ScanRow::new(vec![Value::Bool(true), Value::Int(2)], 1),
    ];

    let result = decode(rows, &sold_out_and_mfg(), false, None).unwrap();

    let mut mfg = IndexMap::new();
    mfg.insert(Value::Int(1), 2);
    mfg.insert(Value::Int(2), 1);
    let mut expected = IndexMap::new();
    expected.insert("sold_out".to_string(), Tally::Count(2));
    expected.insert("mfg".to_string(), Tally::Histogram(mfg));

    assert_eq!(result, MultiCount::Flat(Tallies::Named(expected)));
}

#[test]
fn test_histogram_keeps_null_as_own_key() {
    let measures = MeasureSet::positional([Measure::expression(col("region"))]);
    let rows = vec![
        ScanRow::new(vec![Value::from("west")], 3),
        ScanRow::new(vec![Value::Null], 2),
    ];

    let result = decode(rows, &measures, false, None).unwrap();
    let histogram = result.as_flat().unwrap().get(0).unwrap().histogram_or_empty();
    assert_eq!(histogram.get(&Value::Null), Some(&2));
    assert_eq!(histogram.get(&Value::from("west")), Some(&3));
}

#[test]
fn test_boolean_valued_expression_collapses() {
    // Documented ambiguity: an expression that only yields booleans
    // is indistinguishable from a filter
    let measures = MeasureSet::positional([Measure::expression(col("flag"))]);
    let rows = vec![
        ScanRow::new(vec![Value::Bool(true)], 5),
        ScanRow::new(vec![Value::Bool(false)], 2),
    ];

    let result = decode(rows, &measures, false, None).unwrap();
    let tally = result.as_flat().unwrap().get(0).unwrap();
    assert_eq!(tally.count(), Some(5));
    assert!(tally.histogram_or_empty().is_empty());
}

#[test]
fn test_collapse_all_null_is_zero() {
    let mut histogram = IndexMap::new();
    histogram.insert(Value::Null, 9);
    assert_eq!(collapse(histogram), Tally::Count(0));
}

#[test]
fn test_cross_tab_groups_in_first_seen_order() {
    let rows = vec![
        ScanRow::new(vec![Value::Bool(true), Value::Int(1)], 4).with_group("west"),
        ScanRow::new(vec![Value::Bool(false), Value::Int(2)], 1).with_group("east"),
        ScanRow::new(vec![Value::Bool(true), Value::Int(2)], 2).with_group("west"),
    ];

    let result = decode(rows, &sold_out_and_mfg(), true, None).unwrap();
    let groups = result.as_grouped().unwrap();
    assert_eq!(
        groups.keys().collect::<Vec<_>>(),
        vec![&Value::from("west"), &Value::from("east")]
    );

    let west = &groups[&Value::from("west")];
    assert_eq!(west.get_named("sold_out"), Some(&Tally::Count(6)));
    let east = &groups[&Value::from("east")];
    assert_eq!(east.get_named("sold_out"), Some(&Tally::Count(0)));
    assert_eq!(
        east.get_named("mfg").unwrap().histogram_or_empty().get(&Value::Int(2)),
        Some(&1)
    );
}

#[test]
fn test_limit_boundary_is_inclusive() {
    let measures = MeasureSet::positional([Measure::expression(col("x"))]);
    let rows: Vec<_> = (0..3).map(|i| ScanRow::new(vec![Value::Int(i)], 1)).collect();

    assert!(decode(rows.clone(), &measures, false, Some(3)).is_ok());
    let err = decode(rows, &measures, false, Some(2)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "grouped scan returned 3 distinct rows, above the limit of 2"
    );
}

#[test]
fn test_short_row_is_contract_error() {
    let rows = vec![ScanRow::new(vec![Value::Bool(true)], 1)];
    let err = decode(rows, &sold_out_and_mfg(), false, None).unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::Contract(_))));
}

#[test]
fn test_zero_measures_still_decode() {
    let measures = MeasureSet::positional(Vec::<Measure>::new());
    let rows = vec![ScanRow::new(vec![], 10)];
    let result = decode(rows, &measures, false, None).unwrap();
    assert_eq!(result, MultiCount::Flat(Tallies::Positional(vec![])));
}

#[test]
fn test_tsql_case_rows_decode_as_counts() {
    // Grouped by region, with sold_out rendered as CASE ... THEN 1 ... THEN 0
    let rows = vec![
        ScanRow::new(vec![Value::Int(1), Value::Int(1)], 3).with_group("west"),
        ScanRow::new(vec![Value::Int(0), Value::Int(2)], 2).with_group("west"),
        ScanRow::new(vec![Value::Null, Value::Int(2)], 1).with_group("east"),
    ];

    let result = decode(rows, &sold_out_and_mfg(), true, None).unwrap();

    let west = result.group(&Value::from("west")).unwrap();
    assert_eq!(west.get_named("sold_out"), Some(&Tally::Count(3)));
    let mut mfg = IndexMap::new();
    mfg.insert(Value::Int(1), 3);
    mfg.insert(Value::Int(2), 2);
    assert_eq!(west.get_named("mfg"), Some(&Tally::Histogram(mfg)));

    let east = result.group(&Value::from("east")).unwrap();
    assert_eq!(east.get_named("sold_out"), Some(&Tally::Count(0)));
}

#[test]
fn test_empty_grouped_scan_keeps_measure_kinds() {
    let result = decode(vec![], &sold_out_and_mfg(), true, None).unwrap();

    let MultiCount::Grouped(groups) = result else {
        panic!("expected grouped result");
    };
    assert_eq!(groups.len(), 1);
    let tallies = &groups[&Value::Null];
    assert_eq!(tallies.get_named("sold_out"), Some(&Tally::Count(0)));
    assert_eq!(
        tallies.get_named("mfg"),
        Some(&Tally::Histogram(IndexMap::new()))
    );
}
