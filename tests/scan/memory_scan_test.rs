//! Tests for the in-memory scan executor.

use tally::measure::{Measure, MeasureSet};
use tally::scan::{MemoryScan, RequestBuilder, ScanError, ScanExecutor, ScanRow};
use tally::sql::expr::{col, func, lit_null, lit_str, raw_sql, Expr, ExprExt};
use tally::value::Value;

const LISTINGS: &str = r#"[
    {"sku": "a-1", "quantity": 0, "mfg": 1, "price": 9.5, "region": "west", "status": "sold_out"},
    {"sku": "a-2", "quantity": 4, "mfg": 1, "price": 20.0, "region": "west", "status": "active"},
    {"sku": "b-1", "quantity": 0, "mfg": 2, "price": null, "region": "east", "status": "sold_out"},
    {"sku": "b-2", "quantity": null, "mfg": 2, "price": 12.0, "region": null, "status": "draft"}
]"#;

fn listings() -> MemoryScan {
    MemoryScan::from_json(LISTINGS).unwrap()
}

fn scan(measures: Vec<Measure>, filters: Vec<Expr>, group: Option<Expr>) -> Vec<ScanRow> {
    let request = RequestBuilder::new().build(&MeasureSet::positional(measures), filters, group);
    ScanExecutor::execute(&listings(), &request).unwrap()
}

#[test]
fn test_rows_bucket_by_distinct_combination() {
    let rows = scan(
        vec![
            Measure::boolean(col("quantity").eq(0)),
            Measure::expression(col("mfg")),
        ],
        vec![],
        None,
    );

    assert_eq!(
        rows,
        vec![
            ScanRow::new(vec![Value::Bool(true), Value::Int(1)], 1),
            ScanRow::new(vec![Value::Bool(false), Value::Int(1)], 1),
            ScanRow::new(vec![Value::Bool(true), Value::Int(2)], 1),
            ScanRow::new(vec![Value::Null, Value::Int(2)], 1),
        ]
    );
}

#[test]
fn test_counts_sum_to_filtered_row_total() {
    let rows = scan(
        vec![Measure::expression(col("region"))],
        vec![col("status").ne("draft")],
        None,
    );
    let total: u64 = rows.iter().map(|r| r.count).sum();
    assert_eq!(total, 3);
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_null_filter_result_excludes_row() {
    // price IS NULL for b-1, so "price > 10" is unknown there
    let rows = scan(
        vec![Measure::expression(col("sku"))],
        vec![col("price").gt(10)],
        None,
    );
    let skus: Vec<_> = rows.iter().map(|r| r.values[0].clone()).collect();
    assert_eq!(skus, vec![Value::from("a-2"), Value::from("b-2")]);
}

#[test]
fn test_group_value_reported_per_row() {
    let rows = scan(
        vec![Measure::boolean(col("quantity").eq(0))],
        vec![],
        Some(col("region")),
    );
    let groups: Vec<_> = rows.iter().map(|r| r.group_value.clone()).collect();
    assert_eq!(
        groups,
        vec![
            Some(Value::from("west")),
            Some(Value::from("west")),
            Some(Value::from("east")),
            Some(Value::Null),
        ]
    );
}

#[test]
fn test_evaluate_case_and_like() {
    let tier = Expr::Case {
        operand: None,
        when_clauses: vec![
            (col("price").lt(10), lit_str("cheap")),
            (col("price").lt(15), lit_str("mid")),
        ],
        else_clause: Some(Box::new(lit_str("premium"))),
    };
    assert_eq!(
        listings().evaluate(&tier).unwrap(),
        vec![
            Value::from("cheap"),
            Value::from("premium"),
            Value::from("premium"),
            Value::from("mid"),
        ]
    );

    let b_line = col("sku").like("b-_");
    assert_eq!(
        listings().evaluate(&b_line).unwrap(),
        vec![
            Value::Bool(false),
            Value::Bool(false),
            Value::Bool(true),
            Value::Bool(true),
        ]
    );
}

#[test]
fn test_evaluate_simple_case_and_functions() {
    let label = Expr::Case {
        operand: Some(Box::new(col("mfg"))),
        when_clauses: vec![(1.into(), lit_str("acme"))],
        else_clause: None,
    };
    assert_eq!(
        listings().evaluate(&label).unwrap(),
        vec![Value::from("acme"), Value::from("acme"), Value::Null, Value::Null]
    );

    let upper_region = func("UPPER", vec![col("region")]);
    assert_eq!(
        listings().evaluate(&upper_region).unwrap()[3],
        Value::Null
    );
}

#[test]
fn test_arithmetic_and_concat() {
    let doubled = col("quantity").mul(2).add(1);
    assert_eq!(
        listings().evaluate(&doubled).unwrap(),
        vec![Value::Int(1), Value::Int(9), Value::Int(1), Value::Null]
    );

    let key = col("sku").concat(":").concat(col("mfg"));
    assert_eq!(listings().evaluate(&key).unwrap()[0], Value::from("a-1:1"));
}

#[test]
fn test_not_and_is_null() {
    let expr = col("quantity").is_null().not();
    assert_eq!(
        listings().evaluate(&expr).unwrap(),
        vec![
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(false),
        ]
    );
    assert_eq!(
        listings().evaluate(&col("quantity").eq(lit_null())).unwrap(),
        vec![Value::Null; 4]
    );
}

#[test]
fn test_raw_sql_is_rejected() {
    let request = RequestBuilder::new().build(
        &MeasureSet::positional([Measure::boolean(raw_sql("quantity = 0"))]),
        vec![],
        None,
    );
    let err = ScanExecutor::execute(&listings(), &request).unwrap_err();
    assert!(matches!(err, ScanError::Syntax(_)));
}

#[test]
fn test_type_mismatch_is_constraint_violation() {
    let err = listings().evaluate(&col("sku").add(1)).unwrap_err();
    assert!(matches!(err, ScanError::Constraint(_)));
}

#[test]
fn test_invalid_json_is_backend_error() {
    let err = MemoryScan::from_json("{not json").unwrap_err();
    assert!(matches!(err, ScanError::Backend(_)));
}

#[test]
fn test_signed_zero_shares_a_bucket() {
    let scan = MemoryScan::from_json(r#"[{"delta": 0.0}, {"delta": -0.0}, {"delta": 1.5}]"#).unwrap();
    let measures = MeasureSet::positional([Measure::expression(col("delta"))]);
    let request = RequestBuilder::new().build(&measures, vec![], Some(col("delta")));

    let rows = ScanExecutor::execute(&scan, &request).unwrap();

    assert_eq!(
        rows,
        vec![
            ScanRow::new(vec![Value::Float(0.0)], 2).with_group(Value::Float(0.0)),
            ScanRow::new(vec![Value::Float(1.5)], 1).with_group(Value::Float(1.5)),
        ]
    );
}
