//! Tests for request building and SQL rendering of grouped scans.

use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use tally::measure::{Measure, MeasureSet};
use tally::scan::{ColumnRole, RequestBuilder};
use tally::sql::expr::{col, ExprExt};
use tally::sql::query::TableRef;
use tally::sql::Dialect;

fn parses(sql: &str, dialect: Dialect) -> bool {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
    };
    Parser::parse_sql(&*parser_dialect, sql).is_ok()
}

fn listing_measures() -> MeasureSet {
    MeasureSet::positional([
        Measure::boolean(col("quantity").eq(0)),
        Measure::expression(col("mfg")),
    ])
}

#[test]
fn test_near_identical_filters_get_distinct_aliases() {
    // Filters that only differ past any reasonable truncation point
    let long = "a".repeat(80);
    let measures = MeasureSet::positional([
        Measure::boolean(col(&long).eq(format!("{long}_1"))),
        Measure::boolean(col(&long).eq(format!("{long}_2"))),
    ]);

    let request = RequestBuilder::new().build(&measures, vec![], None);

    assert_eq!(request.columns[0].alias, "measure_0");
    assert_eq!(request.columns[1].alias, "measure_1");
    assert_ne!(request.columns[0].expr, request.columns[1].expr);
}

#[test]
fn test_group_and_count_aliases_never_clash_with_measures() {
    let measures =
        MeasureSet::positional((0..12).map(|i| Measure::expression(col(&format!("c{i}")))));
    let builder = RequestBuilder::new();
    let request = builder.build(&measures, vec![], Some(col("region")));

    let group = request.group_key.as_ref().unwrap();
    assert_eq!(group.role, ColumnRole::GroupKey);
    for column in &request.columns {
        assert_ne!(column.alias, group.alias);
        assert_ne!(column.alias, request.count_alias);
    }
}

#[test]
fn test_base_filters_are_carried_verbatim() {
    let filters = vec![col("active").eq(true), col("price").gt(10)];
    let request = RequestBuilder::new().build(&listing_measures(), filters.clone(), None);
    assert_eq!(request.base_filters, filters);
    assert!(!request.is_grouped());
}

#[test]
fn test_render_grouped_scan_duckdb() {
    let request = RequestBuilder::new().build(
        &listing_measures(),
        vec![col("active").eq(true)],
        Some(col("region")),
    );

    let sql = request.to_sql(TableRef::new("listings"), Dialect::DuckDb);
    insta::assert_snapshot!(sql, @r#"
    SELECT
      ("quantity" = 0) AS "measure_0",
      "mfg" AS "measure_1",
      "region" AS "measure_group",
      COUNT(*) AS "row_count"
    FROM "listings"
    WHERE ("active" = true)
    GROUP BY ("quantity" = 0), "mfg", "region"
    "#);
    assert!(parses(&sql, Dialect::DuckDb), "{sql}");
}

#[test]
fn test_render_boolean_measure_tsql_uses_case() {
    let measures = MeasureSet::positional([Measure::boolean(col("on_sale").eq(true))]);
    let request = RequestBuilder::new().build(&measures, vec![], None);

    let sql = request.to_sql(TableRef::new("listings"), Dialect::TSql);
    insta::assert_snapshot!(sql, @r#"
    SELECT
      CASE WHEN ([on_sale] = 1) THEN 1 WHEN NOT ([on_sale] = 1) THEN 0 END AS [measure_0],
      COUNT(*) AS [row_count]
    FROM [listings]
    GROUP BY CASE WHEN ([on_sale] = 1) THEN 1 WHEN NOT ([on_sale] = 1) THEN 0 END
    "#);
    assert!(parses(&sql, Dialect::TSql), "{sql}");
}

#[test]
fn test_rendered_sql_parses_in_every_dialect() {
    let request = RequestBuilder::new().build(
        &listing_measures(),
        vec![
            col("price").between(1, 100),
            col("status").in_list(vec!["new".into(), "used".into()]),
        ],
        Some(col("region")),
    );

    for dialect in [Dialect::DuckDb, Dialect::Postgres, Dialect::MySql, Dialect::TSql] {
        let sql = request.to_sql(TableRef::new("listings").with_schema("sales"), dialect);
        assert!(parses(&sql, dialect), "{dialect}: {sql}");
    }
}

#[test]
fn test_no_measures_no_group_has_no_group_by() {
    let measures = MeasureSet::positional(Vec::<Measure>::new());
    let request = RequestBuilder::new().build(&measures, vec![], None);
    let sql = request.to_sql(TableRef::new("listings"), Dialect::Postgres);
    assert!(!sql.contains("GROUP BY"));
    assert!(sql.contains("COUNT(*) AS \"row_count\""));
}

#[test]
fn test_custom_prefix_flows_into_sql() {
    let request = RequestBuilder::new()
        .with_alias_prefix("m")
        .with_count_alias("n")
        .build(&listing_measures(), vec![], None);

    let sql = request.to_sql(TableRef::new("listings"), Dialect::Postgres);
    assert!(sql.contains("AS \"m0\""));
    assert!(sql.contains("AS \"m1\""));
    assert!(sql.contains("COUNT(*) AS \"n\""));
}

#[test]
fn test_nested_measures_keep_grouping_in_sql() {
    let measures = MeasureSet::positional([
        Measure::boolean(col("a").eq(1).and(col("b").eq(2).or(col("c").eq(3)))),
        Measure::expression(col("x").add(1).mul(2)),
    ]);
    let request = RequestBuilder::new().build(&measures, vec![], None);

    let sql = request.to_sql(TableRef::new("t"), Dialect::Postgres);
    assert!(
        sql.contains(r#"("a" = 1 AND ("b" = 2 OR "c" = 3)) AS "measure_0""#),
        "{sql}"
    );
    assert!(sql.contains(r#"("x" + 1) * 2 AS "measure_1""#), "{sql}");
    assert!(parses(&sql, Dialect::Postgres), "{sql}");
}
