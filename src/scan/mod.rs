//! Grouped-scan requests and the executor boundary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   build    ┌─────────────┐  execute  ┌──────────────┐
//! │  MeasureSet  │ ─────────▶ │ ScanRequest │ ────────▶ │ ScanExecutor │
//! └──────────────┘            └─────────────┘           └──────────────┘
//!                                                              │
//!                                                              ▼
//!                                                      Vec<ScanRow> (one per
//!                                                      distinct combination)
//! ```
//!
//! The engine never runs queries itself. A [`ScanRequest`] can be rendered to
//! SQL with [`ScanRequest::to_sql`] for SQL-backed executors, or evaluated in
//! process by [`MemoryScan`].

mod executor;
mod memory;
mod request;

pub use executor::{AsyncScanExecutor, ScanError, ScanExecutor, ScanResult};
pub use memory::{MemoryScan, Record};
pub use request::RequestBuilder;

use crate::measure::MeasureKind;
use crate::sql::dialect::Dialect;
use crate::sql::expr::{count_star, lit_bool, Expr, ExprExt};
use crate::sql::query::{Query, SelectExpr, TableRef};
use crate::value::Value;

/// What a scan column is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Output of the measure at this column's position.
    Measure(MeasureKind),
    /// The extra cross-tab key.
    GroupKey,
}

/// One output column of a grouped scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanColumn {
    pub alias: String,
    pub expr: Expr,
    pub role: ColumnRole,
}

impl ScanColumn {
    /// The expression to select and group by in `dialect`.
    ///
    /// Boolean measures in dialects without selectable predicates become
    /// `CASE WHEN f THEN 1 WHEN NOT f THEN 0 END`, keeping NULL as NULL. The
    /// decoder reads the `1`/`0` results back as booleans.
    pub fn select_expr(&self, dialect: Dialect) -> Expr {
        match self.role {
            ColumnRole::Measure(MeasureKind::Boolean) if !dialect.supports_boolean_select() => {
                Expr::Case {
                    operand: None,
                    when_clauses: vec![
                        (self.expr.clone(), lit_bool(true)),
                        (self.expr.clone().not(), lit_bool(false)),
                    ],
                    else_clause: None,
                }
            }
            _ => self.expr.clone(),
        }
    }
}

/// A single grouped-scan request covering every measure.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    /// Filters every counted row must satisfy (ANDed).
    pub base_filters: Vec<Expr>,
    /// One column per measure, in the caller's order.
    pub columns: Vec<ScanColumn>,
    pub group_key: Option<ScanColumn>,
    /// Alias of the per-combination row count.
    pub count_alias: String,
}

impl ScanRequest {
    pub fn measure_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_grouped(&self) -> bool {
        self.group_key.is_some()
    }

    /// Measure columns followed by the group key, if any.
    pub fn output_columns(&self) -> impl Iterator<Item = &ScanColumn> {
        self.columns.iter().chain(self.group_key.iter())
    }

    /// Render as `SELECT <cols>, COUNT(*) FROM table WHERE <filters> GROUP BY <cols>`.
    pub fn to_query(&self, table: TableRef, dialect: Dialect) -> Query {
        let exprs: Vec<Expr> = self
            .output_columns()
            .map(|column| column.select_expr(dialect))
            .collect();

        let mut select: Vec<SelectExpr> = exprs
            .iter()
            .zip(self.output_columns())
            .map(|(expr, column)| expr.clone().alias(&column.alias))
            .collect();
        select.push(count_star().alias(&self.count_alias));

        let mut query = Query::new().select(select).from(table);
        for filter in &self.base_filters {
            query = query.filter(filter.clone());
        }
        // Dialects differ on grouping by alias, so group by the expressions
        query.group_by(exprs)
    }

    /// Generate SQL for `dialect`.
    pub fn to_sql(&self, table: TableRef, dialect: Dialect) -> String {
        self.to_query(table, dialect).to_sql(dialect)
    }
}

/// One distinct combination of column values and how many rows share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRow {
    /// One value per measure column, in request order.
    pub values: Vec<Value>,
    /// Group-key value when the request is grouped.
    pub group_value: Option<Value>,
    pub count: u64,
}

impl ScanRow {
    pub fn new(values: Vec<Value>, count: u64) -> Self {
        Self {
            values,
            group_value: None,
            count,
        }
    }

    pub fn with_group(mut self, group_value: impl Into<Value>) -> Self {
        self.group_value = Some(group_value.into());
        self
    }
}
