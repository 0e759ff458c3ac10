//! In-memory reference executor.
//!
//! [`MemoryScan`] evaluates a [`ScanRequest`] against rows held in memory,
//! with SQL semantics for NULL: comparisons with NULL yield NULL, AND/OR/NOT
//! use three-valued logic, and a base filter keeps a row only when it
//! evaluates to true. Integer division truncates as in PostgreSQL.
//!
//! Rows are untyped, so a column holding both `1` and `1.0` produces two
//! distinct values, where a typed SQL column would hold only one of them.
//! Float values are bucketed by [`Value::into_group_key`].

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, instrument};

use super::executor::{AsyncScanExecutor, ScanError, ScanExecutor, ScanResult};
use super::{ScanRequest, ScanRow};
use crate::sql::expr::{BinaryOperator, Expr, Literal, UnaryOperator};
use crate::value::Value;

/// One source row: column name to value.
pub type Record = IndexMap<String, Value>;

/// Executes grouped scans over an in-memory row set.
#[derive(Debug, Clone, Default)]
pub struct MemoryScan {
    rows: Vec<Record>,
}

impl MemoryScan {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    /// Load rows from a JSON array of objects.
    pub fn from_json(json: &str) -> ScanResult<Self> {
        let rows: Vec<Record> = serde_json::from_str(json).map_err(ScanError::backend)?;
        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Evaluate `expr` against every row, in row order.
    pub fn evaluate(&self, expr: &Expr) -> ScanResult<Vec<Value>> {
        let mut evaluator = Evaluator::default();
        self.rows
            .iter()
            .map(|row| evaluator.eval(expr, row))
            .collect()
    }

    fn scan(&self, request: &ScanRequest) -> ScanResult<Vec<ScanRow>> {
        let mut evaluator = Evaluator::default();
        let mut buckets: IndexMap<(Vec<Value>, Option<Value>), u64> = IndexMap::new();

        'rows: for row in &self.rows {
            for filter in &request.base_filters {
                if evaluator.truth(filter, row)? != Some(true) {
                    continue 'rows;
                }
            }

            let values = request
                .columns
                .iter()
                .map(|column| evaluator.eval(&column.expr, row).map(Value::into_group_key))
                .collect::<ScanResult<Vec<_>>>()?;
            let group_value = request
                .group_key
                .as_ref()
                .map(|column| evaluator.eval(&column.expr, row).map(Value::into_group_key))
                .transpose()?;

            *buckets.entry((values, group_value)).or_insert(0) += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|((values, group_value), count)| ScanRow {
                values,
                group_value,
                count,
            })
            .collect())
    }
}

impl ScanExecutor for MemoryScan {
    #[instrument(name = "memory_scan::execute", level = "trace", skip_all, fields(rows = self.rows.len()))]
    fn execute(&self, request: &ScanRequest) -> ScanResult<Vec<ScanRow>> {
        let result = self.scan(request)?;
        debug!(buckets = result.len(), "memory scan complete");
        Ok(result)
    }
}

#[async_trait]
impl AsyncScanExecutor for MemoryScan {
    async fn execute(&self, request: &ScanRequest) -> ScanResult<Vec<ScanRow>> {
        ScanExecutor::execute(self, request)
    }
}

/// Row-at-a-time expression evaluator.
#[derive(Default)]
struct Evaluator {
    like_patterns: HashMap<String, Regex>,
}

impl Evaluator {
    fn eval(&mut self, expr: &Expr, row: &Record) -> ScanResult<Value> {
        match expr {
            Expr::Column { column, .. } => row
                .get(column)
                .cloned()
                .ok_or_else(|| ScanError::Syntax(format!("unknown column {column:?}"))),

            Expr::Literal(lit) => Ok(match lit {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(f) => Value::Float(*f),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
            }),

            Expr::BinaryOp { left, op, right } => self.eval_binary(left, *op, right, row),

            Expr::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => Ok(truth_value(self.truth(expr, row)?.map(|b| !b))),
                UnaryOperator::Minus => match self.eval(expr, row)? {
                    Value::Null => Ok(Value::Null),
                    Value::Int(i) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| ScanError::Constraint("integer overflow".into())),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(type_error("negate", &other)),
                },
            },

            Expr::Function {
                name,
                args,
                distinct,
            } => {
                if *distinct {
                    return Err(ScanError::Syntax(format!(
                        "DISTINCT is not valid in scalar function {name}"
                    )));
                }
                self.eval_function(name, args, row)
            }

            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let operand = operand
                    .as_ref()
                    .map(|op| self.eval(op, row))
                    .transpose()?;
                for (when, then) in when_clauses {
                    let matched = match &operand {
                        Some(op) => {
                            let candidate = self.eval(when, row)?;
                            sql_eq(op, &candidate)? == Some(true)
                        }
                        None => self.truth(when, row)? == Some(true),
                    };
                    if matched {
                        return self.eval(then, row);
                    }
                }
                match else_clause {
                    Some(else_expr) => self.eval(else_expr, row),
                    None => Ok(Value::Null),
                }
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Ok(Value::Bool(*negated));
                }
                let needle = self.eval(expr, row)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for candidate in values {
                    let candidate = self.eval(candidate, row)?;
                    match sql_eq(&needle, &candidate)? {
                        Some(true) => return Ok(Value::Bool(!*negated)),
                        None => saw_null = true,
                        Some(false) => {}
                    }
                }
                if saw_null {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Bool(*negated))
                }
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = self.eval(expr, row)?;
                let low = self.eval(low, row)?;
                let high = self.eval(high, row)?;
                let above = compare(&low, &value)?.map(|o| o != Ordering::Greater);
                let below = compare(&value, &high)?.map(|o| o != Ordering::Greater);
                let within = and3(above, below);
                Ok(truth_value(if *negated {
                    within.map(|b| !b)
                } else {
                    within
                }))
            }

            Expr::IsNull { expr, negated } => {
                let is_null = self.eval(expr, row)?.is_null();
                Ok(Value::Bool(is_null != *negated))
            }

            Expr::Paren(inner) => self.eval(inner, row),

            Expr::Star { .. } => Err(ScanError::Syntax(
                "wildcard is not a scalar expression".into(),
            )),

            Expr::Raw(sql) => Err(ScanError::Syntax(format!(
                "raw SQL cannot be evaluated in memory: {sql}"
            ))),
        }
    }

    /// Evaluate a predicate to true/false/unknown.
    fn truth(&mut self, expr: &Expr, row: &Record) -> ScanResult<Option<bool>> {
        match self.eval(expr, row)? {
            Value::Bool(b) => Ok(Some(b)),
            Value::Null => Ok(None),
            other => Err(ScanError::Constraint(format!(
                "expected a boolean predicate, found {}",
                other.type_name()
            ))),
        }
    }

    fn eval_binary(
        &mut self,
        left: &Expr,
        op: BinaryOperator,
        right: &Expr,
        row: &Record,
    ) -> ScanResult<Value> {
        if let BinaryOperator::And | BinaryOperator::Or = op {
            let l = self.truth(left, row)?;
            let r = self.truth(right, row)?;
            let combined = if op == BinaryOperator::And {
                and3(l, r)
            } else {
                or3(l, r)
            };
            return Ok(truth_value(combined));
        }

        let l = self.eval(left, row)?;
        let r = self.eval(right, row)?;
        if l.is_null() || r.is_null() {
            return Ok(Value::Null);
        }

        match op {
            BinaryOperator::Eq => Ok(truth_value(sql_eq(&l, &r)?)),
            BinaryOperator::Ne => Ok(truth_value(sql_eq(&l, &r)?.map(|b| !b))),
            BinaryOperator::Lt => ordered(&l, &r, |o| o == Ordering::Less),
            BinaryOperator::Gt => ordered(&l, &r, |o| o == Ordering::Greater),
            BinaryOperator::Lte => ordered(&l, &r, |o| o != Ordering::Greater),
            BinaryOperator::Gte => ordered(&l, &r, |o| o != Ordering::Less),
            BinaryOperator::Plus
            | BinaryOperator::Minus
            | BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Mod => arithmetic(op, &l, &r),
            BinaryOperator::Concat => Ok(Value::String(format!("{l}{r}"))),
            BinaryOperator::Like => match (&l, &r) {
                (Value::String(text), Value::String(pattern)) => {
                    let regex = self.like_regex(pattern)?;
                    Ok(Value::Bool(regex.is_match(text)))
                }
                _ => Err(ScanError::Constraint(format!(
                    "LIKE requires strings, found {} and {}",
                    l.type_name(),
                    r.type_name()
                ))),
            },
            BinaryOperator::And | BinaryOperator::Or => Err(ScanError::Syntax(
                "logical operator evaluated as a value".into(),
            )),
        }
    }

    fn eval_function(&mut self, name: &str, args: &[Expr], row: &Record) -> ScanResult<Value> {
        match name.to_ascii_uppercase().as_str() {
            "COALESCE" => {
                for arg in args {
                    let value = self.eval(arg, row)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }
            upper @ ("LOWER" | "UPPER") => {
                let [arg] = args else {
                    return Err(ScanError::Syntax(format!(
                        "{upper} takes one argument, got {}",
                        args.len()
                    )));
                };
                match self.eval(arg, row)? {
                    Value::Null => Ok(Value::Null),
                    Value::String(s) if upper == "LOWER" => Ok(Value::String(s.to_lowercase())),
                    Value::String(s) => Ok(Value::String(s.to_uppercase())),
                    other => Err(type_error(upper, &other)),
                }
            }
            _ => Err(ScanError::Syntax(format!("unsupported function {name}"))),
        }
    }

    fn like_regex(&mut self, pattern: &str) -> ScanResult<&Regex> {
        if !self.like_patterns.contains_key(pattern) {
            let mut source = String::from("(?s)^");
            for ch in pattern.chars() {
                match ch {
                    '%' => source.push_str(".*"),
                    '_' => source.push('.'),
                    other => source.push_str(&regex::escape(&other.to_string())),
                }
            }
            source.push('$');
            let regex = Regex::new(&source)
                .map_err(|e| ScanError::Syntax(format!("invalid LIKE pattern {pattern:?}: {e}")))?;
            self.like_patterns.insert(pattern.to_string(), regex);
        }
        self.like_patterns
            .get(pattern)
            .ok_or_else(|| ScanError::Syntax(format!("invalid LIKE pattern {pattern:?}")))
    }
}

fn truth_value(truth: Option<bool>) -> Value {
    truth.map_or(Value::Null, Value::Bool)
}

fn and3(l: Option<bool>, r: Option<bool>) -> Option<bool> {
    match (l, r) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(l: Option<bool>, r: Option<bool>) -> Option<bool> {
    match (l, r) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn type_error(operation: &str, value: &Value) -> ScanError {
    ScanError::Constraint(format!("cannot {operation} a {} value", value.type_name()))
}

/// SQL ordering; `None` when either side is NULL.
fn compare(l: &Value, r: &Value) -> ScanResult<Option<Ordering>> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(None),
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (l.as_float(), r.as_float());
            Ok(a.zip(b).and_then(|(a, b)| a.partial_cmp(&b)))
        }
        _ => Err(ScanError::Constraint(format!(
            "cannot compare {} with {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn sql_eq(l: &Value, r: &Value) -> ScanResult<Option<bool>> {
    Ok(compare(l, r)?.map(|o| o == Ordering::Equal))
}

fn ordered(l: &Value, r: &Value, test: impl Fn(Ordering) -> bool) -> ScanResult<Value> {
    Ok(truth_value(compare(l, r)?.map(test)))
}

fn arithmetic(op: BinaryOperator, l: &Value, r: &Value) -> ScanResult<Value> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOperator::Plus => a.checked_add(*b),
                BinaryOperator::Minus => a.checked_sub(*b),
                BinaryOperator::Mul => a.checked_mul(*b),
                BinaryOperator::Div | BinaryOperator::Mod if *b == 0 => {
                    return Err(ScanError::Constraint("division by zero".into()))
                }
                BinaryOperator::Div => a.checked_div(*b),
                BinaryOperator::Mod => a.checked_rem(*b),
                _ => None,
            };
            result
                .map(Value::Int)
                .ok_or_else(|| ScanError::Constraint("integer overflow".into()))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = match (l.as_float(), r.as_float()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(type_error("combine", l)),
            };
            let result = match op {
                BinaryOperator::Plus => a + b,
                BinaryOperator::Minus => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div if b == 0.0 => {
                    return Err(ScanError::Constraint("division by zero".into()))
                }
                BinaryOperator::Div => a / b,
                BinaryOperator::Mod => a % b,
                _ => return Err(type_error("combine", l)),
            };
            Ok(Value::Float(result))
        }
        _ => Err(ScanError::Constraint(format!(
            "arithmetic requires numbers, found {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}
