//! Expression AST.
//!
//! Measures, base filters and grouping keys are all [`Expr`] trees. The
//! same tree is rendered to SQL for database-backed executors and
//! evaluated directly by [`MemoryScan`](crate::scan::MemoryScan).

use super::dialect::{ConcatStyle, Dialect};
use super::query::SelectExpr;
use super::token::{Token, TokenStream, COMMA_SPACE};

/// A SQL scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `column` or `table.column`.
    Column {
        table: Option<String>,
        column: String,
    },

    Literal(Literal),

    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// Searched (`operand: None`) or simple CASE.
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },

    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    IsNull { expr: Box<Expr>, negated: bool },

    /// `*` or `table.*`; only meaningful inside `COUNT(*)`.
    Star { table: Option<String> },

    Paren(Box<Expr>),

    /// SQL text passed through unescaped.
    ///
    /// Measures loaded from [`MeasureSpec`](crate::measure::MeasureSpec)
    /// land here, so spec files must come from a trusted source.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Concat,
    Like,
}

// Operator binding strength, loosest first.
const OR: u8 = 1;
const AND: u8 = 2;
const NOT: u8 = 3;
const COMPARISON: u8 = 4;
const ADDITIVE: u8 = 5;
const MULTIPLICATIVE: u8 = 6;
const NEGATE: u8 = 7;
const ATOM: u8 = 8;

impl BinaryOperator {
    fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => OR,
            BinaryOperator::And => AND,
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::Lte
            | BinaryOperator::Gte
            | BinaryOperator::Like => COMPARISON,
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Concat => ADDITIVE,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => MULTIPLICATIVE,
        }
    }

    fn token(self) -> Token {
        match self {
            BinaryOperator::Eq => Token::Symbol("="),
            BinaryOperator::Ne => Token::Symbol("<>"),
            BinaryOperator::Lt => Token::Symbol("<"),
            BinaryOperator::Gt => Token::Symbol(">"),
            BinaryOperator::Lte => Token::Symbol("<="),
            BinaryOperator::Gte => Token::Symbol(">="),
            BinaryOperator::Plus => Token::Symbol("+"),
            BinaryOperator::Minus => Token::Symbol("-"),
            BinaryOperator::Mul => Token::Symbol("*"),
            BinaryOperator::Div => Token::Symbol("/"),
            BinaryOperator::Mod => Token::Symbol("%"),
            BinaryOperator::And => Token::Keyword("AND"),
            BinaryOperator::Or => Token::Keyword("OR"),
            BinaryOperator::Like => Token::Keyword("LIKE"),
            BinaryOperator::Concat => Token::Concat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl Expr {
    /// Append this expression's tokens to `ts`.
    pub fn write_tokens(&self, ts: &mut TokenStream, dialect: Dialect) {
        match self {
            Expr::Column { table, column } => {
                if let Some(table) = table {
                    ts.ident(table).symbol(".");
                }
                ts.ident(column);
            }

            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::Int(*n),
                    Literal::Float(f) => Token::Float(*f),
                    Literal::String(s) => Token::Str(s.clone()),
                    Literal::Bool(b) => Token::Bool(*b),
                    Literal::Null => Token::Null,
                });
            }

            Expr::BinaryOp { left, op, right } => {
                if *op == BinaryOperator::Concat && dialect.concat_style() == ConcatStyle::Function {
                    ts.push(Token::Function("CONCAT".into())).symbol("(");
                    left.write_tokens(ts, dialect);
                    ts.symbol(",").space();
                    right.write_tokens(ts, dialect);
                    ts.symbol(")");
                } else {
                    let bind = op.precedence();
                    // Operators are left-associative and comparisons do not chain
                    let left_wraps = left.precedence() < bind
                        || (left.precedence() == bind && bind == COMPARISON);
                    left.write_operand(ts, dialect, left_wraps);
                    ts.space().push(op.token()).space();
                    right.write_operand(ts, dialect, right.precedence() <= bind);
                }
            }

            Expr::UnaryOp { op, expr } => {
                let bind = match op {
                    UnaryOperator::Not => {
                        ts.keyword("NOT").space();
                        NOT
                    }
                    UnaryOperator::Minus => {
                        ts.symbol("-");
                        NEGATE
                    }
                };
                // `--` would start a comment
                let negative_literal = matches!(
                    **expr,
                    Expr::Literal(Literal::Int(n)) if n < 0
                ) || matches!(**expr, Expr::Literal(Literal::Float(f)) if f.is_sign_negative());
                expr.write_operand(ts, dialect, expr.precedence() < bind || negative_literal);
            }

            Expr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::Function(name.clone())).symbol("(");
                if *distinct {
                    ts.keyword("DISTINCT").space();
                }
                ts.separated(args, COMMA_SPACE, |ts, arg| arg.write_tokens(ts, dialect));
                ts.symbol(")");
            }

            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                ts.keyword("CASE");
                if let Some(operand) = operand {
                    ts.space();
                    operand.write_tokens(ts, dialect);
                }
                for (when, then) in when_clauses {
                    ts.space().keyword("WHEN").space();
                    when.write_tokens(ts, dialect);
                    ts.space().keyword("THEN").space();
                    then.write_tokens(ts, dialect);
                }
                if let Some(else_expr) = else_clause {
                    ts.space().keyword("ELSE").space();
                    else_expr.write_tokens(ts, dialect);
                }
                ts.space().keyword("END");
            }

            // `x IN ()` is not valid SQL; it is FALSE and `x NOT IN ()` is TRUE
            Expr::In {
                values, negated, ..
            } if values.is_empty() => {
                ts.keyword(if *negated { "TRUE" } else { "FALSE" });
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                expr.write_operand(ts, dialect, expr.precedence() <= COMPARISON);
                if *negated {
                    ts.space().keyword("NOT");
                }
                ts.space().keyword("IN").space().symbol("(");
                ts.separated(values, COMMA_SPACE, |ts, v| v.write_tokens(ts, dialect));
                ts.symbol(")");
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.write_operand(ts, dialect, expr.precedence() <= COMPARISON);
                if *negated {
                    ts.space().keyword("NOT");
                }
                ts.space().keyword("BETWEEN").space();
                low.write_operand(ts, dialect, low.precedence() <= COMPARISON);
                ts.space().keyword("AND").space();
                high.write_operand(ts, dialect, high.precedence() <= COMPARISON);
            }

            Expr::IsNull { expr, negated } => {
                expr.write_operand(ts, dialect, expr.precedence() <= COMPARISON);
                ts.space()
                    .keyword(if *negated { "IS NOT NULL" } else { "IS NULL" });
            }

            Expr::Star { table } => {
                if let Some(table) = table {
                    ts.ident(table).symbol(".");
                }
                ts.symbol("*");
            }

            Expr::Paren(inner) => {
                ts.symbol("(");
                inner.write_tokens(ts, dialect);
                ts.symbol(")");
            }

            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }
    }

    fn write_operand(&self, ts: &mut TokenStream, dialect: Dialect, wrap: bool) {
        if wrap {
            ts.symbol("(");
            self.write_tokens(ts, dialect);
            ts.symbol(")");
        } else {
            self.write_tokens(ts, dialect);
        }
    }

    /// Binding strength of this expression's outermost operator.
    fn precedence(&self) -> u8 {
        match self {
            Expr::BinaryOp { op, .. } => op.precedence(),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => NOT,
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                ..
            } => NEGATE,
            Expr::In { values, .. } if values.is_empty() => ATOM,
            Expr::In { .. } | Expr::Between { .. } | Expr::IsNull { .. } => COMPARISON,
            // Raw fragments are opaque
            Expr::Raw(_) => OR,
            _ => ATOM,
        }
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        self.write_tokens(&mut ts, dialect);
        ts
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Whether this expression is a single operand when embedded in a
    /// larger one.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Expr::Column { .. }
                | Expr::Literal(_)
                | Expr::Function { .. }
                | Expr::Case { .. }
                | Expr::Star { .. }
                | Expr::Paren(_)
        )
    }

    /// Wrap in parentheses unless already atomic.
    ///
    /// Rendering adds the parentheses precedence requires on its own; this
    /// marks a filter or measure as one unit in the SQL text.
    pub fn parenthesized(self) -> Expr {
        if self.is_atomic() {
            self
        } else {
            Expr::Paren(Box::new(self))
        }
    }
}

pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

/// `COUNT(*)`
pub fn count_star() -> Expr {
    func("COUNT", vec![Expr::Star { table: None }])
}

pub fn coalesce(args: Vec<Expr>) -> Expr {
    func("COALESCE", args)
}

pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

/// Raw SQL text. Never pass user input here.
pub fn raw_sql(sql: &str) -> Expr {
    Expr::Raw(sql.into())
}

macro_rules! binary_builders {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            fn $name(self, other: impl Into<Expr>) -> Expr {
                self.binary(BinaryOperator::$op, other)
            }
        )*
    };
}

/// Fluent builders for filters and measure expressions.
///
/// ```ignore
/// let sold_out = col("quantity").eq(0).and(col("status").ne("draft"));
/// ```
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other.into()),
        }
    }

    binary_builders! {
        eq => Eq,
        ne => Ne,
        gt => Gt,
        gte => Gte,
        lt => Lt,
        lte => Lte,
        and => And,
        or => Or,
        add => Plus,
        sub => Minus,
        mul => Mul,
        div => Div,
        rem => Mod,
        like => Like,
        concat => Concat,
    }

    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(self.into_expr().parenthesized()),
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
            negated: false,
        }
    }

    /// Name this expression in a SELECT list.
    fn alias(self, name: &str) -> SelectExpr {
        SelectExpr::new(self.into_expr()).with_alias(name)
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl From<Literal> for Expr {
    fn from(lit: Literal) -> Self {
        Expr::Literal(lit)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit_int(i64::from(n))
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        lit_float(f)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Literal::String(s))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit_bool(b)
    }
}
