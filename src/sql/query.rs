//! Grouped SELECT builder.
//!
//! Only the shape a grouped scan needs: a select list, one table, an
//! ANDed filter and a GROUP BY list.

use std::fmt;

use super::dialect::Dialect;
use super::expr::{Expr, ExprExt};
use super::token::{Token, TokenStream, COMMA_SPACE};

/// A SELECT list item.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn write_tokens(&self, ts: &mut TokenStream, dialect: Dialect) {
        self.expr.write_tokens(ts, dialect);
        if let Some(alias) = &self.alias {
            ts.space().keyword("AS").space().ident(alias);
        }
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

/// The scanned table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.into(),
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn write_tokens(&self, ts: &mut TokenStream) {
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            ts.space().keyword("AS").space().ident(alias);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until rendered with to_sql()"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    pub from: Option<TableRef>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, exprs: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = exprs.into_iter().map(Into::into).collect();
        self
    }

    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    /// AND `condition` into the WHERE clause.
    ///
    /// Compound conditions are parenthesized so an OR never binds across
    /// the AND.
    pub fn filter(mut self, condition: Expr) -> Self {
        let condition = condition.parenthesized();
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.keyword("SELECT");
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                ts.symbol(",");
            }
            ts.newline().indent(1);
            item.write_tokens(&mut ts, dialect);
        }

        if let Some(table) = &self.from {
            ts.newline().keyword("FROM").space();
            table.write_tokens(&mut ts);
        }

        if let Some(condition) = &self.where_clause {
            ts.newline().keyword("WHERE").space();
            condition.write_tokens(&mut ts, dialect);
        }

        if !self.group_by.is_empty() {
            ts.newline().keyword("GROUP BY").space();
            ts.separated(&self.group_by, COMMA_SPACE, |ts, expr| {
                expr.write_tokens(ts, dialect)
            });
        }

        ts
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

impl fmt::Display for Query {
    /// Renders with the default dialect; use [`Query::to_sql`] for others.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql(Dialect::default()))
    }
}
