//! SQL rendering for grouped-scan requests.
//!
//! - [`expr`] - expression AST and builder trait
//! - [`query`] - grouped SELECT builder
//! - [`token`] - tokens and token streams
//! - [`dialect`] - per-dialect spelling

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use dialect::Dialect;
pub use expr::{
    coalesce, col, count_star, func, lit_bool, lit_float, lit_int, lit_null, lit_str, raw_sql,
    table_col, BinaryOperator, Expr, ExprExt, Literal, UnaryOperator,
};
pub use query::{Query, SelectExpr, TableRef};
pub use token::{Token, TokenStream};
