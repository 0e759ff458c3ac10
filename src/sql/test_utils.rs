//! Parse rendered SQL back with sqlparser to catch syntax errors.
//!
//! Unit tests only; integration tests under `tests/` build against the
//! library without `cfg(test)` and call sqlparser themselves.

use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let result = match dialect {
        Dialect::DuckDb => Parser::parse_sql(&DuckDbDialect {}, sql),
        Dialect::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, sql),
        Dialect::MySql => Parser::parse_sql(&MySqlDialect {}, sql),
        Dialect::TSql => Parser::parse_sql(&MsSqlDialect {}, sql),
    };
    result
        .map(|_| ())
        .map_err(|e| format!("{dialect} rejected rendered SQL: {e}\n{sql}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_grouped_scan() {
        validate_sql(
            "SELECT status, COUNT(*) FROM listings GROUP BY status",
            Dialect::Postgres,
        )
        .unwrap();
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(validate_sql("SELEC * FORM listings", Dialect::MySql).is_err());
    }
}
