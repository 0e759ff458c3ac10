//! SQL dialects.
//!
//! A grouped-scan request renders the same way everywhere except for a
//! handful of spelling differences, all decided here:
//!
//! | | DuckDB | Postgres | MySQL | T-SQL |
//! |---|---|---|---|---|
//! | identifiers | `"x"` | `"x"` | `` `x` `` | `[x]` |
//! | booleans | `true` | `true` | `1` | `1` |
//! | predicate in SELECT | yes | yes | yes | no (CASE) |
//! | concatenation | `\|\|` | `\|\|` | `CONCAT()` | `+` |

use std::fmt;

/// How a dialect spells string concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStyle {
    /// Infix operator, e.g. `a || b`.
    Operator(&'static str),
    /// `CONCAT(a, b)`; MySQL reads `||` as OR.
    Function,
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    DuckDb,
    Postgres,
    MySql,
    TSql,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::DuckDb,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::TSql,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::DuckDb => "duckdb",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::TSql => "tsql",
        }
    }

    /// Parse a dialect name (case-insensitive, common aliases accepted).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "duckdb" => Some(Dialect::DuckDb),
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "tsql" | "mssql" | "sqlserver" => Some(Dialect::TSql),
            _ => None,
        }
    }

    /// Quote an identifier, doubling any embedded closing quote.
    pub fn quote_identifier(self, ident: &str) -> String {
        let (open, close) = match self {
            Dialect::DuckDb | Dialect::Postgres => ('"', '"'),
            Dialect::MySql => ('`', '`'),
            Dialect::TSql => ('[', ']'),
        };
        let mut quoted = String::with_capacity(ident.len() + 2);
        quoted.push(open);
        for ch in ident.chars() {
            if ch == close {
                quoted.push(close);
            }
            quoted.push(ch);
        }
        quoted.push(close);
        quoted
    }

    /// Quote a string literal. T-SQL needs `N'...'` for non-ASCII text.
    pub fn quote_string(self, s: &str) -> String {
        let escaped = s.replace('\'', "''");
        if self == Dialect::TSql && !s.is_ascii() {
            format!("N'{escaped}'")
        } else {
            format!("'{escaped}'")
        }
    }

    pub fn format_bool(self, b: bool) -> &'static str {
        match (self, b) {
            (Dialect::DuckDb | Dialect::Postgres, true) => "true",
            (Dialect::DuckDb | Dialect::Postgres, false) => "false",
            (Dialect::MySql | Dialect::TSql, true) => "1",
            (Dialect::MySql | Dialect::TSql, false) => "0",
        }
    }

    /// Whether a bare predicate may appear in a SELECT or GROUP BY list.
    pub fn supports_boolean_select(self) -> bool {
        self != Dialect::TSql
    }

    pub fn concat_style(self) -> ConcatStyle {
        match self {
            Dialect::DuckDb | Dialect::Postgres => ConcatStyle::Operator("||"),
            Dialect::MySql => ConcatStyle::Function,
            Dialect::TSql => ConcatStyle::Operator("+"),
        }
    }

    /// This dialect's spelling of a scalar function, if it differs.
    pub fn remap_function(self, name: &str) -> Option<&'static str> {
        let upper = name.to_ascii_uppercase();
        match (self, upper.as_str()) {
            (Dialect::DuckDb | Dialect::Postgres, "NVL" | "IFNULL" | "ISNULL") => Some("COALESCE"),
            (Dialect::MySql, "NVL" | "ISNULL") => Some("IFNULL"),
            (Dialect::TSql, "NVL" | "IFNULL") => Some("ISNULL"),
            (Dialect::TSql, "LENGTH" | "CHAR_LENGTH") => Some("LEN"),
            (Dialect::MySql | Dialect::TSql, "SUBSTR") => Some("SUBSTRING"),
            (Dialect::DuckDb | Dialect::Postgres | Dialect::MySql, "LEN") => Some("LENGTH"),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
