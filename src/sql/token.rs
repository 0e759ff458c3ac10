//! SQL tokens: the atomic units of rendered SQL.
//!
//! Expressions and queries lower to a flat [`TokenStream`]; only
//! serialization looks at the dialect.

use tracing::warn;

use super::dialect::{ConcatStyle, Dialect};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Reserved word, e.g. `SELECT` or `IS NOT NULL`.
    Keyword(&'static str),
    /// Operator or punctuation.
    Symbol(&'static str),
    /// Infix string concatenation.
    Concat,

    Space,
    Newline,
    Indent(usize),

    /// Table, column or alias name.
    Ident(String),
    /// `schema.table` or just `table`.
    QualifiedIdent {
        schema: Option<String>,
        name: String,
    },
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,

    /// Function name, remapped per dialect.
    Function(String),

    /// Raw SQL, emitted unescaped. Never build this from user input.
    Raw(String),
}

impl Token {
    fn write(&self, out: &mut String, dialect: Dialect) {
        match self {
            Token::Keyword(s) | Token::Symbol(s) => out.push_str(s),
            Token::Concat => match dialect.concat_style() {
                ConcatStyle::Operator(op) => out.push_str(op),
                // Callers lower concatenation to CONCAT() for these
                ConcatStyle::Function => out.push_str("||"),
            },
            Token::Space => out.push(' '),
            Token::Newline => out.push('\n'),
            Token::Indent(n) => out.push_str(&"  ".repeat(*n)),
            Token::Ident(name) => out.push_str(&dialect.quote_identifier(name)),
            Token::QualifiedIdent { schema, name } => {
                if let Some(schema) = schema {
                    out.push_str(&dialect.quote_identifier(schema));
                    out.push('.');
                }
                out.push_str(&dialect.quote_identifier(name));
            }
            Token::Int(n) => out.push_str(&n.to_string()),
            Token::Float(f) if f.is_finite() => {
                let mut buffer = ryu::Buffer::new();
                out.push_str(buffer.format_finite(*f));
            }
            Token::Float(f) => {
                warn!(value = %f, "non-finite float literal rendered as NULL");
                out.push_str("NULL");
            }
            Token::Str(s) => out.push_str(&dialect.quote_string(s)),
            Token::Bool(b) => out.push_str(dialect.format_bool(*b)),
            Token::Null => out.push_str("NULL"),
            Token::Function(name) => match dialect.remap_function(name) {
                Some(remapped) => out.push_str(remapped),
                None => out.push_str(&name.to_ascii_uppercase()),
            },
            Token::Raw(sql) => out.push_str(sql),
        }
    }

    /// Render this token alone.
    pub fn serialize(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        self.write(&mut out, dialect);
        out
    }
}

/// A sequence of tokens with chaining builders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn append(&mut self, other: TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens);
        self
    }

    pub fn keyword(&mut self, kw: &'static str) -> &mut Self {
        self.push(Token::Keyword(kw))
    }

    pub fn symbol(&mut self, sym: &'static str) -> &mut Self {
        self.push(Token::Symbol(sym))
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }

    pub fn indent(&mut self, n: usize) -> &mut Self {
        self.push(Token::Indent(n))
    }

    pub fn ident(&mut self, name: &str) -> &mut Self {
        self.push(Token::Ident(name.to_string()))
    }

    /// Push `items`, writing `sep` between consecutive ones.
    pub fn separated<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        sep: &[Token],
        mut each: impl FnMut(&mut Self, T),
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.tokens.extend_from_slice(sep);
            }
            each(self, item);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            token.write(&mut out, dialect);
        }
        out
    }
}

/// `, ` separator.
pub const COMMA_SPACE: &[Token] = &[Token::Symbol(","), Token::Space];
