//! Measures: the things a single grouped scan counts.
//!
//! A [`Measure`] is either a boolean filter (counted as "rows where the
//! filter holds") or a value expression (tabulated as a histogram). Callers
//! hand the engine a [`MeasureSet`], whose variant decides the shape of the
//! result: positional in, positional out; named in, named out.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::sql::expr::{raw_sql, Expr};

/// What a measure's definition produces per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    /// A filter evaluating to true/false/null.
    Boolean,
    /// An arbitrary scalar expression.
    Expression,
}

impl MeasureKind {
    /// Parse a kind name as written in measure spec files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" | "filter" => Some(Self::Boolean),
            "expression" | "expr" | "histogram" => Some(Self::Expression),
            _ => None,
        }
    }
}

/// One named thing to count.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub name: Option<String>,
    pub kind: MeasureKind,
    pub definition: Expr,
}

impl Measure {
    /// A boolean measure counting rows where `filter` holds.
    pub fn boolean(filter: Expr) -> Self {
        Self {
            name: None,
            kind: MeasureKind::Boolean,
            definition: filter,
        }
    }

    /// An expression measure tabulating the values `expr` produces.
    pub fn expression(expr: Expr) -> Self {
        Self {
            name: None,
            kind: MeasureKind::Expression,
            definition: expr,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The scalar expression this measure contributes to the scan.
    ///
    /// Boolean filters are parenthesized so they stay a single operand
    /// wherever the request places them.
    pub fn scalar_expr(&self) -> Expr {
        match self.kind {
            MeasureKind::Boolean => self.definition.clone().parenthesized(),
            MeasureKind::Expression => self.definition.clone(),
        }
    }
}

/// Serializable text form of a measure.
///
/// ```json
/// { "name": "sold_out", "kind": "boolean", "sql": "quantity = 0" }
/// ```
///
/// `sql` is passed to the data source verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub kind: String,
    pub sql: String,
}

impl TryFrom<MeasureSpec> for Measure {
    type Error = EngineError;

    fn try_from(spec: MeasureSpec) -> EngineResult<Self> {
        let kind = MeasureKind::from_name(&spec.kind).ok_or_else(|| {
            EngineError::malformed(format!(
                "unknown measure kind {:?} for {}",
                spec.kind,
                spec.name.as_deref().unwrap_or("<unnamed>")
            ))
        })?;
        if spec.sql.trim().is_empty() {
            return Err(EngineError::malformed(format!(
                "empty definition for {}",
                spec.name.as_deref().unwrap_or("<unnamed>")
            )));
        }

        Ok(Measure {
            name: spec.name,
            kind,
            definition: raw_sql(spec.sql.trim()),
        })
    }
}

/// Body of a spec when the name is the mapping key.
#[derive(Debug, Deserialize)]
struct KeyedSpec {
    kind: String,
    sql: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpecDocument {
    List(Vec<MeasureSpec>),
    Map(IndexMap<String, KeyedSpec>),
}

/// The caller's measures, tagged with the shape the result comes back in.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureSet {
    /// Identified by index.
    Positional(Vec<Measure>),
    /// Identified by key, in insertion order.
    Named(IndexMap<String, Measure>),
}

impl MeasureSet {
    pub fn positional(measures: impl IntoIterator<Item = Measure>) -> Self {
        Self::Positional(measures.into_iter().collect())
    }

    /// Build a named set, normalizing keys.
    ///
    /// Keys are trimmed of surrounding whitespace. Two keys that normalize
    /// to the same key are a [`EngineError::KeyCollision`]; a key that
    /// normalizes to nothing is a [`EngineError::MalformedMeasure`]. Each
    /// measure's `name` is set to its normalized key.
    pub fn named<K: AsRef<str>>(
        entries: impl IntoIterator<Item = (K, Measure)>,
    ) -> EngineResult<Self> {
        let mut named = IndexMap::new();
        for (key, mut measure) in entries {
            let key = normalize_key(key.as_ref())?;
            match named.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(EngineError::KeyCollision {
                        key: entry.key().clone(),
                    })
                }
                Entry::Vacant(entry) => {
                    measure.name = Some(entry.key().clone());
                    entry.insert(measure);
                }
            }
        }
        Ok(Self::Named(named))
    }

    /// Build a set from spec records.
    ///
    /// All named → [`MeasureSet::Named`]; none named → [`MeasureSet::Positional`].
    /// A mix of named and unnamed specs is malformed.
    pub fn from_specs(specs: Vec<MeasureSpec>) -> EngineResult<Self> {
        let named = specs.iter().filter(|s| s.name.is_some()).count();
        if named == 0 {
            let measures = specs
                .into_iter()
                .map(Measure::try_from)
                .collect::<EngineResult<Vec<_>>>()?;
            return Ok(Self::Positional(measures));
        }
        if named != specs.len() {
            return Err(EngineError::malformed(
                "measure specs mix named and unnamed entries",
            ));
        }

        let entries = specs
            .into_iter()
            .map(|spec| {
                let key = spec.name.clone().unwrap_or_default();
                Measure::try_from(spec).map(|m| (key, m))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Self::named(entries)
    }

    /// Parse a JSON document: either an array of specs or an object
    /// mapping names to `{kind, sql}`.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let document: SpecDocument = serde_json::from_str(json)
            .map_err(|e| EngineError::malformed(format!("invalid measure document: {e}")))?;

        match document {
            SpecDocument::List(specs) => Self::from_specs(specs),
            SpecDocument::Map(map) => {
                let entries = map
                    .into_iter()
                    .map(|(key, body)| {
                        let spec = MeasureSpec {
                            name: Some(key.clone()),
                            kind: body.kind,
                            sql: body.sql,
                        };
                        Measure::try_from(spec).map(|m| (key, m))
                    })
                    .collect::<EngineResult<Vec<_>>>()?;
                Self::named(entries)
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Positional(measures) => measures.len(),
            Self::Named(measures) => measures.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Measures in scan-column order.
    pub fn measures(&self) -> Box<dyn Iterator<Item = &Measure> + '_> {
        match self {
            Self::Positional(measures) => Box::new(measures.iter()),
            Self::Named(measures) => Box::new(measures.values()),
        }
    }
}

fn normalize_key(key: &str) -> EngineResult<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(EngineError::malformed("measure key is empty"));
    }
    Ok(key.to_string())
}
