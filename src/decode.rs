//! Result decoder: one grouped scan back into N independent tallies.
//!
//! The scan returns one row per distinct combination of measure values.
//! Each measure's tally is the marginal of that joint distribution: for
//! position `i`, sum `count` over all rows keyed by the value at `i`.
//!
//! # Boolean collapse
//!
//! A measure is reported as [`Tally::Count`] iff every value it produced is
//! `true`, `false` or NULL. This is decided from the observed values, not
//! from the measure's kind, so an expression measure that only ever yields
//! booleans also collapses. Use [`Tally::count`] and
//! [`Tally::histogram_or_empty`] when the distinction matters.
//!
//! An empty scan has no observed values, so there the kind decides: boolean
//! measures are `Count(0)` and expression measures an empty histogram.
//!
//! Boolean measures reported as `1`/`0` (MySQL predicates, T-SQL's CASE
//! rendering) are read back as `true`/`false` before folding.

use indexmap::IndexMap;
use tracing::{debug, instrument, warn};

use crate::error::{EngineError, EngineResult};
use crate::measure::{MeasureKind, MeasureSet};
use crate::scan::{ScanError, ScanRow};
use crate::value::Value;

/// Frequency of each distinct value a measure produced.
pub type Histogram = IndexMap<Value, u64>;

/// Decoded result of one measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tally {
    /// Rows where the filter held.
    Count(u64),
    /// Rows per distinct value, in first-seen order.
    Histogram(Histogram),
}

impl Tally {
    /// The scalar count, if this tally collapsed to one.
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            Self::Histogram(_) => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            Self::Histogram(h) => Some(h),
            Self::Count(_) => None,
        }
    }

    /// The histogram, or an empty one if this tally collapsed to a count.
    ///
    /// Intended for expression measures, where a collapsed result means the
    /// scan produced no non-boolean values.
    pub fn histogram_or_empty(&self) -> Histogram {
        self.as_histogram().cloned().unwrap_or_default()
    }

    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }
}

impl From<u64> for Tally {
    fn from(n: u64) -> Self {
        Self::Count(n)
    }
}

/// Per-measure tallies in the caller's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tallies {
    Positional(Vec<Tally>),
    Named(IndexMap<String, Tally>),
}

impl Tallies {
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(t) => t.len(),
            Self::Named(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tally at `position`, in either shape.
    pub fn get(&self, position: usize) -> Option<&Tally> {
        match self {
            Self::Positional(t) => t.get(position),
            Self::Named(t) => t.get_index(position).map(|(_, tally)| tally),
        }
    }

    /// Tally for a named measure; `None` for positional tallies.
    pub fn get_named(&self, key: &str) -> Option<&Tally> {
        match self {
            Self::Positional(_) => None,
            Self::Named(t) => t.get(key),
        }
    }

    /// Tallies in measure order.
    pub fn tallies(&self) -> Box<dyn Iterator<Item = &Tally> + '_> {
        match self {
            Self::Positional(t) => Box::new(t.iter()),
            Self::Named(t) => Box::new(t.values()),
        }
    }
}

/// The result of one multi-count invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiCount {
    /// No group key: one set of tallies.
    Flat(Tallies),
    /// Tallies per group value, in first-seen order.
    Grouped(IndexMap<Value, Tallies>),
}

impl MultiCount {
    pub fn as_flat(&self) -> Option<&Tallies> {
        match self {
            Self::Flat(t) => Some(t),
            Self::Grouped(_) => None,
        }
    }

    pub fn as_grouped(&self) -> Option<&IndexMap<Value, Tallies>> {
        match self {
            Self::Grouped(g) => Some(g),
            Self::Flat(_) => None,
        }
    }

    /// Tallies for one group value.
    pub fn group(&self, value: &Value) -> Option<&Tallies> {
        self.as_grouped().and_then(|groups| groups.get(value))
    }
}

/// Decode scan rows into per-measure tallies.
///
/// `limit` caps the number of rows accepted before folding; `None` disables
/// it. Rows whose value count differs from the number of measures are an
/// executor contract violation.
#[instrument(
    name = "decode",
    level = "debug",
    skip_all,
    fields(rows = rows.len(), measures = measures.len(), grouped = grouped)
)]
pub fn decode(
    rows: Vec<ScanRow>,
    measures: &MeasureSet,
    grouped: bool,
    limit: Option<usize>,
) -> EngineResult<MultiCount> {
    check_limit(rows.len(), limit)?;

    let kinds: Vec<MeasureKind> = measures.measures().map(|m| m.kind).collect();
    if rows.is_empty() {
        debug!("scan matched no rows");
        let tallies = shape(measures, kinds.iter().map(|kind| empty_tally(*kind)));
        return Ok(if grouped {
            MultiCount::Grouped(std::iter::once((Value::Null, tallies)).collect())
        } else {
            MultiCount::Flat(tallies)
        });
    }

    let width = kinds.len();
    let mut flat = Accumulator::new(width);
    let mut groups: IndexMap<Value, Accumulator> = IndexMap::new();

    for row in rows {
        if row.values.len() != width {
            return Err(ScanError::Contract(format!(
                "scan row has {} values for {} measures",
                row.values.len(),
                width
            ))
            .into());
        }

        let accumulator = if grouped {
            let key = row.group_value.unwrap_or(Value::Null);
            groups
                .entry(key)
                .or_insert_with(|| Accumulator::new(width))
        } else {
            &mut flat
        };
        accumulator.add(row.values, row.count, &kinds);
    }

    if grouped {
        debug!(groups = groups.len(), "decoded grouped scan");
        let decoded = groups
            .into_iter()
            .map(|(key, accumulator)| (key, accumulator.finish(measures)))
            .collect();
        Ok(MultiCount::Grouped(decoded))
    } else {
        Ok(MultiCount::Flat(flat.finish(measures)))
    }
}

/// Reduce a histogram to a count if every key is boolean-shaped.
pub fn collapse(histogram: Histogram) -> Tally {
    if histogram.keys().all(Value::is_boolean_shaped) {
        Tally::Count(histogram.get(&Value::Bool(true)).copied().unwrap_or(0))
    } else {
        Tally::Histogram(histogram)
    }
}

fn empty_tally(kind: MeasureKind) -> Tally {
    match kind {
        MeasureKind::Boolean => Tally::Count(0),
        MeasureKind::Expression => Tally::Histogram(Histogram::new()),
    }
}

/// Read a `1`/`0` predicate result as a boolean.
fn truth_value(value: Value) -> Value {
    match value {
        Value::Int(1) => Value::Bool(true),
        Value::Int(0) => Value::Bool(false),
        other => other,
    }
}

fn shape(measures: &MeasureSet, tallies: impl Iterator<Item = Tally>) -> Tallies {
    match measures {
        MeasureSet::Positional(_) => Tallies::Positional(tallies.collect()),
        MeasureSet::Named(named) => Tallies::Named(named.keys().cloned().zip(tallies).collect()),
    }
}

fn check_limit(rows: usize, limit: Option<usize>) -> EngineResult<()> {
    let Some(limit) = limit else {
        return Ok(());
    };
    if rows > limit {
        return Err(EngineError::CardinalityExceeded { rows, limit });
    }
    // Within 10% of the limit
    if rows.saturating_mul(10) >= limit.saturating_mul(9) && rows > 0 {
        warn!(rows, limit, "grouped scan is close to the cardinality limit");
    }
    Ok(())
}

/// One histogram per measure position.
struct Accumulator {
    histograms: Vec<Histogram>,
}

impl Accumulator {
    fn new(width: usize) -> Self {
        Self {
            histograms: vec![Histogram::new(); width],
        }
    }

    fn add(&mut self, values: Vec<Value>, count: u64, kinds: &[MeasureKind]) {
        for ((histogram, value), kind) in self.histograms.iter_mut().zip(values).zip(kinds) {
            let value = match kind {
                MeasureKind::Boolean => truth_value(value),
                MeasureKind::Expression => value,
            };
            *histogram.entry(value).or_insert(0) += count;
        }
    }

    fn finish(self, measures: &MeasureSet) -> Tallies {
        shape(measures, self.histograms.into_iter().map(collapse))
    }
}
