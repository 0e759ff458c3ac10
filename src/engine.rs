//! The multi-count facade.
//!
//! [`MultiCounter`] answers "how many rows satisfy each of these N
//! predicates" with one grouped scan instead of N:
//!
//! ```ignore
//! use tally::prelude::*;
//!
//! let counter = MultiCounter::new(MemoryScan::new(rows));
//! let measures = MeasureSet::named([
//!     ("sold_out", Measure::boolean(col("quantity").eq(0))),
//!     ("by_mfg", Measure::expression(col("mfg"))),
//! ])?;
//! let result = counter.multi_count(measures, None, vec![])?;
//! ```

use tracing::{debug, instrument};

use crate::config::Settings;
use crate::decode::{decode, MultiCount};
use crate::error::EngineResult;
use crate::measure::MeasureSet;
use crate::scan::{AsyncScanExecutor, RequestBuilder, ScanExecutor, ScanRequest};
use crate::sql::expr::Expr;

/// Counts many measures over one scan of a data source.
///
/// Holds only its executor and immutable settings; it is `Send + Sync`
/// whenever the executor is.
#[derive(Debug, Clone)]
pub struct MultiCounter<E> {
    executor: E,
    builder: RequestBuilder,
    limit: Option<usize>,
}

impl<E> MultiCounter<E> {
    /// Create a counter with default settings.
    pub fn new(executor: E) -> Self {
        Self::with_settings(executor, &Settings::default())
    }

    /// Create a counter using the `[engine]` section of `settings`.
    pub fn with_settings(executor: E, settings: &Settings) -> Self {
        Self {
            executor,
            builder: RequestBuilder::from_settings(&settings.engine),
            limit: settings.engine.result_limit(),
        }
    }

    /// Override the cardinality limit; `None` disables it.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The single request `multi_count` would issue.
    pub fn plan(
        &self,
        measures: &MeasureSet,
        group_by: Option<Expr>,
        base_filters: Vec<Expr>,
    ) -> ScanRequest {
        self.builder.build(measures, base_filters, group_by)
    }

    /// Count every measure with a single executor request.
    ///
    /// Positional measures come back positional and named measures come
    /// back named, in the same order. With `group_by`, the result is a
    /// cross-tab keyed by group value.
    #[instrument(
        name = "multi_count",
        level = "debug",
        skip_all,
        fields(measures = measures.len(), grouped = group_by.is_some())
    )]
    pub fn multi_count(
        &self,
        measures: MeasureSet,
        group_by: Option<Expr>,
        base_filters: Vec<Expr>,
    ) -> EngineResult<MultiCount>
    where
        E: ScanExecutor,
    {
        let request = self.plan(&measures, group_by, base_filters);
        let rows = self.executor.execute(&request)?;
        debug!(rows = rows.len(), "scan returned");
        decode(rows, &measures, request.is_grouped(), self.limit)
    }

    /// Async twin of [`multi_count`](Self::multi_count).
    ///
    /// Awaits exactly one executor future; decoding is synchronous.
    #[instrument(
        name = "multi_count_async",
        level = "debug",
        skip_all,
        fields(measures = measures.len(), grouped = group_by.is_some())
    )]
    pub async fn multi_count_async(
        &self,
        measures: MeasureSet,
        group_by: Option<Expr>,
        base_filters: Vec<Expr>,
    ) -> EngineResult<MultiCount>
    where
        E: AsyncScanExecutor,
    {
        let request = self.plan(&measures, group_by, base_filters);
        let rows = self.executor.execute(&request).await?;
        debug!(rows = rows.len(), "scan returned");
        decode(rows, &measures, request.is_grouped(), self.limit)
    }
}
