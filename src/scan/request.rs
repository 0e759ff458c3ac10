//! Request builder: measures in, one grouped-scan request out.

use super::{ColumnRole, ScanColumn, ScanRequest};
use crate::config::EngineSettings;
use crate::measure::MeasureSet;
use crate::sql::expr::Expr;

/// Builds [`ScanRequest`]s with a positional alias scheme.
///
/// The measure at position `i` is always aliased `<prefix><i>`. Aliases never
/// depend on the measure's expression text, so two near-identical filters
/// can never be merged by a downstream alias truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBuilder {
    alias_prefix: String,
    count_alias: String,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            alias_prefix: "measure_".to_string(),
            count_alias: "row_count".to_string(),
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            alias_prefix: settings.alias_prefix.clone(),
            count_alias: settings.count_alias.clone(),
        }
    }

    pub fn with_alias_prefix(mut self, prefix: &str) -> Self {
        self.alias_prefix = prefix.into();
        self
    }

    pub fn with_count_alias(mut self, alias: &str) -> Self {
        self.count_alias = alias.into();
        self
    }

    /// Alias of the measure column at `position`.
    pub fn measure_alias(&self, position: usize) -> String {
        format!("{}{}", self.alias_prefix, position)
    }

    /// Alias of the grouping column; never a valid measure alias.
    pub fn group_alias(&self) -> String {
        format!("{}group", self.alias_prefix)
    }

    /// Compose the single grouped-scan request for `measures`.
    pub fn build(
        &self,
        measures: &MeasureSet,
        base_filters: Vec<Expr>,
        group_key: Option<Expr>,
    ) -> ScanRequest {
        let columns = measures
            .measures()
            .enumerate()
            .map(|(position, measure)| ScanColumn {
                alias: self.measure_alias(position),
                expr: measure.scalar_expr(),
                role: ColumnRole::Measure(measure.kind),
            })
            .collect();

        let group_key = group_key.map(|expr| ScanColumn {
            alias: self.group_alias(),
            expr,
            role: ColumnRole::GroupKey,
        });

        ScanRequest {
            base_filters,
            columns,
            group_key,
            count_alias: self.count_alias.clone(),
        }
    }
}
