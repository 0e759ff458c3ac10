//! # Tally
//!
//! Count many predicates over a data source with a single grouped scan.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          MeasureSet (positional or named measures)       │
//! │     boolean filters + value expressions, group key       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [request builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │   ScanRequest: measure_0..n, group key, base filters     │
//! │   (renders to SQL per dialect, or runs in memory)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [scan executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │   ScanRow per distinct combination of measure values     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [decoder]
//! ┌─────────────────────────────────────────────────────────┐
//! │   MultiCount: counts and histograms in the input shape   │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod measure;
pub mod scan;
pub mod sql;
pub mod value;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::decode::{MultiCount, Tallies, Tally};
    pub use crate::engine::MultiCounter;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::measure::{Measure, MeasureKind, MeasureSet, MeasureSpec};
    pub use crate::scan::{
        AsyncScanExecutor, MemoryScan, Record, ScanError, ScanExecutor, ScanRequest, ScanRow,
    };
    pub use crate::sql::dialect::Dialect;
    pub use crate::sql::expr::{
        coalesce, col, func, lit_bool, lit_float, lit_int, lit_null, lit_str, raw_sql, Expr,
        ExprExt,
    };
    pub use crate::sql::query::TableRef;
    pub use crate::value::Value;
}

// Also export at crate root for convenience
pub use config::Settings;
pub use decode::{MultiCount, Tallies, Tally};
pub use engine::MultiCounter;
pub use error::{EngineError, EngineResult};
pub use measure::{Measure, MeasureSet};
pub use value::Value;
