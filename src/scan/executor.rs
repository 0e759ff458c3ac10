//! The scan executor boundary.
//!
//! Executors own query execution, expression validation, rendering and
//! cancellation. The engine issues exactly one request per call and
//! propagates any [`ScanError`] unchanged.

use async_trait::async_trait;
use thiserror::Error;

use super::{ScanRequest, ScanRow};

/// Result type for executor operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors an executor may report.
#[derive(Error, Debug)]
pub enum ScanError {
    /// An expression could not be parsed or is not supported.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// An expression was rejected at evaluation time (types, overflow, ...).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The executor returned rows that do not match the request.
    #[error("executor contract violated: {0}")]
    Contract(String),

    /// Any other backend failure.
    #[error("scan backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ScanError {
    /// Wrap an arbitrary backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Executes grouped-scan requests synchronously.
///
/// Each distinct combination of column values must yield at most one row,
/// with `count` equal to the number of source rows sharing it. Boolean
/// columns are reported as [`Value::Bool`](crate::value::Value::Bool).
pub trait ScanExecutor {
    fn execute(&self, request: &ScanRequest) -> ScanResult<Vec<ScanRow>>;
}

impl<F> ScanExecutor for F
where
    F: Fn(&ScanRequest) -> ScanResult<Vec<ScanRow>>,
{
    fn execute(&self, request: &ScanRequest) -> ScanResult<Vec<ScanRow>> {
        self(request)
    }
}

/// Executes grouped-scan requests asynchronously.
///
/// Same contract as [`ScanExecutor`]. Cancellation and timeouts are the
/// implementation's concern.
#[async_trait]
pub trait AsyncScanExecutor: Send + Sync {
    async fn execute(&self, request: &ScanRequest) -> ScanResult<Vec<ScanRow>>;
}
