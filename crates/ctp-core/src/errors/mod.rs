mod evidence_error;
mod model_error;
mod numeric_error;
mod pool_error;
mod query_error;
mod structural_error;

pub use evidence_error::EvidenceError;
pub use model_error::ModelError;
pub use numeric_error::NumericError;
pub use pool_error::PoolError;
pub use query_error::QueryError;
pub use structural_error::StructuralError;

/// Convenience alias used across the workspace.
pub type CtpResult<T> = Result<T, CtpError>;

/// Top-level error for every crate in the workspace.
///
/// All variants are fail-fast: callers (batch learners in particular) treat
/// any of them as aborting the current step.
#[derive(Debug, thiserror::Error)]
pub enum CtpError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("operation interrupted: {operation}")]
    Interrupted { operation: String },

    #[error("unsupported: {what}")]
    Unsupported { what: String },

    #[error("internal state error: {details}")]
    InternalState { details: String },

    #[error("invalid data: {reason}")]
    InvalidData { reason: String },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("concurrency error: {0}")]
    ConcurrencyError(String),
}
