/// Numerical breakdown during propagation.
#[derive(Debug, thiserror::Error)]
pub enum NumericError {
    #[error("normalization constant underflow in {context}: {value:e}")]
    Underflow { context: String, value: f64 },

    #[error("cached likelihood is not positive: log = {log_likelihood}")]
    NonPositiveLikelihood { log_likelihood: f64 },
}
