/// Bayesian network and potential construction errors.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("variable already in model: {name}")]
    DuplicateVariable { name: String },

    #[error("variable not in model: {name}")]
    UnknownVariable { name: String },

    #[error("edge {parent} -> {child} would create a cycle")]
    CycleDetected { parent: String, child: String },

    #[error("edge {parent} -> {child} already exists")]
    DuplicateEdge { parent: String, child: String },

    #[error("invalid variable: {reason}")]
    InvalidVariable { reason: String },

    #[error("invalid potential: {reason}")]
    InvalidPotential { reason: String },
}
