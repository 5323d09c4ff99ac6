/// Belief query preconditions.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("belief query over an empty variable set")]
    EmptyQuery,

    #[error("query variable not in model: {variable}")]
    UnknownVariable { variable: String },

    #[error("subtree does not cover query variable {variable}")]
    InvalidSubtree { variable: String },

    #[error("subtree of {cliques} cliques is empty, disconnected, or names unknown cliques")]
    MalformedSubtree { cliques: usize },
}
