/// Invalid evidence passed to an engine. The caller's responsibility.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("evidence variable not in model: {variable}")]
    UnknownVariable { variable: String },

    #[error("state {state} out of range for {variable} with {cardinality} states")]
    InvalidState {
        variable: String,
        state: usize,
        cardinality: usize,
    },

    #[error("evidence size mismatch: {variables} variables, {states} states")]
    SizeMismatch { variables: usize, states: usize },
}
